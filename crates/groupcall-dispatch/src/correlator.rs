//! # Request Correlator
//!
//! Stamps outbound requests, tracks them in flight, matches inbound replies
//! back to the call that produced them, and serves inbound requests through
//! the locally registered handler.
//!
//! ```text
//! caller ──▶ send_request ──▶ pending table ──▶ channel.send (one per dest)
//!                                   ▲
//!                                   │ reply matched by request id
//! channel ──▶ on_event ─────────────┘
//!                 │
//!                 └─▶ request: handler invoked on the worker pool,
//!                     result sent back under the same request id
//! ```
//!
//! One correlator exists per scope; every message it sends carries that
//! scope's tag so the remote multiplexer can route it back.

use crate::collector::GroupCollector;
use crate::error::CallError;
use crate::options::{CallOptions, ResponseMode};
use crate::reply::{ReplyStatus, Termination};
use async_trait::async_trait;
use dashmap::DashMap;
use groupcall_types::{
    Address, Channel, ChannelEvent, Header, InboundHandler, Message, RequestHandler, RequestId,
    ScopeId, View,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One in-flight call.
struct PendingRequest {
    /// Where the request went.
    dests: Vec<Address>,
    /// Accumulates this call's replies.
    collector: Arc<GroupCollector>,
    /// When the request was sent.
    sent_at: Instant,
}

/// Correlator counters.
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    /// Request copies handed to the channel.
    pub requests_sent: AtomicU64,
    /// Replies matched to a pending call.
    pub replies_matched: AtomicU64,
    /// Replies dropped: late, duplicate, or already retired.
    pub replies_dropped: AtomicU64,
    /// Inbound requests served through the handler.
    pub requests_handled: AtomicU64,
    /// Handler invocations that returned an error.
    pub handler_errors: AtomicU64,
}

/// Matches outbound requests to inbound replies for one scope.
pub struct RequestCorrelator {
    scope: ScopeId,
    channel: Arc<dyn Channel>,
    /// In-flight calls by request id. Removal is the single retirement
    /// point; the collector's termination gate makes double completion
    /// impossible even if two paths race the removal.
    pending: DashMap<RequestId, PendingRequest>,
    next_id: AtomicU64,
    handler: RwLock<Option<Arc<dyn RequestHandler>>>,
    /// Bounded worker pool for inbound request handling.
    permits: Arc<Semaphore>,
    stats: Arc<CorrelatorStats>,
    stopped: AtomicBool,
}

impl RequestCorrelator {
    /// Create a correlator bound to `scope`, sending through `channel` and
    /// serving inbound requests on a pool of `handler_pool_size` workers.
    #[must_use]
    pub fn new(scope: ScopeId, channel: Arc<dyn Channel>, handler_pool_size: usize) -> Self {
        Self {
            scope,
            channel,
            pending: DashMap::new(),
            next_id: AtomicU64::new(0),
            handler: RwLock::new(None),
            permits: Arc::new(Semaphore::new(handler_pool_size)),
            stats: Arc::new(CorrelatorStats::default()),
            stopped: AtomicBool::new(false),
        }
    }

    /// The scope every message from this correlator is tagged with.
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Install the application handler for inbound requests.
    pub fn set_handler(&self, handler: Arc<dyn RequestHandler>) {
        *self.handler.write() = Some(handler);
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> Arc<CorrelatorStats> {
        self.stats.clone()
    }

    /// Number of calls currently in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn allocate_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Send one request to every destination.
    ///
    /// Returns as soon as the copies are handed to the channel; the caller
    /// waits on `collector`, not on this method. A failed send becomes that
    /// destination's error reply and is never retried.
    pub async fn send_request(
        &self,
        dests: &[Address],
        mut message: Message,
        collector: &Arc<GroupCollector>,
        options: &CallOptions,
    ) -> Result<RequestId, CallError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(CallError::Stopped);
        }

        let id = self.allocate_id();
        let needs_reply = options.mode != ResponseMode::None;
        message.src = Some(self.channel.local_address());
        message.set_scope(options.scope.unwrap_or(self.scope));
        message.set_request(id, needs_reply);

        // Insert before the first send: a reply can arrive before the last
        // copy is out.
        if needs_reply {
            self.pending.insert(
                id,
                PendingRequest {
                    dests: dests.to_vec(),
                    collector: collector.clone(),
                    sent_at: Instant::now(),
                },
            );
        }

        for dest in dests {
            let copy = message.clone().with_dest(*dest);
            match self.channel.send(copy).await {
                Ok(()) => {
                    self.stats.requests_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    warn!(id = %id, dest = %dest, error = %err, "Send failed");
                    collector.record(*dest, ReplyStatus::Error(err.to_string()));
                }
            }
        }

        // All sends may have failed, completing the call on the spot.
        if needs_reply && collector.is_done() {
            self.retire(id);
        }
        Ok(id)
    }

    /// Unicast variant: transport failure surfaces to the caller instead of
    /// being folded into the reply map.
    pub async fn send_unicast(
        &self,
        dest: Address,
        mut message: Message,
        collector: &Arc<GroupCollector>,
        options: &CallOptions,
    ) -> Result<RequestId, CallError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(CallError::Stopped);
        }

        let id = self.allocate_id();
        let needs_reply = options.mode != ResponseMode::None;
        message.src = Some(self.channel.local_address());
        message.dest = Some(dest);
        message.set_scope(options.scope.unwrap_or(self.scope));
        message.set_request(id, needs_reply);

        if needs_reply {
            self.pending.insert(
                id,
                PendingRequest {
                    dests: vec![dest],
                    collector: collector.clone(),
                    sent_at: Instant::now(),
                },
            );
        }

        if let Err(err) = self.channel.send(message).await {
            self.retire(id);
            return Err(CallError::Transport(err));
        }
        self.stats.requests_sent.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    /// Remove a call from the pending table. Safe to call from the reply
    /// path, the timeout path, and stop concurrently: exactly one wins.
    pub fn retire(&self, id: RequestId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Retire every outstanding call with a stopped outcome and refuse new
    /// sends. Every blocked caller wakes.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);

        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                pending
                    .collector
                    .abort(ReplyStatus::Stopped, Termination::Stopped);
                debug!(
                    id = %id,
                    dests = pending.dests.len(),
                    elapsed_ms = pending.sent_at.elapsed().as_millis(),
                    "Call stopped"
                );
            }
        }
    }

    fn on_reply(&self, message: Message, id: RequestId, is_error: bool) {
        let Some(sender) = message.src else {
            warn!(id = %id, "Dropping reply without source address");
            return;
        };

        // Clone the collector out and release the map ref before recording,
        // so retirement below cannot deadlock against our own read guard.
        let collector = self.pending.get(&id).map(|entry| entry.collector.clone());
        let Some(collector) = collector else {
            // Late, duplicate, or already retired: drop silently.
            self.stats.replies_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(id = %id, sender = %sender, "Dropping reply with no pending call");
            return;
        };

        let status = if is_error {
            ReplyStatus::Error(String::from_utf8_lossy(&message.payload).into_owned())
        } else {
            ReplyStatus::Value(message.payload)
        };

        if collector.record(sender, status) {
            self.stats.replies_matched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.replies_dropped.fetch_add(1, Ordering::Relaxed);
        }

        if collector.is_done() {
            self.retire(id);
        }
    }

    /// Hand an inbound request to the application handler, off the receive
    /// path. The pool bounds concurrency: saturation delays replies, it
    /// never drops requests.
    fn dispatch_request(&self, message: Message, id: RequestId, needs_reply: bool) {
        let handler = self.handler.read().clone();
        let channel = self.channel.clone();
        let permits = self.permits.clone();
        let stats = self.stats.clone();
        let local = self.channel.local_address();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                // Semaphore closed only on process teardown.
                return;
            };

            let result = match &handler {
                Some(handler) => handler.handle(&message.payload, message.src).await,
                None => {
                    warn!(id = %id, "Inbound request but no handler bound");
                    Err(groupcall_types::HandlerError::Failed(
                        "no request handler bound".to_string(),
                    ))
                }
            };

            stats.requests_handled.fetch_add(1, Ordering::Relaxed);
            let (payload, is_error) = match result {
                Ok(bytes) => (bytes, false),
                Err(err) => {
                    stats.handler_errors.fetch_add(1, Ordering::Relaxed);
                    (err.reply_text().into_bytes(), true)
                }
            };

            if !needs_reply {
                return;
            }

            let Some(mut reply) = message.make_reply(payload, is_error) else {
                warn!(id = %id, "Cannot reply: request carried no source address");
                return;
            };
            reply.src = Some(local);

            if let Err(err) = channel.send(reply).await {
                warn!(id = %id, error = %err, "Failed to send reply");
            }
        });
    }

    fn on_view_change(&self, view: &View) {
        let mut done = Vec::new();
        for entry in self.pending.iter() {
            entry.value().collector.handle_view(view);
            if entry.value().collector.is_done() {
                done.push(*entry.key());
            }
        }
        for id in done {
            self.retire(id);
        }
    }
}

#[async_trait]
impl InboundHandler for RequestCorrelator {
    async fn on_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(message) => {
                // Copy the correlation data out before handing the message on.
                match message.correlation().cloned() {
                    Some(Header::Reply { id, is_error }) => {
                        self.on_reply(message, id, is_error);
                    }
                    Some(Header::Request { id, needs_reply }) => {
                        self.dispatch_request(message, id, needs_reply);
                    }
                    _ => {
                        debug!(scope = %self.scope, "Dropping message without correlation header");
                    }
                }
            }
            ChannelEvent::ViewChange(view) => self.on_view_change(&view),
            ChannelEvent::Connected(addr) => debug!(scope = %self.scope, addr = %addr, "Channel connected"),
            ChannelEvent::Disconnected(addr) => {
                debug!(scope = %self.scope, addr = %addr, "Channel disconnected");
            }
        }
    }
}
