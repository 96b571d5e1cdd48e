//! # Dispatcher
//!
//! The public call surface: unicast and multi-destination calls over one
//! scope of the shared channel, with a start/stop lifecycle tied to
//! multiplexer registration.

use crate::collector::GroupCollector;
use crate::config::DispatcherConfig;
use crate::correlator::{CorrelatorStats, RequestCorrelator};
use crate::error::CallError;
use crate::options::{CallOptions, ResponseMode};
use crate::reply::{CallResult, Reply, Termination};
use groupcall_bus::ScopeMultiplexer;
use groupcall_types::{Address, Channel, InboundHandler, RequestHandler, ScopeId, View};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Issues calls for one logical service sharing the channel.
///
/// Between [`start`](Self::start) and [`stop`](Self::stop) the dispatcher's
/// correlator occupies its scope in the multiplexer, receiving both the
/// replies to its calls and the requests addressed to its handler.
pub struct Dispatcher {
    name: String,
    scope: ScopeId,
    channel: Arc<dyn Channel>,
    mux: Arc<ScopeMultiplexer>,
    correlator: Arc<RequestCorrelator>,
    config: DispatcherConfig,
    started: AtomicBool,
}

impl Dispatcher {
    /// Create a dispatcher for `scope`, sending through `channel` and
    /// receiving via `mux`. Not live until [`start`](Self::start).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        scope: ScopeId,
        channel: Arc<dyn Channel>,
        mux: Arc<ScopeMultiplexer>,
        config: DispatcherConfig,
    ) -> Self {
        let correlator = Arc::new(RequestCorrelator::new(
            scope,
            channel.clone(),
            config.handler_pool_size,
        ));
        Self {
            name: name.into(),
            scope,
            channel,
            mux,
            correlator,
            config,
            started: AtomicBool::new(false),
        }
    }

    /// Dispatcher name, for monitoring.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope this dispatcher occupies.
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Currently installed membership view, from the channel.
    #[must_use]
    pub fn current_view(&self) -> Option<View> {
        self.channel.current_view()
    }

    /// Calls currently in flight.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Correlator counters.
    #[must_use]
    pub fn stats(&self) -> Arc<CorrelatorStats> {
        self.correlator.stats()
    }

    /// Install the application handler serving inbound requests.
    pub fn set_request_handler(&self, handler: Arc<dyn RequestHandler>) {
        self.correlator.set_handler(handler);
    }

    /// Register with the multiplexer; from this point the dispatcher can
    /// receive requests and replies. Idempotent while started.
    pub fn start(&self) -> Result<(), CallError> {
        if self.started.load(Ordering::Acquire) {
            return Ok(());
        }
        self.mux
            .register(self.scope, self.correlator.clone() as Arc<dyn InboundHandler>)?;
        self.started.store(true, Ordering::Release);
        info!(dispatcher = %self.name, scope = %self.scope, "Dispatcher started");
        Ok(())
    }

    /// Unregister from the multiplexer, then retire every outstanding call
    /// with a stopped outcome, waking all blocked callers.
    ///
    /// Stopping is terminal: the scope is freed for a new dispatcher, but
    /// this one refuses further calls.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::AcqRel) {
            return;
        }
        self.mux.unregister(self.scope);
        self.correlator.stop();
        info!(dispatcher = %self.name, scope = %self.scope, "Dispatcher stopped");
    }

    /// Call every destination and collect replies per the completion mode.
    ///
    /// Blocks the calling task until the policy is satisfied, the timeout
    /// elapses (an outcome, not an error), or the dispatcher stops.
    /// Fire-and-forget calls return immediately with only locally known
    /// outcomes (send failures).
    pub async fn call(
        &self,
        dests: &[Address],
        payload: Vec<u8>,
        options: CallOptions,
    ) -> Result<CallResult, CallError> {
        if !self.started.load(Ordering::Acquire) {
            return Err(CallError::NotStarted);
        }

        let collector = Arc::new(GroupCollector::new(dests.to_vec(), &options));
        let message = groupcall_types::Message::new(payload);
        let id = self
            .correlator
            .send_request(dests, message, &collector, &options)
            .await?;

        if options.mode == ResponseMode::None {
            return Ok(CallResult {
                termination: Termination::Satisfied,
                replies: collector.snapshot(),
            });
        }

        debug!(dispatcher = %self.name, id = %id, dests = dests.len(), "Awaiting group call");
        let result = collector.await_completion(options.timeout).await;
        // Timeout retirement; a completed call already left the table.
        self.correlator.retire(id);
        Ok(result)
    }

    /// Unicast convenience: one destination, one reply.
    ///
    /// Transport failure surfaces synchronously as
    /// [`CallError::Transport`]; everything else arrives as the reply's
    /// status.
    pub async fn call_one(
        &self,
        dest: Address,
        payload: Vec<u8>,
        options: CallOptions,
    ) -> Result<Reply, CallError> {
        if !self.started.load(Ordering::Acquire) {
            return Err(CallError::NotStarted);
        }

        let collector = Arc::new(GroupCollector::new(vec![dest], &options));
        let message = groupcall_types::Message::new(payload);
        let id = self
            .correlator
            .send_unicast(dest, message, &collector, &options)
            .await?;

        if options.mode == ResponseMode::None {
            return Ok(collector
                .snapshot()
                .remove(&dest)
                .unwrap_or_else(Reply::unresolved));
        }

        let mut result = collector.await_completion(options.timeout).await;
        self.correlator.retire(id);
        Ok(result
            .replies
            .remove(&dest)
            .unwrap_or_else(Reply::unresolved))
    }

    /// Default per-call timeout from this dispatcher's configuration.
    #[must_use]
    pub fn default_options(&self, mode: ResponseMode) -> CallOptions {
        CallOptions::new(mode).timeout(self.config.request_timeout)
    }
}
