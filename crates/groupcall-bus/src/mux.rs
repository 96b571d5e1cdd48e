//! # Scope Multiplexer
//!
//! Registry mapping a [`ScopeId`] to one registered inbound handler, and the
//! demultiplexing logic that routes every inbound event to the right one.

use crate::error::MuxError;
use dashmap::DashMap;
use groupcall_types::{ChannelEvent, InboundHandler, ScopeId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes inbound channel traffic to the logical service it belongs to.
///
/// Exactly one handler may be bound per scope at any time. The registry is
/// safe for concurrent register/unregister/lookup; delivery of one event
/// never touches scopes it is not addressed to.
#[derive(Default)]
pub struct ScopeMultiplexer {
    /// Registered handlers by scope.
    handlers: DashMap<ScopeId, Arc<dyn InboundHandler>>,
}

impl ScopeMultiplexer {
    /// Create an empty multiplexer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Bind `handler` to `scope`.
    ///
    /// Fails with [`MuxError::ScopeAlreadyBound`] if the scope is occupied;
    /// rebinding requires an explicit [`unregister`](Self::unregister)
    /// first.
    pub fn register(
        &self,
        scope: ScopeId,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<(), MuxError> {
        // Entry-based insert so a concurrent register of the same scope
        // cannot slip between a lookup and an insert.
        match self.handlers.entry(scope) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(MuxError::ScopeAlreadyBound(scope)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(handler);
                debug!(scope = %scope, "Handler registered");
                Ok(())
            }
        }
    }

    /// Unbind whatever handler is registered under `scope`. Idempotent.
    pub fn unregister(&self, scope: ScopeId) {
        if self.handlers.remove(&scope).is_some() {
            debug!(scope = %scope, "Handler unregistered");
        }
    }

    /// Whether a handler is bound under `scope`.
    #[must_use]
    pub fn is_registered(&self, scope: ScopeId) -> bool {
        self.handlers.contains_key(&scope)
    }

    /// Number of registered scopes.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.handlers.len()
    }

    /// All currently registered scopes, for monitoring.
    #[must_use]
    pub fn registered_scopes(&self) -> Vec<ScopeId> {
        self.handlers.iter().map(|entry| *entry.key()).collect()
    }

}

/// The multiplexer is itself the handler attached to the channel's single
/// inbound slot.
///
/// Message events are routed by scope tag. A message for an unbound scope
/// is dropped here; in particular a stray reply can never reach another
/// scope's pending-call accounting. Non-message events are broadcast to
/// every registered handler.
#[async_trait::async_trait]
impl InboundHandler for ScopeMultiplexer {
    async fn on_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(message) => {
                let Some(scope) = message.scope() else {
                    warn!("Dropping inbound message without scope header");
                    return;
                };

                let handler = self.handlers.get(&scope).map(|entry| entry.value().clone());
                match handler {
                    Some(handler) => handler.on_event(ChannelEvent::Message(message)).await,
                    None => {
                        debug!(
                            scope = %scope,
                            src = ?message.src,
                            "Dropping message for unbound scope"
                        );
                    }
                }
            }
            broadcast => {
                // Snapshot first: a handler may unregister itself (or a
                // sibling) while reacting to the event.
                let handlers: Vec<Arc<dyn InboundHandler>> = self
                    .handlers
                    .iter()
                    .map(|entry| entry.value().clone())
                    .collect();

                for handler in handlers {
                    handler.on_event(broadcast.clone()).await;
                }
            }
        }
    }
}
