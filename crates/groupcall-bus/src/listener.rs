//! Listener adapter.
//!
//! Wraps a plain [`ChannelListener`] so direct channel consumers can occupy
//! a scope without pulling in the dispatch layer.

use async_trait::async_trait;
use groupcall_types::{ChannelEvent, ChannelListener, InboundHandler};
use std::sync::Arc;

/// Adapts a [`ChannelListener`] to the multiplexer's handler interface.
///
/// Message events forward to `on_message`, view changes to
/// `on_membership_change`; connect/disconnect events are not part of the
/// listener capability and are ignored.
pub struct ListenerHandler {
    listener: Arc<dyn ChannelListener>,
}

impl ListenerHandler {
    /// Wrap a listener for registration under a scope.
    #[must_use]
    pub fn new(listener: Arc<dyn ChannelListener>) -> Self {
        Self { listener }
    }
}

#[async_trait]
impl InboundHandler for ListenerHandler {
    async fn on_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(message) => self.listener.on_message(message).await,
            ChannelEvent::ViewChange(view) => self.listener.on_membership_change(view).await,
            ChannelEvent::Connected(_) | ChannelEvent::Disconnected(_) => {}
        }
    }
}
