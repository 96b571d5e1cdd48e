//! # Capability Traits
//!
//! The seams between this core and its collaborators:
//!
//! - [`Channel`] is the transport surface this core consumes but never
//!   implements. One pluggable inbound handler slot, a concurrent-safe
//!   `send`, and the current membership view for monitoring.
//! - [`InboundHandler`] is what gets registered per scope in the
//!   multiplexer; the dispatch layer implements it.
//! - [`ChannelListener`] is the plain capability for direct channel
//!   consumers that bypass the dispatcher entirely.
//! - [`RequestHandler`] is the application-side capability invoked on the
//!   receiving side to produce replies.

use crate::address::Address;
use crate::errors::{HandlerError, TransportError};
use crate::event::ChannelEvent;
use crate::message::Message;
use crate::view::View;
use async_trait::async_trait;

/// The transport/membership stack underneath this core.
///
/// `send` must be safe for concurrent use by multiple scopes. Delivery,
/// retransmission and failure detection are the channel's business; this
/// core never retries.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Name of the underlying protocol stack, for monitoring only.
    fn name(&self) -> &str;

    /// Ordered layer names of the underlying protocol stack, top first.
    /// Monitoring only; transports without introspection report nothing.
    fn protocol_stack(&self) -> Vec<String> {
        Vec::new()
    }

    /// The local endpoint's address.
    fn local_address(&self) -> Address;

    /// The currently installed membership view, if any.
    fn current_view(&self) -> Option<View>;

    /// Send one message. Failure is surfaced to the caller, never retried.
    async fn send(&self, message: Message) -> Result<(), TransportError>;
}

/// Handler bound to one scope in the multiplexer.
///
/// Receives scope-routed message events plus every broadcast event (view
/// changes, connect/disconnect). Implementations must not block the caller:
/// slow work is handed off internally.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Deliver one inbound event.
    async fn on_event(&self, event: ChannelEvent);
}

/// Plain listener capability for direct channel consumers that bypass the
/// dispatcher.
#[async_trait]
pub trait ChannelListener: Send + Sync {
    /// A message for this listener's scope arrived.
    async fn on_message(&self, message: Message);

    /// The channel installed a new membership view.
    async fn on_membership_change(&self, view: View);
}

/// Application-side request handler: payload in, result or error out.
///
/// Invoked off the receive path on a bounded worker pool, so one slow
/// handler delays only its own reply.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle one inbound request payload.
    async fn handle(&self, payload: &[u8], src: Option<Address>)
        -> Result<Vec<u8>, HandlerError>;
}
