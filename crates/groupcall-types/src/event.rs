//! Inbound channel events.
//!
//! A channel exposes one handler slot and feeds it this stream. Message
//! events are demultiplexed by scope; the rest are broadcast to every
//! registered handler.

use crate::address::Address;
use crate::message::Message;
use crate::view::View;
use serde::{Deserialize, Serialize};

/// One inbound event from the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// A message arrived.
    Message(Message),
    /// A new membership view was installed.
    ViewChange(View),
    /// The local endpoint connected to the channel.
    Connected(Address),
    /// The local endpoint disconnected from the channel.
    Disconnected(Address),
}

impl ChannelEvent {
    /// Whether this event is routed by scope rather than broadcast.
    #[must_use]
    pub fn is_message(&self) -> bool {
        matches!(self, ChannelEvent::Message(_))
    }
}
