//! # Groupcall Types - Shared Wire and Capability Types
//!
//! The Single Source of Truth for the types every other crate in the
//! workspace speaks:
//!
//! - **Identity**: [`Address`] for endpoints, [`ScopeId`] for the logical
//!   services sharing one channel, [`RequestId`] for in-flight calls.
//! - **Wire**: [`Message`] with its extensible small-integer header map,
//!   [`Header`] tags for scope routing and request/reply correlation.
//! - **Events**: [`ChannelEvent`], the inbound stream a channel feeds to its
//!   single registered handler.
//! - **Capabilities**: the [`Channel`] trait consumed (never implemented)
//!   here, plus the [`InboundHandler`], [`ChannelListener`] and
//!   [`RequestHandler`] traits applications and upper layers implement.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod address;
pub mod errors;
pub mod event;
pub mod message;
pub mod traits;
pub mod view;

// Re-export main types
pub use address::Address;
pub use errors::{HandlerError, TransportError};
pub use event::ChannelEvent;
pub use message::{Header, HeaderId, Message, RequestId, ScopeId};
pub use traits::{Channel, ChannelListener, InboundHandler, RequestHandler};
pub use view::View;
