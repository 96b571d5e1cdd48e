//! # Groupcall Bus - Scope Multiplexing
//!
//! Lets several independent request/response services share one logical
//! channel without interfering.
//!
//! ```text
//! ┌───────────┐   register(scope, handler)   ┌──────────────────┐
//! │ Service A │ ───────────────────────────▶ │                  │
//! └───────────┘                              │ ScopeMultiplexer │ ◀── channel events
//! ┌───────────┐                              │                  │
//! │ Service B │ ───────────────────────────▶ └──────────────────┘
//! └───────────┘                                │            │
//!                        message for scope A ──┘            └── view change:
//!                        routed to A only                       broadcast to all
//! ```
//!
//! The multiplexer is the single object attached to the channel's inbound
//! handler slot. Message events are routed by their scope tag; view changes
//! and connect/disconnect events fan out to every registered handler.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod listener;
pub mod mux;

pub use error::MuxError;
pub use listener::ListenerHandler;
pub use mux::ScopeMultiplexer;
