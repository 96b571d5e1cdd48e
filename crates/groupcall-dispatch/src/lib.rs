//! # Groupcall Dispatch - Request Correlation and Group Calls
//!
//! The call surface built on top of the scope multiplexer:
//!
//! ```text
//! application ──▶ Dispatcher.call
//!                     │
//!                     ▼
//!             RequestCorrelator.send_request   (stamp + send via channel)
//!                     │
//!     ... remote correlator invokes its handler, sends the reply ...
//!                     │
//!             RequestCorrelator.on_event       (match reply by request id)
//!                     │
//!                     ▼
//!             GroupCollector.record            (completion policy)
//!                     │
//!                     ▼
//!             Dispatcher returns the per-destination reply map
//! ```
//!
//! One [`RequestCorrelator`] exists per scope; every message it sends or
//! receives carries that scope's tag. Calls suspend on their
//! [`GroupCollector`] until the policy is satisfied, the timeout elapses,
//! or the dispatcher stops - whichever comes first.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod collector;
pub mod config;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod options;
pub mod reply;
pub mod rpc;


// Re-export main types
pub use collector::GroupCollector;
pub use config::{ConfigError, DispatcherConfig};
pub use correlator::{CorrelatorStats, RequestCorrelator};
pub use dispatcher::Dispatcher;
pub use error::CallError;
pub use options::{CallOptions, ReplyFilter, ResponseMode};
pub use reply::{CallResult, Reply, ReplyStatus, Termination};
pub use rpc::{MethodCall, MethodTable, Operation, RpcDispatcher, RpcReply};
