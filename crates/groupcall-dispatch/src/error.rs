//! Call-surface errors.

use groupcall_bus::MuxError;
use groupcall_types::TransportError;
use thiserror::Error;

/// Errors surfaced by the dispatcher call surface.
///
/// Note what is deliberately absent: a timed-out group call is not an error
/// (it returns the replies collected so far), and a handler failure on the
/// remote side arrives as that destination's error reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// The dispatcher was never started (or already stopped) when the call
    /// was issued.
    #[error("dispatcher not started")]
    NotStarted,

    /// The dispatcher was stopped while the call was being issued.
    #[error("dispatcher stopped")]
    Stopped,

    /// The channel send failed. Unicast only; group calls record transport
    /// failures per destination instead.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Scope registration failed on start.
    #[error(transparent)]
    Mux(#[from] MuxError),

    /// A call descriptor or result could not be encoded/decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The remote handler returned an error reply (RPC convenience surface).
    #[error("remote handler error: {0}")]
    Remote(String),

    /// The destination departed before replying (RPC convenience surface).
    #[error("destination unreachable")]
    Unreachable,

    /// No reply arrived within the call timeout (RPC convenience surface;
    /// group calls report this per destination instead).
    #[error("call timed out")]
    TimedOut,
}
