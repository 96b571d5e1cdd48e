//! Error taxonomy shared across the workspace.
//!
//! Transport failures and handler failures are the only errors that cross
//! crate boundaries; everything else (timeouts, unreachable destinations,
//! unbound scopes) is a policy outcome, not an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A channel send failed. Never retried by this core: for unicast calls the
/// failure surfaces to the caller, for group calls it becomes that
/// destination's error reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The channel refused or failed the send.
    #[error("send failed: {0}")]
    SendFailed(String),
    /// The channel is not connected.
    #[error("channel not connected")]
    NotConnected,
}

/// The application handler failed while producing a reply. Wrapped into an
/// error reply and returned to the caller, never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandlerError {
    /// The handler raised an error.
    #[error("handler failed: {0}")]
    Failed(String),
    /// No operation is bound under the requested name.
    #[error("no operation named '{0}'")]
    UnknownOperation(String),
    /// The request payload could not be decoded.
    #[error("malformed request payload: {0}")]
    MalformedPayload(String),
}

impl HandlerError {
    /// Short error text carried in the error reply payload.
    #[must_use]
    pub fn reply_text(&self) -> String {
        self.to_string()
    }
}
