//! Multiplexer errors.

use groupcall_types::ScopeId;
use thiserror::Error;

/// Errors from scope registration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MuxError {
    /// The scope already has a registered handler. Re-registration fails
    /// rather than silently replacing the existing handler; unregister
    /// first to rebind.
    #[error("{0} already has a registered handler")]
    ScopeAlreadyBound(ScopeId),
}
