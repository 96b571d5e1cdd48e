//! Per-call configuration.

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use groupcall_types::{Address, ScopeId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Completion policy for a group call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Complete once every expected destination has a terminal reply.
    All,
    /// Complete on the first accepted value reply.
    First,
    /// Complete once accepted replies exceed half the expected count.
    Majority,
    /// Fire-and-forget: complete immediately, collect nothing.
    None,
}

/// Predicate applied to value replies before they count toward completion.
/// Rejected replies are stored but excluded from FIRST/MAJORITY accounting.
pub type ReplyFilter = Arc<dyn Fn(&Address, &[u8]) -> bool + Send + Sync>;

/// Per-call configuration: completion mode, timeout, optional reply filter,
/// optional target scope override.
#[derive(Clone)]
pub struct CallOptions {
    /// Completion policy.
    pub mode: ResponseMode,
    /// Wall-clock timeout for this call.
    pub timeout: Duration,
    /// Optional acceptance predicate for value replies.
    pub filter: Option<ReplyFilter>,
    /// Target scope; defaults to the issuing dispatcher's scope.
    pub scope: Option<ScopeId>,
}

impl CallOptions {
    /// Options with the given completion mode and default timeout.
    #[must_use]
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            mode,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            filter: None,
            scope: None,
        }
    }

    /// Set the call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the reply acceptance filter.
    #[must_use]
    pub fn filter(mut self, filter: ReplyFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Route the call to a different scope than the issuing dispatcher's.
    #[must_use]
    pub fn scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::new(ResponseMode::All)
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("mode", &self.mode)
            .field("timeout", &self.timeout)
            .field("filter", &self.filter.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}
