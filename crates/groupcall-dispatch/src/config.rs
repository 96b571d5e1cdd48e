//! # Dispatcher Configuration
//!
//! Runtime parameters with sane defaults and override capability.

use std::time::Duration;
use thiserror::Error;

/// Default per-call timeout when the caller does not override it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default size of the bounded handler worker pool.
pub const DEFAULT_HANDLER_POOL_SIZE: usize = 8;

/// Dispatcher runtime configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Default timeout applied to calls issued without an explicit one.
    pub request_timeout: Duration,
    /// Maximum number of inbound requests handled concurrently. Saturation
    /// delays replies (backpressure); requests are never dropped.
    pub handler_pool_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            handler_pool_size: DEFAULT_HANDLER_POOL_SIZE,
        }
    }
}

impl DispatcherConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.handler_pool_size == 0 {
            return Err(ConfigError::ZeroHandlerPool);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The handler pool must admit at least one request.
    #[error("handler pool size must be at least 1")]
    ZeroHandlerPool,
    /// A zero default timeout would retire every call immediately.
    #[error("request timeout must be non-zero")]
    ZeroTimeout,
}
