//! Pool error types.

use thiserror::Error;

use orajson_driver::DriverError;

/// Errors raised while obtaining a session from the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been shut down.
    #[error("pool is closed")]
    Closed,

    /// No session became free within the queue timeout. The caller may
    /// retry; the pool itself is healthy.
    #[error("no session available within {waited_ms} ms")]
    QueueTimeout {
        /// How long the acquire waited.
        waited_ms: u64,
    },

    /// A fresh session could not be established. Retryable after startup.
    #[error("could not establish a session: {0}")]
    Connect(#[source] DriverError),

    /// The startup validation probe failed. There is no degraded-start
    /// mode: the embedding process must treat this as fatal.
    #[error("pool failed startup validation: {0}")]
    Startup(#[source] DriverError),
}

impl PoolError {
    /// Whether a later acquire might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, PoolError::QueueTimeout { .. } | PoolError::Connect(_))
    }
}
