//! Gateway-level error taxonomy.

use thiserror::Error;

use orajson_driver::DriverError;
use orajson_pool::PoolError;

/// Everything [`Gateway::execute`](crate::Gateway::execute) can fail with.
///
/// The embedding framework maps these onto status codes; no stack detail
/// reaches the caller, only the classification and a message.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A session could not be obtained from the pool in time.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// No live session after `attempts` acquire-and-probe attempts. With
    /// `attempts > 1` the gateway already retried internally; the caller may
    /// still retry later.
    #[error("no usable session after {attempts} attempt(s): {source}")]
    Connectivity {
        /// How many acquire-and-probe attempts were made.
        attempts: u32,
        /// The probe or connect failure of the last attempt.
        source: DriverError,
    },

    /// The call itself failed: execution, decoding, or an application-level
    /// error status in the payload.
    #[error(transparent)]
    Call(#[from] orajson_core::Error),
}

impl GatewayError {
    /// Whether retrying the whole request might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Pool(e) => e.is_retryable(),
            GatewayError::Connectivity { .. } => true,
            GatewayError::Call(e) => e.is_connectivity(),
        }
    }

    /// Whether the payload carried the conventional `status: "ERROR"` marker.
    #[must_use]
    pub fn is_app_status(&self) -> bool {
        matches!(self, GatewayError::Call(orajson_core::Error::AppStatus { .. }))
    }
}
