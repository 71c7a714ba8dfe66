//! Caller-facing error taxonomy for a single call.

use serde_json::Value;
use thiserror::Error;

use orajson_driver::DriverError;

/// Everything that can go wrong between "request accepted" and "result
/// delivered", excluding pool acquisition (see `orajson-pool`).
///
/// Every variant except [`InvalidRequest`](Error::InvalidRequest) and
/// [`MissingSection`](Error::MissingSection) means the session that produced
/// it must be discarded rather than returned to the pool.
#[derive(Debug, Error)]
pub enum Error {
    /// The request descriptor is malformed or internally inconsistent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The descriptor names a request section that was not supplied.
    #[error("request section `{0}` is not present")]
    MissingSection(String),

    /// The serialized input does not fit the configured split arity.
    #[error("input needs more than {chunks} chunks of {size} characters")]
    InputTooLarge {
        /// Maximum characters per chunk.
        size: usize,
        /// Fixed number of chunk binds.
        chunks: usize,
    },

    /// The database call itself failed.
    #[error("database error: {0}")]
    Execution(#[from] DriverError),

    /// The call succeeded but its payload could not be decoded.
    #[error("invalid database response: {0}")]
    Decode(String),

    /// Output was requested but the driver returned none.
    #[error("expected output but none returned")]
    MissingOutput,

    /// The payload decoded cleanly but carries `status: "ERROR"`.
    #[error("database reported an error status")]
    AppStatus {
        /// The decoded payload, for callers routing it through an error channel.
        payload: Value,
    },
}

impl Error {
    /// Whether this failure indicates the session is unusable and a retry on
    /// a fresh session might succeed.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Execution(source) if source.is_connectivity())
    }

    /// Whether the session that produced this error must be discarded.
    #[must_use]
    pub fn discards_session(&self) -> bool {
        !matches!(self, Error::InvalidRequest(_) | Error::MissingSection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape_errors_keep_session() {
        assert!(!Error::InvalidRequest("x".into()).discards_session());
        assert!(!Error::MissingSection("query".into()).discards_session());
        assert!(Error::MissingOutput.discards_session());
        assert!(Error::Decode("not json".into()).discards_session());
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(Error::Execution(DriverError::Closed).is_connectivity());
        assert!(
            !Error::Execution(DriverError::Database {
                code: 6550,
                message: "wrong arity".into()
            })
            .is_connectivity()
        );
        assert!(!Error::MissingOutput.is_connectivity());
    }
}
