//! Driver-level error types.

use thiserror::Error;

/// Errors reported by the underlying database client.
///
/// Variants are `Clone` so scripted test drivers can replay them; real
/// implementations fold I/O failures into the message of the closest variant.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// A session could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The database rejected or aborted the call.
    #[error("ORA-{code:05}: {message}")]
    Database {
        /// Oracle error code.
        code: u32,
        /// Server-supplied message text.
        message: String,
    },

    /// A large-object stream failed mid-read.
    #[error("lob stream error: {0}")]
    Lob(String),

    /// A cursor fetch or close failed.
    #[error("cursor error: {0}")]
    Cursor(String),

    /// The session was already closed.
    #[error("session is closed")]
    Closed,
}

impl DriverError {
    /// Whether the failure indicates the session itself is unusable, as
    /// opposed to the individual call being rejected.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, DriverError::Connect(_) | DriverError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_formats_ora_code() {
        let err = DriverError::Database {
            code: 600,
            message: "internal error".into(),
        };
        assert_eq!(err.to_string(), "ORA-00600: internal error");
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(DriverError::Closed.is_connectivity());
        assert!(DriverError::Connect("refused".into()).is_connectivity());
        assert!(
            !DriverError::Database {
                code: 1403,
                message: "no data found".into()
            }
            .is_connectivity()
        );
    }
}
