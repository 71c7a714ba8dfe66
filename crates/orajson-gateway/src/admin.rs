//! The read-only diagnostic report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use orajson_pool::PoolSnapshot;

/// Header pairs the diagnostic endpoint must set so the report is never
/// cached along the way.
pub const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache,no-store,must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "Sat, 26 Jul 1997 05:00:00 GMT"),
];

/// Coarse connection health shown at the top of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Sessions are open and the gateway is below its execution ceiling.
    Good,
    /// More calls are executing than the configured `max_procedures`.
    Busy,
    /// No session is open at all.
    None,
}

impl Health {
    /// Whether the embedder should answer the diagnostic request with a
    /// service-unavailable status.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Health::Good)
    }
}

/// A point-in-time diagnostic report, serialized as JSON for the admin
/// endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReport {
    /// The gateway's name, distinguishing instances against different
    /// databases.
    pub name: String,
    /// When the gateway started.
    pub start_time: DateTime<Utc>,
    /// Coarse health summary.
    pub connection: Health,
    /// Execution ceiling used for the `busy` classification.
    pub max_procedures: u32,
    /// Whether sessions are kept pooled across calls.
    pub keep_open: bool,
    /// Text of the most recent failure. Present only when the caller
    /// presented the configured admin secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Pool counters and timing rings.
    #[serde(flatten)]
    pub pool: PoolSnapshot,
}

impl AdminReport {
    pub(crate) fn classify(snapshot: &PoolSnapshot, max_procedures: u32) -> Health {
        if snapshot.open == 0 {
            Health::None
        } else if snapshot.executing > max_procedures {
            Health::Busy
        } else {
            Health::Good
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(open: u32, executing: u32) -> PoolSnapshot {
        PoolSnapshot {
            in_use: 0,
            open,
            requests_total: 0,
            requests_queued: 0,
            requests_dequeued: 0,
            requests_failed: 0,
            requests_timed_out: 0,
            executing,
            total_executions: 0,
            retried: 0,
            reconnect_times: Vec::new(),
            execution_times: Default::default(),
        }
    }

    #[test]
    fn test_health_classification() {
        assert_eq!(AdminReport::classify(&snapshot(0, 0), 3), Health::None);
        assert_eq!(AdminReport::classify(&snapshot(2, 4), 3), Health::Busy);
        assert_eq!(AdminReport::classify(&snapshot(2, 3), 3), Health::Good);
        assert!(Health::Busy.is_degraded());
        assert!(!Health::Good.is_degraded());
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = AdminReport {
            name: "prices".into(),
            start_time: Utc::now(),
            connection: Health::Good,
            max_procedures: 3,
            keep_open: true,
            last_error: None,
            pool: snapshot(1, 0),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["connection"], "good");
        assert_eq!(json["open"], 1);
        assert!(json.get("lastError").is_none());
        assert!(json.get("pool").is_none(), "snapshot fields are flattened");
    }
}
