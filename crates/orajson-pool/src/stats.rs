//! Execution and pool statistics.
//!
//! Diagnostic data only: every structure here is ring-bounded and none of it
//! participates in correctness decisions.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lock-free pool counters, single-writer per event kind.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub requests_total: AtomicU64,
    pub requests_queued: AtomicU64,
    pub requests_dequeued: AtomicU64,
    pub requests_failed: AtomicU64,
    pub requests_timed_out: AtomicU64,
    pub in_use: AtomicU32,
    pub open: AtomicU32,
    pub executing: AtomicU32,
    pub total_executions: AtomicU64,
    pub retried: AtomicU64,
}

/// Ring-bounded history kept behind the stats lock.
#[derive(Debug, Default)]
pub(crate) struct StatsInner {
    exec_times: HashMap<String, VecDeque<u64>>,
    reconnects: VecDeque<DateTime<Utc>>,
    last_error: Option<String>,
}

impl StatsInner {
    pub(crate) fn record_execution(&mut self, procedure: &str, elapsed: Duration, cap: usize) {
        let times = self.exec_times.entry(procedure.to_string()).or_default();
        if times.len() >= cap {
            times.pop_front();
        }
        times.push_back(elapsed.as_millis() as u64);
    }

    pub(crate) fn record_reconnect(&mut self, at: DateTime<Utc>, cap: usize) {
        if self.reconnects.len() >= cap {
            self.reconnects.pop_front();
        }
        self.reconnects.push_back(at);
    }

    pub(crate) fn record_error(&mut self, text: String) {
        self.last_error = Some(text);
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    pub(crate) fn execution_times(&self) -> BTreeMap<String, Vec<u64>> {
        self.exec_times
            .iter()
            .map(|(name, times)| (name.clone(), times.iter().copied().collect()))
            .collect()
    }

    pub(crate) fn reconnect_times(&self) -> Vec<DateTime<Utc>> {
        self.reconnects.iter().copied().collect()
    }
}

/// A point-in-time view of the pool, serializable for the admin endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    /// Sessions currently checked out.
    pub in_use: u32,
    /// Open sessions, checked out or idle.
    pub open: u32,
    /// Total acquire requests.
    pub requests_total: u64,
    /// Acquires that had to queue for a free session.
    pub requests_queued: u64,
    /// Queued acquires that eventually obtained a session.
    pub requests_dequeued: u64,
    /// Acquires that failed for any reason.
    pub requests_failed: u64,
    /// Acquires that hit the queue timeout.
    pub requests_timed_out: u64,
    /// Calls executing right now.
    pub executing: u32,
    /// Total executions since startup.
    pub total_executions: u64,
    /// Internal automatic retries performed.
    pub retried: u64,
    /// When sessions were (re)established, oldest first.
    pub reconnect_times: Vec<DateTime<Utc>>,
    /// Recent per-procedure execution durations in milliseconds.
    pub execution_times: BTreeMap<String, Vec<u64>>,
}

impl Counters {
    pub(crate) fn snapshot(&self, stats: &StatsInner) -> PoolSnapshot {
        PoolSnapshot {
            in_use: self.in_use.load(Ordering::Relaxed),
            open: self.open.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_queued: self.requests_queued.load(Ordering::Relaxed),
            requests_dequeued: self.requests_dequeued.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_timed_out: self.requests_timed_out.load(Ordering::Relaxed),
            executing: self.executing.load(Ordering::Relaxed),
            total_executions: self.total_executions.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            reconnect_times: stats.reconnect_times(),
            execution_times: stats.execution_times(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_ring_drops_oldest() {
        let mut stats = StatsInner::default();
        for i in 0..5u64 {
            stats.record_execution("getPrice", Duration::from_millis(i), 3);
        }
        let times = &stats.execution_times()["getPrice"];
        assert_eq!(times, &vec![2, 3, 4]);
    }

    #[test]
    fn test_reconnect_ring_is_bounded() {
        let mut stats = StatsInner::default();
        for _ in 0..10 {
            stats.record_reconnect(Utc::now(), 4);
        }
        assert_eq!(stats.reconnect_times().len(), 4);
    }
}
