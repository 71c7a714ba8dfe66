//! Pool configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the session pool.
///
/// The wire shape mirrors the legacy deployment settings (`poolMin`,
/// `poolMax`, `poolTimeout` in seconds, `queueTimeout` in milliseconds) so an
/// embedder can deserialize an existing config block unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    /// Pool name, used in log lines and the admin report.
    pub name: String,

    /// Minimum number of sessions kept open.
    pub pool_min: u32,

    /// Maximum number of sessions (floor 1).
    pub pool_max: u32,

    /// How long an idle session may sit in the free set before it is
    /// reaped, in seconds on the wire.
    #[serde(deserialize_with = "de_seconds")]
    pub pool_timeout: Duration,

    /// How long an acquire may wait for a free session, in milliseconds on
    /// the wire.
    #[serde(deserialize_with = "de_millis")]
    pub queue_timeout: Duration,

    /// Keep sessions open across calls. When disabled, a successful release
    /// also closes the underlying session.
    pub keep_open: bool,

    /// Ring bound for per-procedure timing lists and reconnect timestamps.
    pub stats_max: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "orajson".to_string(),
            pool_min: 0,
            pool_max: 1,
            pool_timeout: Duration::from_secs(30),
            queue_timeout: Duration::from_millis(120_000),
            keep_open: true,
            stats_max: 500,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the minimum number of sessions.
    #[must_use]
    pub fn pool_min(mut self, min: u32) -> Self {
        self.pool_min = min;
        self
    }

    /// Set the maximum number of sessions.
    #[must_use]
    pub fn pool_max(mut self, max: u32) -> Self {
        self.pool_max = max;
        self
    }

    /// Set the idle reap timeout.
    #[must_use]
    pub fn pool_timeout(mut self, timeout: Duration) -> Self {
        self.pool_timeout = timeout;
        self
    }

    /// Set the acquire queue timeout.
    #[must_use]
    pub fn queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    /// Keep or close sessions on successful release.
    #[must_use]
    pub fn keep_open(mut self, keep: bool) -> Self {
        self.keep_open = keep;
        self
    }

    /// Set the stats ring bound.
    #[must_use]
    pub fn stats_max(mut self, max: usize) -> Self {
        self.stats_max = max;
        self
    }

    /// Clamp the bounds into a usable shape: `max >= 1`, `min < max`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.pool_max < 1 {
            tracing::warn!(pool_max = self.pool_max, "poolMax below 1, using 1");
            self.pool_max = 1;
        }
        if self.pool_min >= self.pool_max {
            tracing::warn!(
                pool_min = self.pool_min,
                pool_max = self.pool_max,
                "poolMin must stay below poolMax, clamping"
            );
            self.pool_min = self.pool_max - 1;
        }
        self
    }
}

fn de_seconds<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

fn de_millis<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
