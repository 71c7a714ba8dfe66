//! The bounded session pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{Semaphore, TryAcquireError};
use tokio::time::{Instant, timeout};

use orajson_driver::{ConnectSettings, Driver, Session};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::session::PooledSession;
use crate::stats::{Counters, PoolSnapshot, StatsInner};

/// A bounded pool of live database sessions.
///
/// At most `pool_max` sessions exist at a time; an acquire either receives a
/// session or fails within the configured queue timeout, never blocking
/// indefinitely. The pool is cheap to clone and every clone shares the same
/// sessions and counters.
pub struct Pool<D: Driver> {
    inner: Arc<PoolInner<D>>,
}

impl<D: Driver> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) struct PoolInner<D: Driver> {
    pub(crate) driver: D,
    pub(crate) settings: ConnectSettings,
    pub(crate) config: PoolConfig,
    pub(crate) semaphore: Arc<Semaphore>,
    pub(crate) free: Mutex<Vec<IdleSession<D::Session>>>,
    pub(crate) counters: Counters,
    pub(crate) stats: Mutex<StatsInner>,
    next_session_id: AtomicU64,
    closed: AtomicBool,
    started_at: DateTime<Utc>,
}

/// A session parked in the free set.
pub(crate) struct IdleSession<S> {
    pub(crate) session: S,
    pub(crate) id: u64,
    pub(crate) idle_since: Instant,
}

impl<D: Driver> Pool<D> {
    /// Create the pool and prove it is usable.
    ///
    /// One session is established and probed before this returns; there is no
    /// degraded-start mode, so a failure here is [`PoolError::Startup`] and
    /// the embedding process must treat it as fatal. After the probe, the
    /// free set is warmed up to `pool_min` sessions.
    pub async fn initialize(
        driver: D,
        settings: ConnectSettings,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        let config = config.normalized();
        settings.validate().map_err(PoolError::Startup)?;

        let inner = Arc::new(PoolInner {
            driver,
            settings,
            semaphore: Arc::new(Semaphore::new(config.pool_max as usize)),
            free: Mutex::new(Vec::new()),
            counters: Counters::default(),
            stats: Mutex::new(StatsInner::default()),
            next_session_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            started_at: Utc::now(),
            config,
        });

        let mut probe = inner.connect_session().await.map_err(|e| match e {
            PoolError::Connect(source) => PoolError::Startup(source),
            other => other,
        })?;
        probe.session.ping().await.map_err(PoolError::Startup)?;
        inner.free.lock().push(probe);

        while (inner.free.lock().len() as u32) < inner.config.pool_min {
            let warm = inner.connect_session().await.map_err(|e| match e {
                PoolError::Connect(source) => PoolError::Startup(source),
                other => other,
            })?;
            inner.free.lock().push(warm);
        }

        tracing::info!(
            pool = %inner.config.name,
            min = inner.config.pool_min,
            max = inner.config.pool_max,
            "session pool validated"
        );
        Ok(Self { inner })
    }

    /// Check out a session, waiting at most the configured queue timeout.
    ///
    /// Stale idle sessions are reaped on the way; when the free set is empty
    /// a fresh session is established.
    pub async fn acquire(&self) -> Result<PooledSession<D>, PoolError> {
        let inner = &self.inner;
        inner.counters.requests_total.fetch_add(1, Ordering::Relaxed);
        if inner.closed.load(Ordering::Acquire) {
            inner.counters.requests_failed.fetch_add(1, Ordering::Relaxed);
            return Err(PoolError::Closed);
        }

        let permit = match inner.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => {
                inner.counters.requests_failed.fetch_add(1, Ordering::Relaxed);
                return Err(PoolError::Closed);
            }
            Err(TryAcquireError::NoPermits) => {
                inner.counters.requests_queued.fetch_add(1, Ordering::Relaxed);
                let waited = Instant::now();
                match timeout(inner.config.queue_timeout, inner.semaphore.clone().acquire_owned())
                    .await
                {
                    Ok(Ok(permit)) => {
                        inner.counters.requests_dequeued.fetch_add(1, Ordering::Relaxed);
                        permit
                    }
                    Ok(Err(_)) => {
                        inner.counters.requests_failed.fetch_add(1, Ordering::Relaxed);
                        return Err(PoolError::Closed);
                    }
                    Err(_) => {
                        let waited_ms = waited.elapsed().as_millis() as u64;
                        inner.counters.requests_timed_out.fetch_add(1, Ordering::Relaxed);
                        inner.counters.requests_failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            pool = %inner.config.name,
                            waited_ms,
                            "acquire timed out waiting for a free session"
                        );
                        return Err(PoolError::QueueTimeout { waited_ms });
                    }
                }
            }
        };

        let idle = loop {
            let candidate = inner.free.lock().pop();
            match candidate {
                Some(stale) if stale.idle_since.elapsed() > inner.config.pool_timeout => {
                    inner.counters.open.fetch_sub(1, Ordering::Relaxed);
                    tracing::debug!(
                        pool = %inner.config.name,
                        session = stale.id,
                        "idle session reaped"
                    );
                    let mut session = stale.session;
                    if let Err(e) = session.close().await {
                        tracing::debug!(error = %e, "stale session close failed");
                    }
                }
                Some(live) => break live,
                None => match inner.connect_session().await {
                    Ok(fresh) => break fresh,
                    Err(e) => {
                        inner.counters.requests_failed.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                },
            }
        };

        inner.counters.in_use.fetch_add(1, Ordering::Relaxed);
        Ok(PooledSession::new(idle, permit, inner.clone()))
    }

    /// Stop handing out sessions and close everything idle.
    ///
    /// Sessions currently checked out are closed as their wrappers are
    /// released or discarded.
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.semaphore.close();
        let drained: Vec<_> = std::mem::take(&mut *self.inner.free.lock());
        for idle in drained {
            self.inner.counters.open.fetch_sub(1, Ordering::Relaxed);
            let mut session = idle.session;
            if let Err(e) = session.close().await {
                tracing::debug!(
                    pool = %self.inner.config.name,
                    session = idle.id,
                    error = %e,
                    "session close failed on shutdown"
                );
            }
        }
        tracing::info!(pool = %self.inner.config.name, "pool shut down");
    }

    /// A point-in-time view of the pool counters and timing rings.
    #[must_use]
    pub fn snapshot(&self) -> PoolSnapshot {
        self.inner.counters.snapshot(&self.inner.stats.lock())
    }

    /// Record an automatic internal retry, visible in the snapshot.
    pub fn record_retry(&self) {
        self.inner.counters.retried.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the text of the most recent failure for the diagnostic channel.
    pub fn note_error(&self, text: impl Into<String>) {
        self.inner.stats.lock().record_error(text.into());
    }

    /// The most recently recorded failure text, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.stats.lock().last_error()
    }

    /// The pool's configuration after normalization.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// When the pool was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }
}

impl<D: Driver> PoolInner<D> {
    pub(crate) async fn connect_session(&self) -> Result<IdleSession<D::Session>, PoolError> {
        let session = self
            .driver
            .connect(&self.settings)
            .await
            .map_err(PoolError::Connect)?;
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.counters.open.fetch_add(1, Ordering::Relaxed);
        self.stats.lock().record_reconnect(Utc::now(), self.config.stats_max);
        tracing::info!(pool = %self.config.name, session = id, "session established");
        Ok(IdleSession {
            session,
            id,
            idle_since: Instant::now(),
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
