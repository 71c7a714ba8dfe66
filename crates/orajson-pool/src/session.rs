//! The connection wrapper: one checked-out session during one logical call.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;

use orajson_core::{
    CallRequest, DecodedResult, Error, RequestContext, build_call, decode_output, masked_input,
};
use orajson_driver::{Driver, DriverError, Session};

use crate::pool::{IdleSession, PoolInner};

/// A session checked out of the pool.
///
/// Exactly one call is outstanding on a session at a time; concurrency comes
/// from the pool holding multiple sessions, never from interleaving calls on
/// one. The wrapper must be handed back explicitly: [`release`](Self::release)
/// after a fully successful call, [`discard`](Self::discard) after any
/// execution-path failure or a failed probe. A wrapper dropped without either
/// counts as a discard.
pub struct PooledSession<D: Driver> {
    session: Option<D::Session>,
    id: u64,
    pool: Arc<PoolInner<D>>,
    permit: Option<OwnedSemaphorePermit>,
    last_procedure: Option<String>,
    last_duration: Option<Duration>,
}

impl<D: Driver> PooledSession<D> {
    pub(crate) fn new(
        idle: IdleSession<D::Session>,
        permit: OwnedSemaphorePermit,
        pool: Arc<PoolInner<D>>,
    ) -> Self {
        Self {
            session: Some(idle.session),
            id: idle.id,
            pool,
            permit: Some(permit),
            last_procedure: None,
            last_duration: None,
        }
    }

    /// The pool-wide identity of the underlying session.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bare name of the last executed procedure, for diagnostics.
    #[must_use]
    pub fn last_procedure(&self) -> Option<&str> {
        self.last_procedure.as_deref()
    }

    /// Wall-clock duration of the last execution, for diagnostics.
    #[must_use]
    pub fn last_duration(&self) -> Option<Duration> {
        self.last_duration
    }

    /// Build, execute and decode one call.
    ///
    /// Timing and the bare procedure name are recorded regardless of outcome.
    /// On any `Err` whose [`Error::discards_session`] is true the caller must
    /// [`discard`](Self::discard) this wrapper instead of releasing it.
    pub async fn execute(
        &mut self,
        request: &CallRequest,
        ctx: &RequestContext,
    ) -> Result<DecodedResult, Error> {
        let call = build_call(request, ctx)?;
        let exec_id = self.pool.counters.total_executions.fetch_add(1, Ordering::Relaxed);
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                pool = %self.pool.config.name,
                session = self.id,
                exec_id,
                statement = %call.statement,
                params = ?masked_input(request, ctx),
                "executing"
            );
        }

        let session = self.session.as_mut().ok_or(Error::Execution(DriverError::Closed))?;
        self.pool.counters.executing.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let outcome = session.execute(&call.statement, call.binds).await;
        let elapsed = started.elapsed();
        self.pool.counters.executing.fetch_sub(1, Ordering::Relaxed);

        let name = request.bare_name().to_string();
        self.pool
            .stats
            .lock()
            .record_execution(&name, elapsed, self.pool.config.stats_max);
        tracing::debug!(
            pool = %self.pool.config.name,
            session = self.id,
            exec_id,
            procedure = %name,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = outcome.is_ok(),
            "call returned"
        );
        self.last_procedure = Some(name);
        self.last_duration = Some(elapsed);

        decode_output(request.output, outcome?).await
    }

    /// Run the liveness probe.
    ///
    /// On failure the caller must [`discard`](Self::discard) the wrapper; a
    /// session that failed its probe never re-enters the free set.
    pub async fn probe(&mut self) -> Result<(), DriverError> {
        match self.session.as_mut() {
            Some(session) => session.ping().await,
            None => Err(DriverError::Closed),
        }
    }

    /// Hand the session back after a fully successful call.
    ///
    /// With `keep_open` (the default) the session rejoins the free set; when
    /// sessions are not kept open, or the pool has shut down, it is closed
    /// instead. Close failures are logged and swallowed: a release failure
    /// must never fail the caller's already-completed result.
    pub async fn release(mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let permit = self.permit.take();
        self.pool.counters.in_use.fetch_sub(1, Ordering::Relaxed);
        if self.pool.config.keep_open && !self.pool.is_closed() {
            tracing::debug!(pool = %self.pool.config.name, session = self.id, "session released");
            self.pool.free.lock().push(IdleSession {
                session,
                id: self.id,
                idle_since: Instant::now(),
            });
        } else {
            self.pool.counters.open.fetch_sub(1, Ordering::Relaxed);
            if let Err(e) = session.close().await {
                tracing::warn!(
                    pool = %self.pool.config.name,
                    session = self.id,
                    error = %e,
                    "session close failed on release"
                );
            }
        }
        drop(permit);
    }

    /// Close the session without returning it to the free set.
    ///
    /// The next acquire that finds the free set empty establishes a fresh
    /// session.
    pub async fn discard(mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let permit = self.permit.take();
        self.pool.counters.in_use.fetch_sub(1, Ordering::Relaxed);
        self.pool.counters.open.fetch_sub(1, Ordering::Relaxed);
        tracing::info!(pool = %self.pool.config.name, session = self.id, "session discarded");
        if let Err(e) = session.close().await {
            tracing::debug!(
                pool = %self.pool.config.name,
                session = self.id,
                error = %e,
                "session close failed on discard"
            );
        }
        drop(permit);
    }
}

impl<D: Driver> std::fmt::Debug for PooledSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession")
            .field("id", &self.id)
            .field("last_procedure", &self.last_procedure)
            .field("last_duration", &self.last_duration)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Drop for PooledSession<D> {
    fn drop(&mut self) {
        // Dropping the inner session closes the underlying resources; the
        // async close with its error logging is only available through
        // `release`/`discard`.
        if self.session.take().is_some() {
            self.pool.counters.in_use.fetch_sub(1, Ordering::Relaxed);
            self.pool.counters.open.fetch_sub(1, Ordering::Relaxed);
            tracing::warn!(
                pool = %self.pool.config.name,
                session = self.id,
                "session dropped without release, treated as discarded"
            );
        }
    }
}
