//! The gateway: pooled execution with probe, retry and discard policy.

use std::sync::Arc;

use orajson_core::{CallRequest, DecodedResult, RequestContext};
use orajson_driver::{ConnectSettings, Driver};
use orajson_pool::{Pool, PoolConfig, PoolError, PooledSession};

use crate::admin::AdminReport;
use crate::cache::CacheHook;
use crate::error::GatewayError;

/// Execution ceiling above which the diagnostic report flags the gateway as
/// busy.
pub const DEFAULT_MAX_PROCEDURES: u32 = 3;

/// A request-to-stored-procedure gateway over a bounded session pool.
///
/// One [`execute`](Gateway::execute) call runs the whole pipeline: acquire a
/// pooled session, probe it, build and execute the call, decode the result,
/// then release or discard the session depending on the outcome. A session
/// that failed its probe is swapped for a fresh one once before the call is
/// given up on; a session that produced any execution-path failure is
/// discarded, never pooled again.
///
/// The gateway is cheap to clone; clones share the pool and its counters.
pub struct Gateway<D: Driver> {
    pool: Pool<D>,
    cache: Option<Arc<dyn CacheHook>>,
    admin_secret: Option<String>,
    max_procedures: u32,
}

impl<D: Driver> Clone for Gateway<D> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            cache: self.cache.clone(),
            admin_secret: self.admin_secret.clone(),
            max_procedures: self.max_procedures,
        }
    }
}

impl<D: Driver> Gateway<D> {
    /// Create the gateway and validate its pool.
    ///
    /// Fails with [`PoolError::Startup`] when no usable session can be
    /// established; the embedding process must treat that as fatal rather
    /// than serving with a broken pool.
    pub async fn connect(
        driver: D,
        settings: ConnectSettings,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        let pool = Pool::initialize(driver, settings, config).await?;
        Ok(Self {
            pool,
            cache: None,
            admin_secret: None,
            max_procedures: DEFAULT_MAX_PROCEDURES,
        })
    }

    /// Install the post-success cache hook.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheHook>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Gate the diagnostic report's failure text behind this shared secret.
    #[must_use]
    pub fn with_admin_secret(mut self, secret: impl Into<String>) -> Self {
        self.admin_secret = Some(secret.into());
        self
    }

    /// Change the execution ceiling used for the `busy` health summary.
    #[must_use]
    pub fn with_max_procedures(mut self, ceiling: u32) -> Self {
        self.max_procedures = ceiling;
        self
    }

    /// The gateway's name, from its pool configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.pool.config().name
    }

    /// Run one call end to end.
    ///
    /// On success the session returns to the pool and, when the descriptor
    /// opted in, the cache hook sees the decoded result. On any
    /// execution-path failure the session is discarded and the classified
    /// error is surfaced for the embedding framework to map onto a response;
    /// nothing is resolved silently.
    pub async fn execute(
        &self,
        request: &CallRequest,
        ctx: &RequestContext,
    ) -> Result<DecodedResult, GatewayError> {
        let mut session = self.checkout().await?;

        match session.execute(request, ctx).await {
            Ok(result) => {
                session.release().await;
                if request.cache {
                    if let Some(cache) = &self.cache {
                        cache.put(request, &result, ctx).await;
                    }
                }
                Ok(result)
            }
            Err(e) => {
                if e.discards_session() {
                    self.pool.note_error(e.to_string());
                    session.discard().await;
                } else {
                    session.release().await;
                }
                Err(GatewayError::Call(e))
            }
        }
    }

    /// Check that a live session can be obtained right now.
    ///
    /// The probed session goes straight back to the pool; a failure reports
    /// the same way an [`execute`](Gateway::execute) checkout would.
    pub async fn test(&self) -> Result<(), GatewayError> {
        let session = self.checkout().await?;
        session.release().await;
        Ok(())
    }

    /// Acquire a session and prove it is live, swapping in one fresh session
    /// if the first probe fails.
    async fn checkout(&self) -> Result<PooledSession<D>, GatewayError> {
        let mut session = self.pool.acquire().await?;
        let Err(first) = session.probe().await else {
            return Ok(session);
        };

        tracing::warn!(
            pool = %self.name(),
            session = session.id(),
            error = %first,
            "liveness probe failed, retrying on a fresh session"
        );
        self.pool.note_error(first.to_string());
        session.discard().await;
        self.pool.record_retry();

        let mut retry = match self.pool.acquire().await {
            Ok(retry) => retry,
            Err(PoolError::Connect(source)) => {
                return Err(GatewayError::Connectivity { attempts: 2, source });
            }
            Err(other) => return Err(GatewayError::Pool(other)),
        };
        match retry.probe().await {
            Ok(()) => Ok(retry),
            Err(source) => {
                self.pool.note_error(source.to_string());
                retry.discard().await;
                Err(GatewayError::Connectivity { attempts: 2, source })
            }
        }
    }

    /// The diagnostic report for the admin endpoint.
    ///
    /// The last recorded failure text is included only when `secret` matches
    /// the configured admin secret; everything else is safe for any
    /// operator. Serve it with [`NO_CACHE_HEADERS`](crate::NO_CACHE_HEADERS).
    #[must_use]
    pub fn admin(&self, secret: Option<&str>) -> AdminReport {
        let snapshot = self.pool.snapshot();
        let connection = AdminReport::classify(&snapshot, self.max_procedures);
        let last_error = match (&self.admin_secret, secret) {
            (Some(expected), Some(presented)) if expected == presented => {
                self.pool.last_error()
            }
            _ => None,
        };
        AdminReport {
            name: self.pool.config().name.clone(),
            start_time: self.pool.started_at(),
            connection,
            max_procedures: self.max_procedures,
            keep_open: self.pool.config().keep_open,
            last_error,
            pool: snapshot,
        }
    }

    /// Shut the pool down; in-flight calls finish, new acquires fail.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}
