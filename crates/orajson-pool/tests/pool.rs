//! Pool lifecycle tests against the scriptable mock driver.

use std::time::Duration;

use serde_json::json;

use orajson_core::{CallRequest, OutputSpec, RequestContext};
use orajson_pool::{Pool, PoolConfig, PoolError};
use orajson_testing::MockDriver;

async fn pool_with(driver: &MockDriver, config: PoolConfig) -> Pool<MockDriver> {
    Pool::initialize(driver.clone(), MockDriver::settings(), config)
        .await
        .expect("pool startup")
}

#[tokio::test]
async fn test_startup_connect_failure_is_fatal() {
    let driver = MockDriver::new();
    driver.fail_next_connects(1);
    let result = Pool::initialize(driver, MockDriver::settings(), PoolConfig::new()).await;
    assert!(matches!(result, Err(PoolError::Startup(_))));
}

#[tokio::test]
async fn test_startup_probe_failure_is_fatal() {
    let driver = MockDriver::new();
    driver.fail_next_pings(1);
    let result = Pool::initialize(driver, MockDriver::settings(), PoolConfig::new()).await;
    assert!(matches!(result, Err(PoolError::Startup(_))));
}

#[tokio::test]
async fn test_pool_min_is_warmed_at_startup() {
    let driver = MockDriver::new();
    let _pool = pool_with(&driver, PoolConfig::new().pool_min(2).pool_max(4)).await;
    assert_eq!(driver.connect_count(), 2);
}

#[tokio::test]
async fn test_release_pools_the_session_for_reuse() {
    let driver = MockDriver::new();
    let pool = pool_with(&driver, PoolConfig::new()).await;

    let first = pool.acquire().await.unwrap();
    let first_id = first.id();
    first.release().await;

    let second = pool.acquire().await.unwrap();
    assert_eq!(second.id(), first_id);
    second.release().await;

    assert_eq!(driver.connect_count(), 1);
    assert!(driver.closed_sessions().is_empty());
}

#[tokio::test]
async fn test_discard_closes_and_next_acquire_connects_fresh() {
    let driver = MockDriver::new();
    let pool = pool_with(&driver, PoolConfig::new()).await;

    let first = pool.acquire().await.unwrap();
    let first_id = first.id();
    first.discard().await;
    assert_eq!(driver.closed_sessions(), vec![first_id]);

    let second = pool.acquire().await.unwrap();
    assert_ne!(second.id(), first_id);
    assert_eq!(driver.connect_count(), 2);
    second.release().await;
}

#[tokio::test(start_paused = true)]
async fn test_acquire_fails_within_the_queue_timeout() {
    let driver = MockDriver::new();
    let pool = pool_with(
        &driver,
        PoolConfig::new().pool_max(1).queue_timeout(Duration::from_millis(50)),
    )
    .await;

    let held = pool.acquire().await.unwrap();
    let err = pool.acquire().await.unwrap_err();
    assert!(matches!(err, PoolError::QueueTimeout { waited_ms: 50 }));

    let snapshot = pool.snapshot();
    assert_eq!(snapshot.requests_queued, 1);
    assert_eq!(snapshot.requests_timed_out, 1);
    assert_eq!(snapshot.requests_failed, 1);
    held.release().await;
}

#[tokio::test]
async fn test_queued_acquire_resumes_on_release() {
    let driver = MockDriver::new();
    let pool = pool_with(
        &driver,
        PoolConfig::new().pool_max(1).queue_timeout(Duration::from_secs(5)),
    )
    .await;

    let held = pool.acquire().await.unwrap();
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await })
    };
    tokio::task::yield_now().await;
    held.release().await;

    let second = waiter.await.unwrap().unwrap();
    second.release().await;
    assert_eq!(pool.snapshot().requests_dequeued, 1);
    assert_eq!(driver.connect_count(), 1);
}

#[tokio::test]
async fn test_keep_open_disabled_closes_on_release() {
    let driver = MockDriver::new();
    let pool = pool_with(&driver, PoolConfig::new().keep_open(false)).await;

    let session = pool.acquire().await.unwrap();
    let id = session.id();
    session.release().await;
    assert_eq!(driver.closed_sessions(), vec![id]);

    let next = pool.acquire().await.unwrap();
    assert_ne!(next.id(), id);
    next.release().await;
}

#[tokio::test(start_paused = true)]
async fn test_stale_idle_sessions_are_reaped() {
    let driver = MockDriver::new();
    let pool = pool_with(
        &driver,
        PoolConfig::new().pool_timeout(Duration::from_secs(30)),
    )
    .await;

    tokio::time::advance(Duration::from_secs(31)).await;
    let session = pool.acquire().await.unwrap();
    assert_eq!(driver.connect_count(), 2, "stale session replaced");
    assert_eq!(driver.closed_sessions().len(), 1);
    session.release().await;
}

#[tokio::test]
async fn test_execute_records_timing_under_the_bare_name() {
    let driver = MockDriver::new();
    driver.respond_json(r#"{"status":"OK","price":299}"#);
    let pool = pool_with(&driver, PoolConfig::new()).await;

    let mut session = pool.acquire().await.unwrap();
    let request = CallRequest::procedure("pkg_test.getPrice")
        .with_inputs(json!({"planID": 600}))
        .with_output(OutputSpec::Json);
    session.execute(&request, &RequestContext::new()).await.unwrap();
    assert_eq!(session.last_procedure(), Some("getPrice"));
    session.release().await;

    let snapshot = pool.snapshot();
    assert_eq!(snapshot.total_executions, 1);
    assert_eq!(snapshot.executing, 0);
    assert_eq!(snapshot.execution_times["getPrice"].len(), 1);
}

#[tokio::test]
async fn test_shutdown_closes_idle_sessions_and_rejects_acquires() {
    let driver = MockDriver::new();
    let pool = pool_with(&driver, PoolConfig::new()).await;

    pool.shutdown().await;
    assert_eq!(driver.closed_sessions().len(), 1);
    assert!(matches!(pool.acquire().await, Err(PoolError::Closed)));
    assert_eq!(pool.snapshot().open, 0);
}

#[tokio::test]
async fn test_snapshot_counts_in_use_and_open() {
    let driver = MockDriver::new();
    let pool = pool_with(&driver, PoolConfig::new().pool_max(2)).await;

    let a = pool.acquire().await.unwrap();
    let b = pool.acquire().await.unwrap();
    let snapshot = pool.snapshot();
    assert_eq!(snapshot.in_use, 2);
    assert_eq!(snapshot.open, 2);
    assert_eq!(snapshot.requests_total, 2);

    a.release().await;
    b.release().await;
    let snapshot = pool.snapshot();
    assert_eq!(snapshot.in_use, 0);
    assert_eq!(snapshot.open, 2);
}
