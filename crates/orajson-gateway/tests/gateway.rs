//! End-to-end gateway tests against the scriptable mock driver.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use orajson_core::{CallRequest, DecodedResult, Error, OutputSpec, RequestContext};
use orajson_gateway::{
    CacheHook, Gateway, GatewayError, NO_CACHE_HEADERS, PoolConfig, PoolError,
};
use orajson_driver::DriverError;
use orajson_testing::MockDriver;

async fn gateway_with(driver: &MockDriver, config: PoolConfig) -> Gateway<MockDriver> {
    Gateway::connect(driver.clone(), MockDriver::settings(), config)
        .await
        .expect("gateway startup")
}

fn get_price() -> CallRequest {
    CallRequest::procedure("pkg_test.getPrice")
        .from_section("query")
        .with_output(OutputSpec::Json)
}

fn query_ctx() -> RequestContext {
    RequestContext::new().with_section("query", json!({"id": 7}))
}

#[tokio::test]
async fn test_successful_call_releases_the_session() {
    let driver = MockDriver::new();
    driver.respond_json(r#"{"status":"OK","price":299}"#);
    let gateway = gateway_with(&driver, PoolConfig::new().name("prices")).await;

    let result = gateway.execute(&get_price(), &query_ctx()).await.unwrap();
    let DecodedResult::Json(value) = result else {
        panic!("expected JSON result");
    };
    assert_eq!(value, json!({"status": "OK", "price": 299}));

    // Pooled, not closed: the next call reuses the same session.
    assert!(driver.closed_sessions().is_empty());
    driver.respond_json(r#"{"status":"OK","price":300}"#);
    gateway.execute(&get_price(), &query_ctx()).await.unwrap();
    assert_eq!(driver.connect_count(), 1);

    let calls = driver.executed_calls();
    assert_eq!(calls[0].statement, "Begin pkg_test.getPrice(:1,:2); End;");
}

#[tokio::test]
async fn test_error_status_discards_the_session() {
    let driver = MockDriver::new();
    driver.respond_json(r#"{"status":"ERROR","reason":"not found"}"#);
    let gateway = gateway_with(&driver, PoolConfig::new()).await;

    let err = gateway.execute(&get_price(), &query_ctx()).await.unwrap_err();
    assert!(err.is_app_status());
    let GatewayError::Call(Error::AppStatus { payload }) = err else {
        panic!("expected an application-status failure");
    };
    assert_eq!(payload["reason"], json!("not found"));

    // Discarded, not pooled: the session is closed and the next call gets a
    // fresh one.
    assert_eq!(driver.closed_sessions().len(), 1);
    driver.respond_json(r#"{"status":"OK"}"#);
    gateway.execute(&get_price(), &query_ctx()).await.unwrap();
    assert_eq!(driver.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_pool_times_out_independently_of_the_running_call() {
    let driver = MockDriver::new();
    driver.set_latency(Duration::from_millis(200));
    driver.respond_json(r#"{"status":"OK","price":299}"#);
    let gateway = gateway_with(
        &driver,
        PoolConfig::new()
            .pool_max(1)
            .queue_timeout(Duration::from_millis(50)),
    )
    .await;

    let first = {
        let gateway = gateway.clone();
        tokio::spawn(async move { gateway.execute(&get_price(), &query_ctx()).await })
    };
    tokio::task::yield_now().await;

    let err = gateway.execute(&get_price(), &query_ctx()).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Pool(PoolError::QueueTimeout { waited_ms: 50 })
    ));
    assert!(err.is_retryable());

    // The first request is unaffected by the second one's timeout.
    let result = first.await.unwrap().unwrap();
    assert!(matches!(result, DecodedResult::Json(_)));
}

#[tokio::test]
async fn test_failed_probe_swaps_in_a_fresh_session() {
    let driver = MockDriver::new();
    driver.respond_json(r#"{"status":"OK"}"#);
    let gateway = gateway_with(&driver, PoolConfig::new()).await;
    driver.fail_next_pings(1);

    gateway.execute(&get_price(), &query_ctx()).await.unwrap();

    // The probed-dead session was closed and never re-handed out.
    assert_eq!(driver.closed_sessions().len(), 1);
    assert_eq!(driver.connect_count(), 2);
    let report = gateway.admin(None);
    assert_eq!(report.pool.retried, 1);
}

#[tokio::test]
async fn test_probe_failing_twice_reports_connectivity() {
    let driver = MockDriver::new();
    let gateway = gateway_with(&driver, PoolConfig::new()).await;
    driver.fail_next_pings(2);

    let err = gateway.execute(&get_price(), &query_ctx()).await.unwrap_err();
    let GatewayError::Connectivity { attempts, source } = err else {
        panic!("expected a connectivity failure");
    };
    assert_eq!(attempts, 2);
    assert!(matches!(source, DriverError::Closed));
    assert_eq!(driver.closed_sessions().len(), 2);
}

#[tokio::test]
async fn test_driver_error_surfaces_and_discards() {
    let driver = MockDriver::new();
    driver.fail_execution(DriverError::Database {
        code: 6550,
        message: "wrong number or types of arguments".into(),
    });
    let gateway = gateway_with(&driver, PoolConfig::new()).await;

    let err = gateway.execute(&get_price(), &query_ctx()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Call(Error::Execution(_))));
    assert!(!err.is_retryable());
    assert_eq!(driver.closed_sessions().len(), 1);
}

#[tokio::test]
async fn test_no_output_call_returns_the_canonical_marker() {
    let driver = MockDriver::new();
    driver.respond_empty();
    let gateway = gateway_with(&driver, PoolConfig::new()).await;

    let request = CallRequest::procedure("pkg_test.runit");
    let result = gateway.execute(&request, &RequestContext::new()).await.unwrap();
    assert!(matches!(result, DecodedResult::NoneExpected));
    assert!(driver.closed_sessions().is_empty());
}

#[tokio::test]
async fn test_missing_output_is_an_error_not_a_marker() {
    let driver = MockDriver::new();
    driver.respond_empty();
    let gateway = gateway_with(&driver, PoolConfig::new()).await;

    let err = gateway.execute(&get_price(), &query_ctx()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Call(Error::MissingOutput)));
    assert_eq!(driver.closed_sessions().len(), 1);
}

#[tokio::test]
async fn test_raw_query_paginates_rows() {
    let driver = MockDriver::new();
    driver.respond_rows(vec![vec![
        json!({"ID": 1, "NAME": "basic"}),
        json!({"ID": 2, "NAME": "plus"}),
    ]]);
    let gateway = gateway_with(&driver, PoolConfig::new()).await;

    let request = CallRequest::raw_query("SELECT id, name FROM plans WHERE region = :region")
        .with_inputs(json!({"region": "EU"}));
    let result = gateway.execute(&request, &RequestContext::new()).await.unwrap();
    let DecodedResult::Rows(map) = result else {
        panic!("expected rows");
    };
    assert_eq!(map[&0].len(), 2);
    assert_eq!(map[&0][1].get_raw_by_name("name"), Some(&json!("plus")));

    let calls = driver.executed_calls();
    assert_eq!(calls[0].statement, "SELECT id, name FROM plans WHERE region = :region");
}

struct RecordingCache {
    puts: Mutex<Vec<Value>>,
}

#[async_trait]
impl CacheHook for RecordingCache {
    async fn put(&self, _request: &CallRequest, result: &DecodedResult, _ctx: &RequestContext) {
        if let DecodedResult::Json(value) = result {
            self.puts.lock().push(value.clone());
        }
    }
}

#[tokio::test]
async fn test_cache_hook_runs_only_on_opted_in_success() {
    let driver = MockDriver::new();
    let cache = Arc::new(RecordingCache { puts: Mutex::new(Vec::new()) });
    let gateway = gateway_with(&driver, PoolConfig::new())
        .await
        .with_cache(cache.clone());

    // Success without the cache flag: hook not invoked.
    driver.respond_json(r#"{"status":"OK","price":299}"#);
    gateway.execute(&get_price(), &query_ctx()).await.unwrap();
    assert!(cache.puts.lock().is_empty());

    // Success with the flag: hook sees the decoded payload.
    driver.respond_json(r#"{"status":"OK","price":299}"#);
    gateway
        .execute(&get_price().with_cache(), &query_ctx())
        .await
        .unwrap();
    assert_eq!(cache.puts.lock().as_slice(), &[json!({"status": "OK", "price": 299})]);

    // Failure with the flag: hook never sees error payloads.
    driver.respond_json(r#"{"status":"ERROR"}"#);
    let _ = gateway
        .execute(&get_price().with_cache(), &query_ctx())
        .await
        .unwrap_err();
    assert_eq!(cache.puts.lock().len(), 1);
}

#[tokio::test]
async fn test_admin_report_shape_and_secret_gating() {
    let driver = MockDriver::new();
    let gateway = gateway_with(&driver, PoolConfig::new().name("prices"))
        .await
        .with_admin_secret("s3cret");

    driver.respond_json(r#"{"status":"ERROR"}"#);
    let _ = gateway.execute(&get_price(), &query_ctx()).await.unwrap_err();

    let report = gateway.admin(None);
    assert_eq!(report.name, "prices");
    assert!(report.keep_open);
    assert_eq!(report.pool.total_executions, 1);
    assert_eq!(report.pool.reconnect_times.len(), 1);
    assert!(report.last_error.is_none(), "no secret, no error text");
    assert_eq!(gateway.admin(Some("wrong")).last_error, None);

    let trusted = gateway.admin(Some("s3cret"));
    assert!(trusted.last_error.is_some());

    // The failed call discarded the only session, so the report is degraded
    // until the next call re-establishes one.
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["connection"], "none");
    assert!(report.connection.is_degraded());
    assert_eq!(json["executionTimes"]["getPrice"].as_array().unwrap().len(), 1);

    driver.respond_json(r#"{"status":"OK"}"#);
    gateway.execute(&get_price(), &query_ctx()).await.unwrap();
    assert_eq!(gateway.admin(None).connection, orajson_gateway::Health::Good);
}

#[tokio::test]
async fn test_no_cache_headers_cover_all_http_generations() {
    let headers: Vec<&str> = NO_CACHE_HEADERS.iter().map(|(name, _)| *name).collect();
    assert_eq!(headers, vec!["Cache-Control", "Pragma", "Expires"]);
    assert_eq!(NO_CACHE_HEADERS[0].1, "no-cache,no-store,must-revalidate");
}

#[tokio::test]
async fn test_gateway_test_probes_and_releases() {
    let driver = MockDriver::new();
    let gateway = gateway_with(&driver, PoolConfig::new()).await;

    gateway.test().await.unwrap();
    assert!(driver.closed_sessions().is_empty());
    assert_eq!(driver.connect_count(), 1);
}
