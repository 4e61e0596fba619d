//! Connector behaviour against live in-process backends.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use connector_hub::config::{AuthSpec, RateLimitSpec};
use connector_hub::connector::{BatchRequest, Connector, RequestOptions};
use serde_json::{json, Value};

mod common;
use common::{start_mock_backend, start_programmable_backend, test_config, RecordedRequest, TEST_BACKOFF};

#[tokio::test]
async fn test_retry_bound_on_always_failing_endpoint() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            (500, r#"{"error":"boom"}"#.to_string())
        }
    })
    .await;

    let connector = Connector::with_backoff_base(test_config("x", addr), TEST_BACKOFF);
    let started = Instant::now();
    let response = connector.request::<Value>("/data", RequestOptions::get()).await;
    let elapsed = started.elapsed();

    assert!(!response.success);
    assert_eq!(response.status_code, 500);
    assert_eq!(response.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3, "retries = 2 means 3 attempts");
    assert!(response.error.as_deref().unwrap().contains("HTTP 500"));

    // 2^1 * 10ms + 2^2 * 10ms between the three attempts.
    assert!(elapsed >= Duration::from_millis(60), "elapsed {:?}", elapsed);

    let metrics = connector.get_metrics();
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.successful_requests, 0);
    assert_eq!(metrics.error_rate, 1.0);
}

#[tokio::test]
async fn test_success_after_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, "unavailable".to_string())
            } else {
                (200, r#"{"ok":true}"#.to_string())
            }
        }
    })
    .await;

    let connector = Connector::with_backoff_base(test_config("x", addr), TEST_BACKOFF);
    let response = connector.request::<Value>("/data", RequestOptions::get()).await;

    assert!(response.success);
    assert_eq!(response.status_code, 200);
    assert_eq!(response.attempts, 3);
    assert_eq!(response.data, Some(json!({"ok": true})));

    let metrics = connector.get_metrics();
    assert_eq!(metrics.total_requests, 1, "one sample per logical call");
    assert_eq!(metrics.successful_requests, 1);
    assert!(metrics.last_request_ms.is_some());
}

#[tokio::test]
async fn test_zero_retries_makes_one_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = start_programmable_backend(move |_| {
        let cc = cc.clone();
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            (502, String::new())
        }
    })
    .await;

    let mut config = test_config("x", addr);
    config.retries = 0;
    let connector = Connector::with_backoff_base(config, TEST_BACKOFF);
    let response = connector.request::<Value>("/data", RequestOptions::get()).await;

    assert!(!response.success);
    assert_eq!(response.status_code, 502);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_is_reported_distinctly() {
    let addr = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, "{}".to_string())
    })
    .await;

    let mut config = test_config("slow", addr);
    config.retries = 0;
    let connector = Connector::with_backoff_base(config, TEST_BACKOFF);

    let response = connector
        .request::<Value>("/slow", RequestOptions::get().with_timeout(Duration::from_millis(50)))
        .await;

    assert!(!response.success);
    assert_eq!(response.status_code, 0);
    assert!(response.error.as_deref().unwrap().starts_with("request timed out"));
    assert!(response.response_time_ms < 500);
}

#[tokio::test]
async fn test_unbounded_timeout_still_completes() {
    let addr = start_mock_backend(r#"{"ok":true}"#).await;

    let mut config = test_config("patient", addr);
    config.timeout_ms = u64::MAX;
    let connector = Connector::with_backoff_base(config, TEST_BACKOFF);

    let response = connector
        .request::<Value>("/x", RequestOptions::get().with_timeout(Duration::MAX))
        .await;
    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(response.data, Some(json!({"ok": true})));

    // The configured timeout is used when the call does not override it.
    let response = connector.request::<Value>("/x", RequestOptions::get()).await;
    assert!(response.success, "error: {:?}", response.error);
    assert_eq!(connector.get_metrics().successful_requests, 2);
}

#[tokio::test]
async fn test_identity_and_auth_headers() {
    let seen: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let addr = start_programmable_backend(move |req| {
        sink.lock().unwrap().push(req);
        async { (200, "{}".to_string()) }
    })
    .await;

    let cases = [
        (AuthSpec::Bearer { token: "tok".into() }, "authorization", "Bearer tok"),
        (AuthSpec::ApiKey { key: "k-123".into() }, "x-api-key", "k-123"),
        (
            AuthSpec::Basic { username: "u".into(), password: "p".into() },
            "authorization",
            "Basic dTpw",
        ),
        (AuthSpec::OAuth { token: "o-tok".into() }, "authorization", "OAuth o-tok"),
    ];

    for (auth, header, expected) in cases {
        let mut config = test_config("svc", addr);
        config.headers.insert("X-Service-Type".into(), "assistant".into());
        config.auth = Some(auth);
        let connector = Connector::new(config);

        let response = connector.request::<Value>("/echo", RequestOptions::get()).await;
        assert!(response.success);

        let req = seen.lock().unwrap().pop().unwrap();
        assert_eq!(req.header(header), Some(expected));
        assert_eq!(req.header("x-service-id"), Some("svc"));
        assert_eq!(req.header("x-service-type"), Some("assistant"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("x-request-id").is_some());
    }
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let seen: Arc<Mutex<Option<RecordedRequest>>> = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let addr = start_programmable_backend(move |req| {
        *sink.lock().unwrap() = Some(req);
        async { (201, r#"{"id":7}"#.to_string()) }
    })
    .await;

    let connector = Connector::new(test_config("svc", addr));
    let response = connector
        .request::<Value>("/items", RequestOptions::post(json!({"name": "widget"})))
        .await;

    assert!(response.success);
    assert_eq!(response.status_code, 201);
    let req = seen.lock().unwrap().take().unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/items");
    assert_eq!(serde_json::from_str::<Value>(&req.body).unwrap(), json!({"name": "widget"}));
}

#[tokio::test]
async fn test_undecodable_body_is_a_failure() {
    let addr = start_mock_backend("definitely not json").await;
    let connector = Connector::new(test_config("svc", addr));

    let response = connector.request::<Value>("/data", RequestOptions::get()).await;
    assert!(!response.success);
    assert_eq!(response.status_code, 200);
    assert!(response.error.unwrap().starts_with("invalid response body"));
}

#[tokio::test]
async fn test_health_check_leaves_metrics_alone() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let addr = start_programmable_backend(move |req| {
        sink.lock().unwrap().push(req.path);
        async { (200, String::new()) }
    })
    .await;

    let mut config = test_config("svc", addr);
    config.health_check.endpoint = "/status".into();
    let connector = Connector::new(config);

    let probe = connector.health_check().await;
    assert!(probe.success);
    assert_eq!(probe.attempts, 1);
    assert_eq!(*seen.lock().unwrap(), vec!["/status".to_string()]);
    assert_eq!(connector.get_metrics().total_requests, 0);
}

#[tokio::test]
async fn test_batch_keeps_submission_order() {
    let addr = start_programmable_backend(|req| async move {
        let delay = match req.path.as_str() {
            "/a" => 80,
            "/b" => 40,
            _ => 0,
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if req.path == "/fail" {
            (500, String::new())
        } else {
            (200, json!({ "path": req.path }).to_string())
        }
    })
    .await;

    let mut config = test_config("svc", addr);
    config.retries = 0;
    let connector = Connector::with_backoff_base(config, TEST_BACKOFF);

    let responses = connector
        .batch_request::<Value>(vec![
            BatchRequest::new("/a", RequestOptions::get()),
            BatchRequest::new("/fail", RequestOptions::get()),
            BatchRequest::new("/b", RequestOptions::get()),
            BatchRequest::new("/c", RequestOptions::get()),
        ])
        .await;

    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0].data, Some(json!({"path": "/a"})));
    assert!(!responses[1].success, "one failure does not cancel siblings");
    assert_eq!(responses[2].data, Some(json!({"path": "/b"})));
    assert_eq!(responses[3].data, Some(json!({"path": "/c"})));
    assert_eq!(connector.get_metrics().total_requests, 4);
}

#[tokio::test]
async fn test_rate_limit_delays_excess_requests() {
    let addr = start_mock_backend("{}").await;
    let mut config = test_config("svc", addr);
    config.rate_limit = Some(RateLimitSpec { requests: 2, window_ms: 200 });

    let started = Instant::now();
    let connector = Connector::new(config);
    for _ in 0..3 {
        assert!(connector.request::<Value>("/x", RequestOptions::get()).await.success);
    }

    // Two tokens up front, the third refills at 2 per 200ms.
    assert!(started.elapsed() >= Duration::from_millis(90), "elapsed {:?}", started.elapsed());
}

#[tokio::test]
async fn test_update_config_keeps_metrics() {
    let first = start_mock_backend(r#"{"from":"first"}"#).await;
    let second = start_mock_backend(r#"{"from":"second"}"#).await;

    let connector = Connector::new(test_config("svc", first));
    connector.request::<Value>("/x", RequestOptions::get()).await;

    let mut moved = test_config("renamed", second);
    moved.timeout_ms = 1_234;
    connector.update_config(moved);

    assert_eq!(connector.service_id(), "svc");
    assert_eq!(connector.config().timeout_ms, 1_234);

    let response = connector.request::<Value>("/x", RequestOptions::get()).await;
    assert_eq!(response.data, Some(json!({"from": "second"})));
    assert_eq!(connector.get_metrics().total_requests, 2);

    connector.reset_metrics();
    assert_eq!(connector.get_metrics().total_requests, 0);
}
