//! Integration tests for the monitoring API client.
//!
//! Tests cover:
//! - Authentication header handling
//! - Filter query encoding
//! - Status and decoding error mapping
//! - Write payloads and path encoding

use axum::http::{Method, StatusCode};
use client::{ClientError, ErrorKind};
use serde_json::json;
use shared::filter::{LogFilter, MetricFilter, TraceFilter};
use shared::models::{LogLevel, NewLog, NewMetric, NewSpan, NewTrace};

use super::common::{log_json, metric_json, trace_json, FakeApi, TEST_API_KEY};

#[tokio::test]
async fn test_health_is_unauthenticated() {
    let api = FakeApi::start().await;
    api.state
        .respond(Method::GET, "/health", StatusCode::OK, "OK\n");

    let health = api.client().get_health().await.unwrap();
    assert_eq!(health, "OK\n");

    let requests = api.state.requests_to("/health");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].api_key.is_none());
}

#[tokio::test]
async fn test_list_logs_sends_filter_and_credential() {
    let api = FakeApi::start().await;
    api.state.respond_json(
        "/logs",
        &json!([log_json(7, "auth", "ERROR", "login failed")]),
    );

    let filter = LogFilter::new()
        .with_service("auth")
        .with_level(LogLevel::Error)
        .with_limit(5);
    let logs = api.client().get_logs(&filter).await.unwrap();

    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, 7);
    assert_eq!(logs[0].log_level, LogLevel::Error);
    assert!(!logs[0].trace_id.is_present());

    let request = &api.state.requests_to("/logs")[0];
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.api_key.as_deref(), Some(TEST_API_KEY));
    assert_eq!(
        request.query.as_deref(),
        Some("service=auth&level=ERROR&limit=5")
    );
}

#[tokio::test]
async fn test_empty_filter_sends_no_query() {
    let api = FakeApi::start().await;
    api.state.respond_json("/traces", &json!([]));

    let traces = api.client().get_traces(&TraceFilter::new()).await.unwrap();
    assert!(traces.is_empty());
    assert!(api.state.requests_to("/traces")[0].query.is_none());
}

#[tokio::test]
async fn test_anonymous_client_sends_no_credential() {
    let api = FakeApi::start().await;
    api.state.respond_json("/metrics", &json!([]));

    tokio_test::assert_ok!(api.anonymous_client().get_metrics(&MetricFilter::new()).await);

    assert!(api.state.requests_to("/metrics")[0].api_key.is_none());
}

#[tokio::test]
async fn test_null_list_decodes_as_empty() {
    let api = FakeApi::start().await;
    api.state
        .respond(Method::GET, "/metrics", StatusCode::OK, "null");

    let metrics = api.client().get_metrics(&MetricFilter::new()).await.unwrap();
    assert!(metrics.is_empty());
}

#[tokio::test]
async fn test_metric_wire_format() {
    let api = FakeApi::start().await;
    api.state
        .respond_json("/metrics", &json!([metric_json("billing", 503, 12.5)]));

    let filter = MetricFilter::new().with_status_range(500, 599);
    let metrics = api.client().get_metrics(&filter).await.unwrap();

    assert_eq!(metrics[0].service_name, "billing");
    assert!(metrics[0].is_server_error());
    assert!(metrics[0].environment.is_none());
    assert_eq!(metrics[0].source.language, "go");
    assert_eq!(
        api.state.requests_to("/metrics")[0].query.as_deref(),
        Some("min_status=500&max_status=599")
    );
}

#[tokio::test]
async fn test_error_status_uses_body_as_message() {
    let api = FakeApi::start().await;
    api.state
        .respond(Method::GET, "/logs", StatusCode::UNAUTHORIZED, "Unauthorized\n");

    let err = api.client().get_logs(&LogFilter::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http);
    assert_eq!(err.status(), Some(401));
    assert!(matches!(
        err,
        ClientError::Http { ref message, .. } if message == "Unauthorized"
    ));
}

#[tokio::test]
async fn test_error_status_without_body_uses_reason() {
    let api = FakeApi::start().await;
    api.state
        .respond(Method::GET, "/traces", StatusCode::INTERNAL_SERVER_ERROR, "");

    let err = api.client().get_traces(&TraceFilter::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
}

#[tokio::test]
async fn test_unknown_route_is_http_error() {
    let api = FakeApi::start().await;

    let err = api.client().get_health().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_malformed_body_is_transport_error() {
    let api = FakeApi::start().await;
    api.state
        .respond(Method::GET, "/logs", StatusCode::OK, "{not json");

    let err = tokio_test::assert_err!(api.client().get_logs(&LogFilter::new()).await);
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let api = FakeApi::start().await;
    let client = api.client();
    drop(api);
    tokio::task::yield_now().await;

    let err = client.get_health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_create_log_posts_wire_payload() {
    let api = FakeApi::start().await;
    api.state.respond(
        Method::POST,
        "/logs",
        StatusCode::CREATED,
        log_json(1, "checkout", "WARN", "slow payment").to_string(),
    );

    let new_log = NewLog::new(LogLevel::Warn, "slow payment", "checkout")
        .with_trace_id("trace-1")
        .with_metadata("attempt", 2);
    let created = api.client().create_log(&new_log).await.unwrap();
    assert_eq!(created.id, 1);

    let body = api.state.requests_to("/logs")[0].body.clone().unwrap();
    assert_eq!(body["service_name"], "checkout");
    assert_eq!(body["log_level"], "WARN");
    assert_eq!(body["trace_id"], json!({"String": "trace-1", "Valid": true}));
    assert_eq!(body["metadata"]["attempt"], 2);
    assert!(body.get("span_id").is_none());
}

#[tokio::test]
async fn test_invalid_log_is_not_sent() {
    let api = FakeApi::start().await;

    let err = api
        .client()
        .create_log(&NewLog::new(LogLevel::Info, "", "checkout"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(api.state.requests().is_empty());
}

#[tokio::test]
async fn test_create_metric() {
    let api = FakeApi::start().await;
    api.state.respond(
        Method::POST,
        "/metrics",
        StatusCode::CREATED,
        metric_json("api", 200, 3.0).to_string(),
    );

    let metric = NewMetric::new("api", "/api/orders", "GET", 200, 3.0);
    let created = api.client().create_metric(&metric).await.unwrap();
    assert_eq!(created.status_code, 200);

    let body = api.state.requests_to("/metrics")[0].body.clone().unwrap();
    assert_eq!(body["method"], "GET");
    assert_eq!(body["status_code"], 200);
}

#[tokio::test]
async fn test_trace_lifecycle() {
    let api = FakeApi::start().await;
    api.state.respond(
        Method::POST,
        "/traces",
        StatusCode::CREATED,
        trace_json("t-1", "gateway", false).to_string(),
    );
    api.state.respond(
        Method::POST,
        "/traces/t-1/end",
        StatusCode::OK,
        trace_json("t-1", "gateway", true).to_string(),
    );

    let client = api.client();
    let started = client
        .create_trace(&NewTrace::new("gateway").with_id("t-1"))
        .await
        .unwrap();
    assert!(started.is_active());

    let ended = client.end_trace(&started.id).await.unwrap();
    assert!(!ended.is_active());
    assert_eq!(ended.duration_ms.get(), Some(&1000.0));

    let body = api.state.requests_to("/traces")[0].body.clone().unwrap();
    assert_eq!(body["id"], "t-1");
    assert_eq!(body["service_name"], "gateway");
}

#[tokio::test]
async fn test_span_paths_are_encoded() {
    let api = FakeApi::start().await;
    api.state.respond(
        Method::GET,
        "/traces/a%2Fb/spans",
        StatusCode::OK,
        json!([{
            "id": "s-1",
            "trace_id": "a/b",
            "parent_id": "",
            "service": "gateway",
            "operation": "GET /",
            "start_time": "2024-01-15T10:30:00Z",
            "end_time": "0001-01-01T00:00:00Z",
            "duration_ms": null
        }])
        .to_string(),
    );

    let spans = api.client().get_spans("a/b").await.unwrap();

    assert_eq!(spans.len(), 1);
    assert!(spans[0].is_root());
    assert!(!spans[0].is_finished());
}

#[tokio::test]
async fn test_span_lifecycle() {
    let api = FakeApi::start().await;
    let span = json!({
        "id": "s-2",
        "trace_id": "t-1",
        "parent_id": "s-1",
        "service": "db",
        "operation": "SELECT",
        "start_time": "2024-01-15T10:30:00Z",
        "end_time": "2024-01-15T10:30:00.250Z",
        "duration_ms": 250.0
    });
    api.state
        .respond(Method::POST, "/spans", StatusCode::CREATED, span.to_string());
    api.state
        .respond(Method::POST, "/spans/s-2/end", StatusCode::OK, span.to_string());

    let client = api.client();
    let created = client
        .create_span(&NewSpan::new("t-1", "db", "SELECT").with_parent("s-1"))
        .await
        .unwrap();
    assert!(!created.is_root());

    let ended = client.end_span("s-2").await.unwrap();
    assert!(ended.is_finished());
    assert_eq!(ended.duration_ms, Some(250.0));

    let body = api.state.requests_to("/spans")[0].body.clone().unwrap();
    assert_eq!(body["trace_id"], "t-1");
    assert_eq!(body["parent_id"], "s-1");
}
