//! Integration tests for the dashboard aggregates.
//!
//! Tests cover:
//! - Summary statistics over live responses
//! - Parallel fetch failure reporting
//! - Service health classification

use axum::http::{Method, StatusCode};
use client::{fetch_dashboard_stats, fetch_system_health, ClientError};
use serde_json::json;
use shared::aggregation::HealthStatus;

use super::common::{log_json, metric_json, trace_json, FakeApi};

fn serve_dashboard_data(api: &FakeApi) {
    api.state.respond_json(
        "/logs",
        &json!([
            log_json(3, "checkout", "ERROR", "payment declined"),
            log_json(2, "auth", "FATAL", "key store unavailable"),
            log_json(1, "checkout", "INFO", "order placed"),
        ]),
    );
    api.state.respond_json(
        "/metrics",
        &json!([
            metric_json("gateway", 200, 10.0),
            metric_json("checkout", 200, 20.0),
            metric_json("checkout", 201, 20.0),
        ]),
    );
    api.state.respond_json(
        "/traces",
        &json!([
            trace_json("t-2", "search", false),
            trace_json("t-1", "gateway", true),
        ]),
    );
}

#[tokio::test]
async fn test_dashboard_stats_summarizes_all_sources() {
    let api = FakeApi::start().await;
    serve_dashboard_data(&api);

    let stats = fetch_dashboard_stats(&api.client()).await.unwrap();

    assert_eq!(stats.total_logs, 3);
    assert_eq!(stats.error_count, 1);
    assert!((stats.avg_response_time - 16.67).abs() < f64::EPSILON);
    assert_eq!(stats.active_traces, 1);
    assert_eq!(
        stats.top_services,
        vec!["checkout", "auth", "gateway", "search"]
    );
}

#[tokio::test]
async fn test_dashboard_stats_uses_sample_limits() {
    let api = FakeApi::start().await;
    serve_dashboard_data(&api);

    fetch_dashboard_stats(&api.client()).await.unwrap();

    assert_eq!(
        api.state.requests_to("/logs")[0].query.as_deref(),
        Some("limit=1000")
    );
    assert_eq!(
        api.state.requests_to("/metrics")[0].query.as_deref(),
        Some("limit=1000")
    );
    assert_eq!(
        api.state.requests_to("/traces")[0].query.as_deref(),
        Some("limit=100")
    );
}

#[tokio::test]
async fn test_empty_sources_yield_zero_stats() {
    let api = FakeApi::start().await;
    api.state.respond(Method::GET, "/logs", StatusCode::OK, "null");
    api.state.respond_json("/metrics", &json!([]));
    api.state.respond_json("/traces", &json!([]));

    let stats = fetch_dashboard_stats(&api.client()).await.unwrap();

    assert_eq!(stats.total_logs, 0);
    assert!(stats.avg_response_time.abs() < f64::EPSILON);
    assert!(stats.top_services.is_empty());
}

#[tokio::test]
async fn test_one_failed_source_fails_the_aggregate() {
    let api = FakeApi::start().await;
    serve_dashboard_data(&api);
    api.state
        .respond(Method::GET, "/traces", StatusCode::SERVICE_UNAVAILABLE, "");

    let err = fetch_dashboard_stats(&api.client()).await.unwrap_err();

    let ClientError::Aggregation { failures } = err else {
        panic!("expected aggregation error");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].resource, "traces");
    assert_eq!(failures[0].error.status(), Some(503));

    // The other fetches still ran to completion.
    assert_eq!(api.state.hits("/logs"), 1);
    assert_eq!(api.state.hits("/metrics"), 1);
}

#[tokio::test]
async fn test_system_health_classifies_services() {
    let api = FakeApi::start().await;
    api.state
        .respond(Method::GET, "/health", StatusCode::OK, "OK");

    let mut metrics = Vec::new();
    for status in [200, 200, 500, 200, 200, 200, 200, 200, 200, 200] {
        metrics.push(metric_json("checkout", status, 5.0));
    }
    for _ in 0..4 {
        metrics.push(metric_json("search", 200, 5.0));
    }
    metrics.push(metric_json("billing", 502, 5.0));
    metrics.push(metric_json("billing", 500, 5.0));
    api.state.respond_json("/metrics", &json!(metrics));

    let health = fetch_system_health(&api.client()).await.unwrap();

    assert_eq!(health.health, "OK");
    assert_eq!(health.services.len(), 3);

    let checkout = &health.services[0];
    assert_eq!(checkout.name, "checkout");
    assert_eq!(checkout.status, HealthStatus::Warning);
    assert_eq!(checkout.error_rate, 10);

    assert_eq!(health.services[1].name, "search");
    assert_eq!(health.services[1].status, HealthStatus::Healthy);

    assert_eq!(health.services[2].name, "billing");
    assert_eq!(health.services[2].status, HealthStatus::Error);
    assert_eq!(health.services[2].error_rate, 100);

    assert_eq!(
        api.state.requests_to("/metrics")[0].query.as_deref(),
        Some("limit=100")
    );
}

#[tokio::test]
async fn test_system_health_reports_every_failure() {
    let api = FakeApi::start().await;

    let err = fetch_system_health(&api.client()).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Aggregation failed: health: HTTP 404: 404 page not found; \
         metrics: HTTP 404: 404 page not found"
    );
}
