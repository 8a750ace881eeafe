//! Integration tests for the polling dashboard views.
//!
//! Tests cover:
//! - Request deduplication across subscribers
//! - Polling while subscribed and stopping after release
//! - Stale data retention when a refresh fails

use axum::http::{Method, StatusCode};
use client::{DashboardQueries, PollingConfig, QueryStatus};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::common::{eventually, log_json, metric_json, trace_json, FakeApi};

fn polling(interval: Duration) -> PollingConfig {
    PollingConfig {
        stats_interval: interval,
        logs_interval: interval,
        health_interval: interval,
        release_grace: Duration::ZERO,
    }
}

fn serve_all(api: &FakeApi) {
    api.state
        .respond_json("/logs", &json!([log_json(1, "auth", "ERROR", "denied")]));
    api.state
        .respond_json("/metrics", &json!([metric_json("auth", 200, 4.0)]));
    api.state
        .respond_json("/traces", &json!([trace_json("t-1", "auth", false)]));
    api.state
        .respond(Method::GET, "/health", StatusCode::OK, "OK");
}

#[tokio::test]
async fn test_concurrent_subscribers_share_requests() {
    let api = FakeApi::start().await;
    serve_all(&api);
    api.state.respond_after(
        Method::GET,
        "/logs",
        StatusCode::OK,
        json!([log_json(1, "auth", "ERROR", "denied")]).to_string(),
        Duration::from_millis(100),
    );

    let dashboard = DashboardQueries::new(Arc::new(api.client()), PollingConfig::default());
    let mut first = dashboard.stats();
    let mut second = dashboard.stats();

    let a = first.settled().await.unwrap();
    let b = second.settled().await.unwrap();

    assert_eq!(a.status, QueryStatus::Success);
    assert!(Arc::ptr_eq(a.data.as_ref().unwrap(), b.data.as_ref().unwrap()));
    assert_eq!(a.data.unwrap().error_count, 1);
    assert_eq!(api.state.hits("/logs"), 1);
    assert_eq!(api.state.hits("/metrics"), 1);
    assert_eq!(api.state.hits("/traces"), 1);
}

#[tokio::test]
async fn test_views_poll_while_subscribed() {
    let api = FakeApi::start().await;
    serve_all(&api);

    let dashboard = DashboardQueries::new(
        Arc::new(api.client()),
        polling(Duration::from_millis(50)),
    );
    let mut health = dashboard.system_health();
    let state = health.settled().await.unwrap();
    assert_eq!(state.data.unwrap().services[0].name, "auth");

    let state = api.state.clone();
    assert!(eventually(Duration::from_secs(2), || state.hits("/health") >= 3).await);
}

#[tokio::test]
async fn test_polling_stops_after_last_unsubscribe() {
    let api = FakeApi::start().await;
    serve_all(&api);

    let dashboard = DashboardQueries::new(
        Arc::new(api.client()),
        polling(Duration::from_millis(50)),
    );
    let mut logs = dashboard.recent_logs(5);
    logs.settled().await.unwrap();
    drop(logs);

    // Let any request already on the wire land before counting.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let hits = api.state.hits("/logs");
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(api.state.hits("/logs"), hits);
}

#[tokio::test]
async fn test_recent_logs_are_keyed_by_limit() {
    let api = FakeApi::start().await;
    serve_all(&api);

    let dashboard = DashboardQueries::new(Arc::new(api.client()), PollingConfig::default());
    let mut five = dashboard.recent_logs(5);
    let mut ten = dashboard.recent_logs(10);

    assert_eq!(five.key().to_string(), "recent-logs?limit=5");
    five.settled().await.unwrap();
    ten.settled().await.unwrap();

    let mut queries: Vec<_> = api
        .state
        .requests_to("/logs")
        .into_iter()
        .filter_map(|r| r.query)
        .collect();
    queries.sort();
    assert_eq!(queries, vec!["limit=10", "limit=5"]);
}

#[tokio::test]
async fn test_failed_refresh_keeps_stale_data() {
    let api = FakeApi::start().await;
    serve_all(&api);

    let dashboard = DashboardQueries::new(Arc::new(api.client()), PollingConfig::default());
    let mut stats = dashboard.stats();
    let state = stats.settled().await.unwrap();
    assert!(state.is_success());

    api.state
        .respond(Method::GET, "/metrics", StatusCode::BAD_GATEWAY, "upstream down");
    stats.refetch();
    let state = stats
        .wait_for(|s| s.is_error() && !s.is_refreshing)
        .await
        .unwrap();

    assert!(state.is_stale());
    assert_eq!(state.data.unwrap().total_logs, 1);
    assert_eq!(
        state.error.unwrap().to_string(),
        "Aggregation failed: metrics: HTTP 502: upstream down"
    );

    // Recovery clears the error.
    serve_all(&api);
    dashboard.invalidate_all();
    let state = stats
        .wait_for(|s| s.is_success() && !s.is_refreshing)
        .await
        .unwrap();
    assert!(state.error.is_none());
}
