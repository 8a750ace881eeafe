//! Common test utilities and helpers for integration tests.
//!
//! This module provides a fake monitoring API served by a real axum router on
//! an ephemeral local port, plus JSON fixtures in the server's wire format.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use client::{ClientConfig, MonitoringClient};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Credential configured on clients created by [`FakeApi::client`].
pub const TEST_API_KEY: &str = "test-key";

/// A request received by the fake API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    body: String,
    delay: Duration,
}

#[derive(Debug, Default)]
struct Recorder {
    routes: HashMap<(Method, String), Canned>,
    requests: Vec<RecordedRequest>,
}

/// Shared handle to the fake API's routes and request log.
#[derive(Debug, Clone, Default)]
pub struct FakeState {
    inner: Arc<Mutex<Recorder>>,
}

impl FakeState {
    /// Serves `body` with `status` for `method path`.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: impl Into<String>) {
        self.respond_after(method, path, status, body, Duration::ZERO);
    }

    /// Serves `value` as JSON with 200 OK for `GET path`.
    pub fn respond_json(&self, path: &str, value: &Value) {
        self.respond(Method::GET, path, StatusCode::OK, value.to_string());
    }

    /// Serves `body` with `status` for `method path` after `delay`.
    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        status: StatusCode,
        body: impl Into<String>,
        delay: Duration,
    ) {
        self.inner.lock().unwrap().routes.insert(
            (method, path.to_string()),
            Canned {
                status,
                body: body.into(),
                delay,
            },
        );
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Returns the requests received for `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Returns the number of requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

/// A running fake monitoring API.
pub struct FakeApi {
    pub base_url: String,
    pub state: FakeState,
    server: JoinHandle<()>,
}

impl FakeApi {
    /// Starts a fake API on an ephemeral port.
    pub async fn start() -> Self {
        let state = FakeState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            server,
        }
    }

    /// Creates a client with [`TEST_API_KEY`] pointed at this server.
    pub fn client(&self) -> MonitoringClient {
        MonitoringClient::new(&self.config().with_api_key(TEST_API_KEY)).unwrap()
    }

    /// Creates a client without a credential.
    pub fn anonymous_client(&self) -> MonitoringClient {
        MonitoringClient::new(&self.config()).unwrap()
    }

    fn config(&self) -> ClientConfig {
        ClientConfig::new(format!("{}/", self.base_url)).with_timeout(Duration::from_secs(5))
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(state): State<FakeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let canned = {
        let mut recorder = state.inner.lock().unwrap();
        recorder.requests.push(RecordedRequest {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().map(ToString::to_string),
            api_key: headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
            body: serde_json::from_slice(&body).ok(),
        });
        recorder.routes.get(&(method, uri.path().to_string())).cloned()
    };

    match canned {
        Some(canned) => {
            if !canned.delay.is_zero() {
                tokio::time::sleep(canned.delay).await;
            }
            (
                canned.status,
                [(header::CONTENT_TYPE, "application/json")],
                canned.body,
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 page not found\n").into_response(),
    }
}

/// A log entry as the server encodes it.
pub fn log_json(id: i64, service: &str, level: &str, message: &str) -> Value {
    json!({
        "id": id,
        "service_name": service,
        "log_level": level,
        "message": message,
        "timestamp": "2024-01-15T10:30:00Z",
        "trace_id": {"String": "", "Valid": false},
        "span_id": {"String": "", "Valid": false},
        "metadata": null
    })
}

/// An endpoint metric as the server encodes it.
pub fn metric_json(service: &str, status: u16, duration_ms: f64) -> Value {
    json!({
        "id": 1,
        "service_name": service,
        "path": "/api/orders",
        "method": "GET",
        "status_code": status,
        "duration_ms": duration_ms,
        "source": {"language": "go", "framework": "net/http", "version": "1.22"},
        "environment": "",
        "request_id": "",
        "timestamp": "2024-01-15T10:30:00Z"
    })
}

/// A trace as the server encodes it, ended or still active.
pub fn trace_json(id: &str, service: &str, ended: bool) -> Value {
    let (end_time, duration) = if ended {
        (
            json!({"Time": "2024-01-15T10:30:01Z", "Valid": true}),
            json!({"Float64": 1000.0, "Valid": true}),
        )
    } else {
        (
            json!({"Time": "0001-01-01T00:00:00Z", "Valid": false}),
            json!({"Float64": 0, "Valid": false}),
        )
    };
    json!({
        "id": id,
        "service_name": service,
        "start_time": "2024-01-15T10:30:00Z",
        "end_time": end_time,
        "duration_ms": duration
    })
}

/// Waits until `condition` holds, polling every 10ms, for at most `limit`.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
