//! Typed client for the monitoring REST API.
//!
//! The client is transport only: it builds requests, attaches the credential,
//! decodes JSON, and maps failures into [`ClientError`]. It never caches and
//! never retries.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::filter::{LogFilter, MetricFilter, QueryParams, TraceFilter};
use shared::models::{
    LogEntry, MetricRecord, NewLog, NewMetric, NewSpan, NewTrace, SpanRecord, TraceRecord,
};
use validator::Validate;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Header carrying the static API credential.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Client for the monitoring API.
///
/// Construct one per application and share it (e.g. behind an `Arc`); the
/// underlying connection pool is reused across calls.
///
/// # Example
///
/// ```no_run
/// use client::{ClientConfig, MonitoringClient};
/// use shared::filter::LogFilter;
///
/// # async fn run() -> Result<(), client::ClientError> {
/// let client = MonitoringClient::new(&ClientConfig::new("http://localhost:8080"))?;
/// let logs = client.get_logs(&LogFilter::new().with_limit(5)).await?;
/// println!("{} recent logs", logs.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MonitoringClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl MonitoringClient {
    /// Creates a new client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The base URL is not an absolute `http`/`https` URL
    /// - The HTTP client cannot be initialized
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("lookout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Returns the normalized base URL (without trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks API liveness. This call is not authenticated.
    ///
    /// Returns the response body unchanged, trailing newline included.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the server cannot be reached and
    /// [`ClientError::Http`] on a non-success status.
    pub async fn get_health(&self) -> Result<String, ClientError> {
        tracing::debug!(path = "/health", "Checking API health");
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(check_status(response).await?.text().await?)
    }

    /// Lists logs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ClientError> {
        self.list("/logs", filter).await
    }

    /// Lists endpoint metrics, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn get_metrics(
        &self,
        filter: &MetricFilter,
    ) -> Result<Vec<MetricRecord>, ClientError> {
        self.list("/metrics", filter).await
    }

    /// Lists traces, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn get_traces(&self, filter: &TraceFilter) -> Result<Vec<TraceRecord>, ClientError> {
        self.list("/traces", filter).await
    }

    /// Lists the spans of one trace.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn get_spans(&self, trace_id: &str) -> Result<Vec<SpanRecord>, ClientError> {
        let path = format!("/traces/{}/spans", urlencoding::encode(trace_id));
        let spans: Option<Vec<SpanRecord>> = self.send(self.http.get(self.url(&path))).await?;
        Ok(spans.unwrap_or_default())
    }

    /// Creates a log entry.
    ///
    /// Writes are not idempotent: retrying a failed call may store the entry twice.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRecord`] without sending anything if the
    /// payload fails validation, otherwise any transport or HTTP failure.
    pub async fn create_log(&self, log: &NewLog) -> Result<LogEntry, ClientError> {
        self.create("/logs", log).await
    }

    /// Reports an endpoint metric.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRecord`] without sending anything if the
    /// payload fails validation, otherwise any transport or HTTP failure.
    pub async fn create_metric(&self, metric: &NewMetric) -> Result<MetricRecord, ClientError> {
        self.create("/metrics", metric).await
    }

    /// Starts a trace.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRecord`] without sending anything if the
    /// payload fails validation, otherwise any transport or HTTP failure.
    pub async fn create_trace(&self, trace: &NewTrace) -> Result<TraceRecord, ClientError> {
        self.create("/traces", trace).await
    }

    /// Ends a trace, letting the server stamp its end time and duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn end_trace(&self, trace_id: &str) -> Result<TraceRecord, ClientError> {
        let path = format!("/traces/{}/end", urlencoding::encode(trace_id));
        self.send(self.http.post(self.url(&path))).await
    }

    /// Starts a span.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRecord`] without sending anything if the
    /// payload fails validation, otherwise any transport or HTTP failure.
    pub async fn create_span(&self, span: &NewSpan) -> Result<SpanRecord, ClientError> {
        self.create("/spans", span).await
    }

    /// Ends a span.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it.
    pub async fn end_span(&self, span_id: &str) -> Result<SpanRecord, ClientError> {
        let path = format!("/spans/{}/end", urlencoding::encode(span_id));
        self.send(self.http.post(self.url(&path))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn list<T, Q>(&self, path: &str, filter: &Q) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
        Q: QueryParams,
    {
        let pairs = filter.query_pairs();
        let mut request = self.http.get(self.url(path));
        if !pairs.is_empty() {
            request = request.query(&pairs);
        }
        // The server encodes an empty result set as `null`.
        let records: Option<Vec<T>> = self.send(request).await?;
        Ok(records.unwrap_or_default())
    }

    async fn create<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + Validate,
        T: DeserializeOwned,
    {
        body.validate()?;
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        };
        let request = request.build()?;
        tracing::debug!(method = %request.method(), url = %request.url(), "Sending request");

        let response = self.http.execute(request).await?;
        Ok(check_status(response).await?.json::<T>().await?)
    }
}

/// Validates the base URL and strips any trailing slash.
fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = reqwest::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("must not contain a query or fragment".to_string()));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Converts a non-success response into [`ClientError::Http`].
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match body.trim() {
        "" => status.canonical_reason().unwrap_or("Unknown status").to_string(),
        text => text.to_string(),
    };
    tracing::warn!(status = status.as_u16(), %message, "Monitoring API returned an error");

    Err(ClientError::Http {
        status: status.as_u16(),
        message,
    })
}
