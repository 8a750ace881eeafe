//! List filters for the log, metric, and trace endpoints.
//!
//! Each filter turns into an ordered list of query parameters. Unset options,
//! and options set to an empty string, are left out entirely rather than being
//! sent as empty values.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::LogLevel;

/// Types that can be rendered as URL query parameters.
pub trait QueryParams {
    /// Returns the non-empty parameters as `(name, value)` pairs.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

/// Collects query pairs, skipping anything unset or blank.
#[derive(Debug, Default)]
struct PairWriter {
    pairs: Vec<(&'static str, String)>,
}

impl PairWriter {
    fn text(&mut self, name: &'static str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.pairs.push((name, value.to_string()));
        }
        self
    }

    fn display(&mut self, name: &'static str, value: Option<impl ToString>) -> &mut Self {
        if let Some(value) = value {
            self.pairs.push((name, value.to_string()));
        }
        self
    }

    fn time(&mut self, name: &'static str, value: Option<DateTime<Utc>>) -> &mut Self {
        if let Some(value) = value {
            self.pairs
                .push((name, value.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
        }
        self
    }

    fn finish(&mut self) -> Vec<(&'static str, String)> {
        std::mem::take(&mut self.pairs)
    }
}

/// Filter options for `GET /logs`.
///
/// # Example
///
/// ```
/// use shared::filter::{LogFilter, QueryParams};
/// use shared::models::LogLevel;
///
/// let filter = LogFilter::new()
///     .with_service("auth")
///     .with_level(LogLevel::Error)
///     .with_limit(50);
///
/// assert_eq!(
///     filter.query_pairs(),
///     vec![
///         ("service", "auth".to_string()),
///         ("level", "ERROR".to_string()),
///         ("limit", "50".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Filter by service name (exact match).
    pub service: Option<String>,
    /// Filter by log level.
    pub level: Option<LogLevel>,
    /// Free-text filter on the message.
    pub message: Option<String>,
    /// Only logs at or after this time.
    pub start_time: Option<DateTime<Utc>>,
    /// Only logs before this time.
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of logs to return.
    pub limit: Option<usize>,
    /// Number of logs to skip (for pagination).
    pub offset: Option<usize>,
}

impl LogFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name filter.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the log level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the free-text message filter.
    #[must_use]
    pub fn with_message(mut self, pattern: impl Into<String>) -> Self {
        self.message = Some(pattern.into());
        self
    }

    /// Sets the time range.
    #[must_use]
    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset for pagination.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl QueryParams for LogFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        PairWriter::default()
            .text("service", self.service.as_deref())
            .display("level", self.level)
            .text("message", self.message.as_deref())
            .time("start_time", self.start_time)
            .time("end_time", self.end_time)
            .display("limit", self.limit)
            .display("offset", self.offset)
            .finish()
    }
}

/// Filter options for `GET /metrics`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricFilter {
    /// Filter by service name (exact match).
    pub service: Option<String>,
    /// Filter by request path.
    pub path: Option<String>,
    /// Filter by HTTP method.
    pub method: Option<String>,
    /// Lowest status code to include.
    pub min_status: Option<u16>,
    /// Highest status code to include.
    pub max_status: Option<u16>,
    /// Only metrics recorded at or after this time.
    pub start_time: Option<DateTime<Utc>>,
    /// Only metrics recorded before this time.
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of metrics to return.
    pub limit: Option<usize>,
    /// Number of metrics to skip (for pagination).
    pub offset: Option<usize>,
}

impl MetricFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name filter.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the request path filter.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the HTTP method filter.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Restricts results to status codes in `min..=max`.
    #[must_use]
    pub fn with_status_range(mut self, min: u16, max: u16) -> Self {
        self.min_status = Some(min);
        self.max_status = Some(max);
        self
    }

    /// Sets the time range.
    #[must_use]
    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset for pagination.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl QueryParams for MetricFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        PairWriter::default()
            .text("service", self.service.as_deref())
            .text("path", self.path.as_deref())
            .text("method", self.method.as_deref())
            .display("min_status", self.min_status)
            .display("max_status", self.max_status)
            .time("start_time", self.start_time)
            .time("end_time", self.end_time)
            .display("limit", self.limit)
            .display("offset", self.offset)
            .finish()
    }
}

/// Filter options for `GET /traces`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceFilter {
    /// Filter by service name (exact match).
    pub service: Option<String>,
    /// Only traces started at or after this time.
    pub start_time: Option<DateTime<Utc>>,
    /// Only traces started before this time.
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of traces to return.
    pub limit: Option<usize>,
    /// Number of traces to skip (for pagination).
    pub offset: Option<usize>,
}

impl TraceFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name filter.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the time range.
    #[must_use]
    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset for pagination.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl QueryParams for TraceFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        PairWriter::default()
            .text("service", self.service.as_deref())
            .time("start_time", self.start_time)
            .time("end_time", self.end_time)
            .display("limit", self.limit)
            .display("offset", self.offset)
            .finish()
    }
}
