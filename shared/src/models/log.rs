//! Log data model.
//!
//! Defines the `LogEntry` record returned by the monitoring API and the
//! `NewLog` payload used to create one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use super::nullable::{self, Nullable};

/// Log severity level.
///
/// Levels are ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Critical/fatal conditions.
    Fatal,
}

impl LogLevel {
    /// Returns the wire representation of the level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Parses a level, falling back to [`LogLevel::Info`] for anything unrecognized.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(level = s, "Unrecognized log level, treating as INFO");
            Self::Info
        })
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown log level.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown log level: '{0}'")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Info, Self::parse_lenient))
    }
}

/// A log entry as stored by the monitoring API.
///
/// # Example
///
/// ```
/// use shared::models::{LogEntry, LogLevel};
///
/// let log: LogEntry = serde_json::from_str(r#"{
///     "id": 7,
///     "service_name": "auth-service",
///     "log_level": "ERROR",
///     "message": "token expired",
///     "timestamp": "2024-01-15T10:30:00Z",
///     "trace_id": {"String": "trace-abc", "Valid": true}
/// }"#).unwrap();
///
/// assert_eq!(log.log_level, LogLevel::Error);
/// assert_eq!(log.trace_id.get().map(String::as_str), Some("trace-abc"));
/// assert!(!log.span_id.is_present());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Server-assigned identifier.
    pub id: i64,

    /// Name of the service that generated the log.
    pub service_name: String,

    /// Severity level of the log.
    #[serde(default)]
    pub log_level: LogLevel,

    /// The log message content.
    pub message: String,

    /// Timestamp when the log event occurred.
    pub timestamp: DateTime<Utc>,

    /// Trace ID for distributed tracing correlation.
    #[serde(default, deserialize_with = "nullable::or_absent")]
    pub trace_id: Nullable<String>,

    /// Span ID for distributed tracing correlation.
    #[serde(default, deserialize_with = "nullable::or_absent")]
    pub span_id: Nullable<String>,

    /// Additional structured metadata.
    #[serde(default, deserialize_with = "nullable::null_as_default")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LogEntry {
    /// Returns true if the entry is at ERROR level exactly.
    ///
    /// FATAL entries are not counted here; the dashboard error count tracks
    /// ERROR-level entries only.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.log_level == LogLevel::Error
    }
}

/// Payload for creating a log entry.
///
/// Identifiers and timestamps are assigned by the server.
///
/// # Example
///
/// ```
/// use shared::models::{LogLevel, NewLog};
/// use validator::Validate;
///
/// let log = NewLog::new(LogLevel::Warn, "disk almost full", "storage")
///     .with_metadata("disk_pct", 91)
///     .with_trace_id("trace-1");
///
/// assert!(log.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewLog {
    /// Name of the service that generated the log.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Severity level of the log.
    pub log_level: LogLevel,

    /// The log message content.
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,

    /// Trace ID for correlation.
    #[serde(skip_serializing_if = "is_absent")]
    pub trace_id: Nullable<String>,

    /// Span ID for correlation.
    #[serde(skip_serializing_if = "is_absent")]
    pub span_id: Nullable<String>,

    /// Additional structured metadata.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn is_absent(value: &Nullable<String>) -> bool {
    !value.is_present()
}

impl NewLog {
    /// Creates a new log payload.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
            log_level: level,
            message: message.into(),
            trace_id: Nullable::absent(),
            span_id: Nullable::absent(),
            metadata: HashMap::new(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.metadata.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }

    /// Sets the trace ID for distributed tracing correlation.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Nullable::present(trace_id.into());
        self
    }

    /// Sets the span ID for distributed tracing correlation.
    #[must_use]
    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Nullable::present(span_id.into());
        self
    }
}
