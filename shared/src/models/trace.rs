//! Trace and span data models.
//!
//! Traces are long-lived: they are created when a request enters the system and
//! ended explicitly later. Until then the trace's end time is absent and the
//! trace counts as active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::nullable::{self, Nullable};

/// A distributed trace as reported by the monitoring API.
///
/// # Example
///
/// ```
/// use shared::models::TraceRecord;
///
/// let trace: TraceRecord = serde_json::from_str(r#"{
///     "id": "trace-1",
///     "service_name": "gateway",
///     "start_time": "2024-01-15T10:30:00Z",
///     "end_time": {"Time": "0001-01-01T00:00:00Z", "Valid": false},
///     "duration_ms": {"Float64": 0, "Valid": false}
/// }"#).unwrap();
///
/// assert!(trace.is_active());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Trace identifier.
    pub id: String,

    /// Service that started the trace.
    pub service_name: String,

    /// Time the trace started.
    pub start_time: DateTime<Utc>,

    /// Time the trace ended, absent while still running.
    #[serde(default, deserialize_with = "nullable::or_absent")]
    pub end_time: Nullable<DateTime<Utc>>,

    /// Total duration in milliseconds, absent while still running.
    #[serde(default, deserialize_with = "nullable::or_absent")]
    pub duration_ms: Nullable<f64>,
}

impl TraceRecord {
    /// Returns true if the trace has not been ended yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.end_time.is_present()
    }
}

/// A unit of work within a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Span identifier.
    pub id: String,

    /// Identifier of the owning trace.
    pub trace_id: String,

    /// Parent span identifier (None for root spans).
    #[serde(default, deserialize_with = "nullable::non_empty")]
    pub parent_id: Option<String>,

    /// Service that executed the span.
    pub service: String,

    /// Operation name.
    pub operation: String,

    /// Time the span started.
    pub start_time: DateTime<Utc>,

    /// Time the span ended, if it has.
    #[serde(default, deserialize_with = "nullable::zero_time_as_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Span duration in milliseconds, if ended.
    #[serde(default)]
    pub duration_ms: Option<f64>,
}

impl SpanRecord {
    /// Returns true if this is a root span (no parent).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns true if the span has been ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Payload for starting a trace.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewTrace {
    /// Client-chosen trace identifier; the server generates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Service that starts the trace.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,
}

impl NewTrace {
    /// Creates a trace payload with a server-assigned id.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            id: None,
            service_name: service.into(),
        }
    }

    /// Sets a client-chosen trace identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Payload for starting a span.
///
/// # Example
///
/// ```
/// use shared::models::NewSpan;
/// use validator::Validate;
///
/// let span = NewSpan::new("trace-1", "db", "SELECT users").with_parent("span-0");
/// assert!(span.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewSpan {
    /// Client-chosen span identifier; the server generates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Owning trace.
    #[validate(length(min = 1, message = "Trace ID cannot be empty"))]
    pub trace_id: String,

    /// Parent span, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Service executing the span.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// Operation name.
    #[validate(length(min = 1, message = "Operation cannot be empty"))]
    pub operation: String,
}

impl NewSpan {
    /// Creates a root span payload.
    #[must_use]
    pub fn new(
        trace_id: impl Into<String>,
        service: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            trace_id: trace_id.into(),
            parent_id: None,
            service: service.into(),
            operation: operation.into(),
        }
    }

    /// Sets the parent span.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets a client-chosen span identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
