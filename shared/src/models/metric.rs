//! Endpoint metric data model.
//!
//! Defines the `MetricRecord` structure describing a single observed HTTP
//! request, and the `NewMetric` payload used to report one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::nullable;

/// HTTP methods accepted by the monitoring API.
pub const VALID_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"];

/// Describes the instrumented runtime that produced a metric.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricSource {
    /// Implementation language (e.g. "go").
    #[serde(default)]
    pub language: String,
    /// Web framework (e.g. "gin").
    #[serde(default)]
    pub framework: String,
    /// Framework or runtime version.
    #[serde(default)]
    pub version: String,
}

impl MetricSource {
    /// Creates a new source descriptor.
    #[must_use]
    pub fn new(
        language: impl Into<String>,
        framework: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            framework: framework.into(),
            version: version.into(),
        }
    }
}

/// A single request measurement reported by an instrumented service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Server-assigned identifier, when the server exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Name of the service that handled the request.
    pub service_name: String,

    /// Request path.
    pub path: String,

    /// HTTP method.
    pub method: String,

    /// HTTP status code of the response.
    pub status_code: u16,

    /// Request duration in milliseconds.
    pub duration_ms: f64,

    /// Runtime that produced the measurement.
    #[serde(default)]
    pub source: MetricSource,

    /// Deployment environment label.
    #[serde(default, deserialize_with = "nullable::non_empty")]
    pub environment: Option<String>,

    /// Time the request was observed.
    pub timestamp: DateTime<Utc>,

    /// Correlating request identifier.
    #[serde(default, deserialize_with = "nullable::non_empty")]
    pub request_id: Option<String>,
}

impl MetricRecord {
    /// Returns true if the response was a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }
}

/// Payload for reporting an endpoint metric.
///
/// # Example
///
/// ```
/// use shared::models::{MetricSource, NewMetric};
/// use validator::Validate;
///
/// let metric = NewMetric::new("checkout", "/api/cart", "POST", 201, 42.5)
///     .with_source(MetricSource::new("rust", "axum", "0.8"))
///     .with_environment("staging");
///
/// assert!(metric.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewMetric {
    /// Name of the service that handled the request.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Request path.
    #[validate(length(min = 1, message = "Path cannot be empty"))]
    pub path: String,

    /// HTTP method.
    #[validate(custom(function = "validate_method"))]
    pub method: String,

    /// HTTP status code of the response.
    #[validate(range(min = 100, max = 599, message = "Status code must be in 100..=599"))]
    pub status_code: u16,

    /// Request duration in milliseconds.
    #[validate(range(min = 0.0, message = "Duration cannot be negative"))]
    pub duration_ms: f64,

    /// Runtime that produced the measurement.
    pub source: MetricSource,

    /// Deployment environment label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Correlating request identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

fn validate_method(method: &str) -> Result<(), ValidationError> {
    if VALID_METHODS.contains(&method) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_method");
        err.message = Some(format!("Invalid HTTP method: '{method}'").into());
        Err(err)
    }
}

impl NewMetric {
    /// Creates a new metric payload with an empty source descriptor.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        path: impl Into<String>,
        method: impl Into<String>,
        status_code: u16,
        duration_ms: f64,
    ) -> Self {
        Self {
            service_name: service.into(),
            path: path.into(),
            method: method.into(),
            status_code,
            duration_ms,
            source: MetricSource::default(),
            environment: None,
            request_id: None,
        }
    }

    /// Sets the source descriptor.
    #[must_use]
    pub fn with_source(mut self, source: MetricSource) -> Self {
        self.source = source;
        self
    }

    /// Sets the environment label.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
