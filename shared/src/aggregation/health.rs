//! Per-service health classification.
//!
//! Services are classified from the share of 5xx responses among their most
//! recent requests. This is a pure function of the metric slice it is given.

use serde::{Deserialize, Serialize};

use crate::models::MetricRecord;

/// Default number of most recent metrics considered overall.
pub const DEFAULT_RECENT_WINDOW: usize = 100;

/// Default number of most recent requests sampled per service.
pub const DEFAULT_SAMPLES_PER_SERVICE: usize = 10;

/// Error rate above which a service is classified as [`HealthStatus::Error`].
///
/// A rate of exactly one failure in ten is still a warning.
pub const ERROR_THRESHOLD: f64 = 0.1;

/// Operating status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No server errors in the sample.
    Healthy,
    /// Some server errors, up to the error threshold.
    Warning,
    /// Server errors above the error threshold.
    Error,
}

impl HealthStatus {
    /// Classifies a fractional error rate in `[0, 1]`.
    #[must_use]
    pub fn from_error_rate(rate: f64) -> Self {
        if rate <= 0.0 {
            Self::Healthy
        } else if rate <= ERROR_THRESHOLD {
            Self::Warning
        } else {
            Self::Error
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Health classification of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealthStatus {
    /// Service name.
    pub name: String,
    /// Classification.
    pub status: HealthStatus,
    /// Share of 5xx responses in the sample, as a rounded percentage.
    pub error_rate: u8,
    /// Number of requests in the sample.
    pub request_count: usize,
}

/// API health together with per-service classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemHealth {
    /// Raw body returned by the health endpoint (e.g. "OK").
    pub health: String,
    /// Classified services, in first-seen order.
    pub services: Vec<ServiceHealthStatus>,
}

/// Classifies services from recent endpoint metrics.
///
/// Metrics are expected newest-first, as the API returns them.
///
/// # Example
///
/// ```
/// use shared::aggregation::{HealthAggregator, HealthStatus};
/// # use shared::models::MetricRecord;
/// # fn metric(status: u16) -> MetricRecord {
/// #     serde_json::from_value(serde_json::json!({
/// #         "service_name": "api", "path": "/", "method": "GET",
/// #         "status_code": status, "duration_ms": 1.0,
/// #         "timestamp": "2024-01-15T10:30:00Z"
/// #     })).unwrap()
/// # }
///
/// let metrics = vec![metric(200), metric(500), metric(200)];
/// let services = HealthAggregator::default().classify(&metrics);
///
/// assert_eq!(services[0].status, HealthStatus::Error);
/// assert_eq!(services[0].error_rate, 33);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthAggregator {
    /// Number of most recent metrics considered.
    pub recent_window: usize,
    /// Number of most recent requests sampled per service.
    pub samples_per_service: usize,
}

impl Default for HealthAggregator {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            samples_per_service: DEFAULT_SAMPLES_PER_SERVICE,
        }
    }
}

impl HealthAggregator {
    /// Classifies every service that appears in the recent window.
    ///
    /// Services without metrics in the window are not reported.
    #[must_use]
    pub fn classify(&self, metrics: &[MetricRecord]) -> Vec<ServiceHealthStatus> {
        let mut groups: Vec<(&str, Vec<&MetricRecord>)> = Vec::new();

        for metric in metrics.iter().take(self.recent_window) {
            match groups
                .iter_mut()
                .find(|(name, _)| *name == metric.service_name)
            {
                Some((_, records)) => records.push(metric),
                None => groups.push((metric.service_name.as_str(), vec![metric])),
            }
        }

        groups
            .into_iter()
            .map(|(name, records)| {
                let sample = &records[..records.len().min(self.samples_per_service)];
                let failures = sample.iter().filter(|m| m.is_server_error()).count();
                let rate = error_rate(failures, sample.len());

                ServiceHealthStatus {
                    name: name.to_string(),
                    status: HealthStatus::from_error_rate(rate),
                    error_rate: as_percentage(rate),
                    request_count: sample.len(),
                }
            })
            .collect()
    }
}

// Sample sizes are tiny, precision loss is irrelevant.
#[allow(clippy::cast_precision_loss)]
fn error_rate(failures: usize, sample: usize) -> f64 {
    if sample == 0 {
        0.0
    } else {
        failures as f64 / sample as f64
    }
}

// The rate is within [0, 1] so the rounded percentage fits in a u8.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_percentage(rate: f64) -> u8 {
    (rate * 100.0).round().clamp(0.0, 100.0) as u8
}
