//! Dashboard summary statistics.

use serde::{Deserialize, Serialize};

use crate::models::{LogEntry, MetricRecord, TraceRecord};

/// Maximum number of service names reported in [`DashboardStats::top_services`].
pub const TOP_SERVICES: usize = 5;

/// Flat summary over recently fetched logs, metrics, and traces.
///
/// `error_count` counts ERROR-level log entries only. It is a different signal
/// from the 5xx-based error rate used for service health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DashboardStats {
    /// Number of logs in the sample.
    pub total_logs: usize,
    /// Number of ERROR-level logs (FATAL excluded).
    pub error_count: usize,
    /// Mean request duration in milliseconds, rounded to 2 decimals.
    pub avg_response_time: f64,
    /// Number of traces that have not ended.
    pub active_traces: usize,
    /// Up to five distinct service names, in first-seen order.
    pub top_services: Vec<String>,
}

impl DashboardStats {
    /// Folds the three collections into a summary.
    ///
    /// Empty inputs produce zero values.
    ///
    /// # Example
    ///
    /// ```
    /// use shared::aggregation::DashboardStats;
    ///
    /// let stats = DashboardStats::from_records(&[], &[], &[]);
    /// assert_eq!(stats, DashboardStats::default());
    /// ```
    #[must_use]
    pub fn from_records(
        logs: &[LogEntry],
        metrics: &[MetricRecord],
        traces: &[TraceRecord],
    ) -> Self {
        let services = logs
            .iter()
            .map(|l| l.service_name.as_str())
            .chain(metrics.iter().map(|m| m.service_name.as_str()))
            .chain(traces.iter().map(|t| t.service_name.as_str()));

        Self {
            total_logs: logs.len(),
            error_count: logs.iter().filter(|l| l.is_error()).count(),
            avg_response_time: average_duration(metrics),
            active_traces: traces.iter().filter(|t| t.is_active()).count(),
            top_services: first_distinct(services, TOP_SERVICES),
        }
    }
}

// Fetch limits keep the count far below f64's exact integer range.
#[allow(clippy::cast_precision_loss)]
fn average_duration(metrics: &[MetricRecord]) -> f64 {
    if metrics.is_empty() {
        return 0.0;
    }
    let total: f64 = metrics.iter().map(|m| m.duration_ms).sum();
    round2(total / metrics.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn first_distinct<'a>(names: impl Iterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(limit);
    for name in names {
        if seen.len() == limit {
            break;
        }
        if !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}
