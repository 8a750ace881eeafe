//! Data models for the monitoring API.
//!
//! This module contains the records returned by the API (logs, endpoint
//! metrics, traces, spans) and the payloads used to create them.

pub mod log;
pub mod metric;
pub mod nullable;
pub mod trace;

pub use log::{LogEntry, LogLevel, NewLog, UnknownLogLevel};
pub use metric::{MetricRecord, MetricSource, NewMetric, VALID_METHODS};
pub use nullable::{Nullable, NullableValue};
pub use trace::{NewSpan, NewTrace, SpanRecord, TraceRecord};
