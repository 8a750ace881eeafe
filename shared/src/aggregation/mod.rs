//! Derived dashboard signals.
//!
//! - [`health`] - per-service health classification from endpoint metrics
//! - [`stats`] - flat summary over logs, metrics, and traces
//!
//! Both are pure functions over already-fetched records.

pub mod health;
pub mod stats;

pub use health::{HealthAggregator, HealthStatus, ServiceHealthStatus, SystemHealth};
pub use stats::DashboardStats;
