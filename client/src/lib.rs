//! Lookout Client Library
//!
//! Data layer of the Lookout observability dashboard: a typed client for the
//! monitoring REST API, a polling query cache that deduplicates concurrent
//! requests, and the dashboard views composed from both.
//!
//! # Modules
//!
//! - [`api`] - HTTP client for logs, metrics, traces, and spans
//! - [`cache`] - Keyed query cache with polling and request deduplication
//! - [`dashboard`] - Aggregate fetches and polling dashboard views
//! - [`config`] - Connection and polling configuration
//! - [`error`] - Client error taxonomy
//!
//! # Example
//!
//! ```no_run
//! use client::{fetch_dashboard_stats, ClientConfig, MonitoringClient};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = MonitoringClient::new(&ClientConfig::from_env()?)?;
//! let stats = fetch_dashboard_stats(&client).await?;
//! println!("{} errors across {} logs", stats.error_count, stats.total_logs);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;

pub use api::MonitoringClient;
pub use cache::{QueryKey, QueryOptions, QueryState, QueryStatus, ResourceCache, Subscription};
pub use config::{ClientConfig, PollingConfig};
pub use dashboard::{fetch_dashboard_stats, fetch_system_health, DashboardQueries, Query};
pub use error::{ClientError, ErrorKind, SourceFailure};
