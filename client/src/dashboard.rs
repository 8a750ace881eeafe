//! Dashboard queries.
//!
//! One-shot aggregate fetches built on [`MonitoringClient`], and
//! [`DashboardQueries`], which exposes them as polling cache subscriptions.

use std::sync::Arc;

use shared::aggregation::{DashboardStats, HealthAggregator, SystemHealth};
use shared::filter::{LogFilter, MetricFilter, QueryParams, TraceFilter};
use shared::models::LogEntry;

use crate::api::MonitoringClient;
use crate::cache::{QueryKey, QueryOptions, ResourceCache, Subscription};
use crate::config::PollingConfig;
use crate::error::{ClientError, SourceFailure};

/// Number of logs sampled for the dashboard summary.
pub const STATS_LOG_LIMIT: usize = 1000;

/// Number of metrics sampled for the dashboard summary.
pub const STATS_METRIC_LIMIT: usize = 1000;

/// Number of traces sampled for the dashboard summary.
pub const STATS_TRACE_LIMIT: usize = 100;

/// Number of metrics fetched for service health classification.
pub const HEALTH_METRIC_LIMIT: usize = 100;

/// Cache key of the dashboard summary.
pub const STATS_KEY: &str = "dashboard-stats";

/// Cache key resource of the recent logs list.
pub const RECENT_LOGS_KEY: &str = "recent-logs";

/// Cache key of the system health view.
pub const SYSTEM_HEALTH_KEY: &str = "system-health";

/// A dashboard subscription.
pub type Query<T> = Subscription<T, ClientError>;

/// Fetches logs, metrics, and traces concurrently and summarizes them.
///
/// The three requests run in parallel and none cancels another.
///
/// # Errors
///
/// Returns [`ClientError::Aggregation`] naming every source that failed if
/// any of the three requests fails.
pub async fn fetch_dashboard_stats(
    client: &MonitoringClient,
) -> Result<DashboardStats, ClientError> {
    let log_filter = LogFilter::new().with_limit(STATS_LOG_LIMIT);
    let metric_filter = MetricFilter::new().with_limit(STATS_METRIC_LIMIT);
    let trace_filter = TraceFilter::new().with_limit(STATS_TRACE_LIMIT);
    let (logs, metrics, traces) = tokio::join!(
        client.get_logs(&log_filter),
        client.get_metrics(&metric_filter),
        client.get_traces(&trace_filter),
    );

    let mut failures = Vec::new();
    let logs = settle("logs", logs, &mut failures);
    let metrics = settle("metrics", metrics, &mut failures);
    let traces = settle("traces", traces, &mut failures);

    if !failures.is_empty() {
        return Err(ClientError::Aggregation { failures });
    }

    let stats = DashboardStats::from_records(&logs, &metrics, &traces);
    tracing::debug!(
        total_logs = stats.total_logs,
        error_count = stats.error_count,
        active_traces = stats.active_traces,
        "Computed dashboard stats"
    );
    Ok(stats)
}

/// Fetches API health and recent metrics concurrently and classifies services.
///
/// # Errors
///
/// Returns [`ClientError::Aggregation`] if either request fails.
pub async fn fetch_system_health(client: &MonitoringClient) -> Result<SystemHealth, ClientError> {
    let metric_filter = MetricFilter::new().with_limit(HEALTH_METRIC_LIMIT);
    let (health, metrics) = tokio::join!(client.get_health(), client.get_metrics(&metric_filter));

    let mut failures = Vec::new();
    let health = settle("health", health, &mut failures);
    let metrics = settle("metrics", metrics, &mut failures);

    if !failures.is_empty() {
        return Err(ClientError::Aggregation { failures });
    }

    Ok(SystemHealth {
        health,
        services: HealthAggregator::default().classify(&metrics),
    })
}

fn settle<T: Default>(
    resource: &'static str,
    result: Result<T, ClientError>,
    failures: &mut Vec<SourceFailure>,
) -> T {
    result.unwrap_or_else(|error| {
        failures.push(SourceFailure { resource, error });
        T::default()
    })
}

/// Returns the cache key of the recent logs list for `filter`.
#[must_use]
pub fn recent_logs_key(filter: &LogFilter) -> QueryKey {
    QueryKey::with_params(RECENT_LOGS_KEY, filter.query_pairs())
}

/// Polling dashboard views backed by shared caches.
///
/// Every view shares one entry per key, so any number of consumers of, say,
/// `stats()` cause a single request per refresh interval.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use client::{ClientConfig, DashboardQueries, MonitoringClient, PollingConfig};
///
/// # async fn run() -> anyhow::Result<()> {
/// let client = Arc::new(MonitoringClient::new(&ClientConfig::from_env()?)?);
/// let dashboard = DashboardQueries::new(client, PollingConfig::default());
///
/// let mut stats = dashboard.stats();
/// while let Some(state) = stats.changed().await {
///     if let Some(stats) = state.data {
///         println!("{} logs, {} errors", stats.total_logs, stats.error_count);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DashboardQueries {
    client: Arc<MonitoringClient>,
    polling: PollingConfig,
    stats: ResourceCache<DashboardStats, ClientError>,
    logs: ResourceCache<Vec<LogEntry>, ClientError>,
    health: ResourceCache<SystemHealth, ClientError>,
}

impl DashboardQueries {
    /// Creates the dashboard views over a shared client.
    #[must_use]
    pub fn new(client: Arc<MonitoringClient>, polling: PollingConfig) -> Self {
        Self {
            client,
            polling,
            stats: ResourceCache::with_release_grace(polling.release_grace),
            logs: ResourceCache::with_release_grace(polling.release_grace),
            health: ResourceCache::with_release_grace(polling.release_grace),
        }
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &Arc<MonitoringClient> {
        &self.client
    }

    /// Returns the polling configuration.
    #[must_use]
    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    /// Subscribes to the dashboard summary.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn stats(&self) -> Query<DashboardStats> {
        let client = Arc::clone(&self.client);
        self.stats.subscribe(
            QueryKey::new(STATS_KEY),
            QueryOptions::polling(self.polling.stats_interval),
            move || {
                let client = Arc::clone(&client);
                async move { fetch_dashboard_stats(&client).await }
            },
        )
    }

    /// Subscribes to the `limit` most recent logs.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn recent_logs(&self, limit: usize) -> Query<Vec<LogEntry>> {
        let filter = LogFilter::new().with_limit(limit);
        let key = recent_logs_key(&filter);
        let client = Arc::clone(&self.client);
        self.logs.subscribe(
            key,
            QueryOptions::polling(self.polling.logs_interval),
            move || {
                let client = Arc::clone(&client);
                let filter = filter.clone();
                async move { client.get_logs(&filter).await }
            },
        )
    }

    /// Subscribes to the system health view.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn system_health(&self) -> Query<SystemHealth> {
        let client = Arc::clone(&self.client);
        self.health.subscribe(
            QueryKey::new(SYSTEM_HEALTH_KEY),
            QueryOptions::polling(self.polling.health_interval),
            move || {
                let client = Arc::clone(&client);
                async move { fetch_system_health(&client).await }
            },
        )
    }

    /// Forces a new fetch of every live view.
    pub fn invalidate_all(&self) {
        self.stats.invalidate(&QueryKey::new(STATS_KEY));
        self.health.invalidate(&QueryKey::new(SYSTEM_HEALTH_KEY));
        for key in self.logs.keys() {
            self.logs.invalidate(&key);
        }
    }
}
