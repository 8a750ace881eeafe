//! Client configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::time::Duration;

/// Default monitoring API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Monitoring API connection settings.
///
/// Configuration values can be set via environment variables:
/// - `LOOKOUT_API_URL`: Base URL of the monitoring API (default: "http://localhost:8080")
/// - `LOOKOUT_API_KEY`: Static credential sent as `X-API-Key` (default: none)
/// - `LOOKOUT_TIMEOUT_SECS`: Per-request timeout in seconds (default: 10)
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Static credential attached to authenticated requests.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration for the given base URL with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the API credential.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `LOOKOUT_TIMEOUT_SECS` is set but is not a valid number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("LOOKOUT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_key = lookup("LOOKOUT_API_KEY").filter(|k| !k.is_empty());
        let timeout = Duration::from_secs(
            parse_var(&lookup, "LOOKOUT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        Ok(Self {
            base_url,
            api_key,
            timeout,
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Refresh cadence for the dashboard queries.
///
/// Configuration values can be set via environment variables:
/// - `LOOKOUT_STATS_INTERVAL_SECS` (default: 30)
/// - `LOOKOUT_LOGS_INTERVAL_SECS` (default: 15)
/// - `LOOKOUT_HEALTH_INTERVAL_SECS` (default: 30)
/// - `LOOKOUT_RELEASE_GRACE_MS`: how long an unused cache entry survives (default: 5000)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Refresh interval for the dashboard summary.
    pub stats_interval: Duration,
    /// Refresh interval for the recent logs list.
    pub logs_interval: Duration,
    /// Refresh interval for the system health view.
    pub health_interval: Duration,
    /// Grace period before an entry without subscribers is released.
    pub release_grace: Duration,
}

impl PollingConfig {
    /// Creates a new polling configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the variables is set but is not a valid number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| -> Result<Duration> {
            Ok(parse_var(&lookup, name)?.map_or(default, Duration::from_secs))
        };

        Ok(Self {
            stats_interval: secs("LOOKOUT_STATS_INTERVAL_SECS", defaults.stats_interval)?,
            logs_interval: secs("LOOKOUT_LOGS_INTERVAL_SECS", defaults.logs_interval)?,
            health_interval: secs("LOOKOUT_HEALTH_INTERVAL_SECS", defaults.health_interval)?,
            release_grace: parse_var(&lookup, "LOOKOUT_RELEASE_GRACE_MS")?
                .map_or(defaults.release_grace, Duration::from_millis),
        })
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stats_interval: Duration::from_secs(30),
            logs_interval: Duration::from_secs(15),
            health_interval: Duration::from_secs(30),
            release_grace: Duration::from_secs(5),
        }
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    lookup(name)
        .map(|v| v.trim().parse::<u64>())
        .transpose()
        .with_context(|| format!("{name} must be a non-negative integer"))
}
