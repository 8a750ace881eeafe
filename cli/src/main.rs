//! Lookout CLI
//!
//! Command-line interface for querying and watching the monitoring API.
//!
//! # Usage
//!
//! ```bash
//! lookout --help
//! lookout health
//! lookout logs --service api --level error --limit 20
//! lookout watch
//! ```

#![deny(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use client::config::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use client::{
    fetch_dashboard_stats, fetch_system_health, ClientConfig, ClientError, DashboardQueries,
    MonitoringClient, PollingConfig, QueryState,
};
use serde::Serialize;
use shared::chrono::{DateTime, Utc};
use shared::filter::{LogFilter, MetricFilter, TraceFilter};
use shared::models::LogLevel;

/// Lookout CLI - Observability dashboard command-line interface
#[derive(Parser)]
#[command(name = "lookout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Monitoring API base URL
    #[arg(short, long, env = "LOOKOUT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// API key sent as X-API-Key
    #[arg(long, env = "LOOKOUT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "LOOKOUT_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Print single-line JSON instead of pretty JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Emit diagnostics on stderr as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.timeout));
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => config.with_api_key(key),
            _ => config,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check API server health
    Health,
    /// List logs, newest first
    Logs(LogArgs),
    /// List endpoint metrics, newest first
    Metrics(MetricArgs),
    /// List traces, newest first
    Traces(TraceArgs),
    /// List the spans of a trace
    Spans {
        /// Trace identifier
        trace_id: String,
    },
    /// Show the dashboard summary
    Stats,
    /// Show API health and per-service classification
    Services,
    /// Poll the dashboard and print every update until Ctrl+C
    Watch(WatchArgs),
}

#[derive(Args)]
struct LogArgs {
    /// Only logs from this service
    #[arg(long)]
    service: Option<String>,
    /// Only logs at this level (debug, info, warn, error, fatal)
    #[arg(long)]
    level: Option<LogLevel>,
    /// Only logs whose message contains this text
    #[arg(long)]
    message: Option<String>,
    /// Only logs at or after this RFC 3339 time
    #[arg(long)]
    start_time: Option<DateTime<Utc>>,
    /// Only logs before this RFC 3339 time
    #[arg(long)]
    end_time: Option<DateTime<Utc>>,
    /// Maximum number of logs
    #[arg(long)]
    limit: Option<usize>,
    /// Number of logs to skip
    #[arg(long)]
    offset: Option<usize>,
}

impl LogArgs {
    fn filter(&self) -> LogFilter {
        LogFilter {
            service: self.service.clone(),
            level: self.level,
            message: self.message.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Args)]
struct MetricArgs {
    /// Only metrics from this service
    #[arg(long)]
    service: Option<String>,
    /// Only metrics for this endpoint path
    #[arg(long)]
    path: Option<String>,
    /// Only metrics for this HTTP method
    #[arg(long)]
    method: Option<String>,
    /// Lowest status code to include
    #[arg(long)]
    min_status: Option<u16>,
    /// Highest status code to include
    #[arg(long)]
    max_status: Option<u16>,
    /// Only metrics at or after this RFC 3339 time
    #[arg(long)]
    start_time: Option<DateTime<Utc>>,
    /// Only metrics before this RFC 3339 time
    #[arg(long)]
    end_time: Option<DateTime<Utc>>,
    /// Maximum number of metrics
    #[arg(long)]
    limit: Option<usize>,
    /// Number of metrics to skip
    #[arg(long)]
    offset: Option<usize>,
}

impl MetricArgs {
    fn filter(&self) -> MetricFilter {
        MetricFilter {
            service: self.service.clone(),
            path: self.path.clone(),
            method: self.method.as_deref().map(str::to_uppercase),
            min_status: self.min_status,
            max_status: self.max_status,
            start_time: self.start_time,
            end_time: self.end_time,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Args)]
struct TraceArgs {
    /// Only traces from this service
    #[arg(long)]
    service: Option<String>,
    /// Only traces started at or after this RFC 3339 time
    #[arg(long)]
    start_time: Option<DateTime<Utc>>,
    /// Only traces started before this RFC 3339 time
    #[arg(long)]
    end_time: Option<DateTime<Utc>>,
    /// Maximum number of traces
    #[arg(long)]
    limit: Option<usize>,
    /// Number of traces to skip
    #[arg(long)]
    offset: Option<usize>,
}

impl TraceArgs {
    fn filter(&self) -> TraceFilter {
        TraceFilter {
            service: self.service.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Args)]
struct WatchArgs {
    /// Number of recent logs to follow
    #[arg(long, default_value_t = 5)]
    logs: usize,
}

/// Writes command results to stdout as JSON.
#[derive(Debug, Clone, Copy)]
struct Output {
    compact: bool,
}

impl Output {
    fn render<T: Serialize + ?Sized>(self, value: &T) -> Result<String> {
        let text = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(text)
    }

    fn print<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        println!("{}", self.render(value)?);
        Ok(())
    }

    /// Prints a completed view update; in-flight states are skipped.
    fn update<T: Serialize>(self, view: &str, state: &QueryState<T, ClientError>) -> Result<()> {
        if state.is_refreshing {
            return Ok(());
        }
        self.print(&WatchEvent::from_state(view, state))
    }
}

/// One line of `watch` output.
#[derive(Debug, Serialize)]
struct WatchEvent<'a, T> {
    view: &'a str,
    status: String,
    stale: bool,
    updated_at: Option<DateTime<Utc>>,
    data: Option<&'a T>,
    error: Option<String>,
}

impl<'a, T> WatchEvent<'a, T> {
    fn from_state(view: &'a str, state: &'a QueryState<T, ClientError>) -> Self {
        Self {
            view,
            status: state.status.to_string(),
            stale: state.is_stale(),
            updated_at: state.updated_at,
            data: state.data.as_deref(),
            error: state.error.as_ref().map(ToString::to_string),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn watch(client: Arc<MonitoringClient>, args: &WatchArgs, output: Output) -> Result<()> {
    let dashboard = DashboardQueries::new(client, PollingConfig::from_env()?);
    let mut stats = dashboard.stats();
    let mut health = dashboard.system_health();
    let mut logs = dashboard.recent_logs(args.logs);

    tracing::info!(
        api_url = dashboard.client().base_url(),
        polling = ?dashboard.polling(),
        "Watching dashboard, press Ctrl+C to stop"
    );

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            Some(state) = stats.changed() => output.update("stats", &state)?,
            Some(state) = health.changed() => output.update("system_health", &state)?,
            Some(state) = logs.changed() => output.update("recent_logs", &state)?,
            else => break,
        }
    }

    tracing::info!("Stopped watching");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let Some(command) = &cli.command else {
        println!("Lookout CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for usage information");
        return Ok(());
    };

    let client = Arc::new(MonitoringClient::new(&cli.client_config())?);
    let output = Output {
        compact: cli.compact,
    };

    match command {
        Commands::Health => println!("{}", client.get_health().await?.trim_end()),
        Commands::Logs(args) => output.print(&client.get_logs(&args.filter()).await?)?,
        Commands::Metrics(args) => output.print(&client.get_metrics(&args.filter()).await?)?,
        Commands::Traces(args) => output.print(&client.get_traces(&args.filter()).await?)?,
        Commands::Spans { trace_id } => output.print(&client.get_spans(trace_id).await?)?,
        Commands::Stats => output.print(&fetch_dashboard_stats(&client).await?)?,
        Commands::Services => output.print(&fetch_system_health(&client).await?)?,
        Commands::Watch(args) => watch(client, args, output).await?,
    }

    Ok(())
}
