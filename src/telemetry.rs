use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LoggingConfig, MetricsConfig};
use crate::utils::error::{AppError, Result};

const LOG_FILE_PREFIX: &str = "drift-watcher.log";

/// Installs the global subscriber: stdout always, plus a daily rolling file
/// when `directory` is set. `RUST_LOG` overrides the configured filter.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }

    guard
}

/// Starts the Prometheus scrape endpoint when enabled. Without it the
/// counters recorded by cycles are no-ops.
pub fn init_metrics(config: &MetricsConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::StartupConfiguration(format!("Failed to start metrics exporter: {}", e)))?;

    metrics::describe_counter!("drift_watcher_cycles_total", "Reconciliation cycles by outcome");
    metrics::describe_counter!("drift_watcher_selector_changes_total", "Selector fields that drifted");
    metrics::describe_counter!("drift_watcher_refresh_failures_total", "Failed data refreshes");

    tracing::info!("Metrics available on {}", addr);
    Ok(())
}
