//! Logging and Metrics Setup

use crate::error::DaemonError;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging; `RUST_LOG` takes precedence over `level`
pub fn init_logging(level: &str) -> Result<(), DaemonError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| DaemonError::Logging(e.to_string()))?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| DaemonError::Logging(e.to_string()))
}

/// Serve relay counters for Prometheus scraping
pub fn init_metrics(listen: SocketAddr) -> Result<(), DaemonError> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .install()
        .map_err(|e| DaemonError::Metrics(e.to_string()))?;
    info!("Serving metrics on {}", listen);
    Ok(())
}
