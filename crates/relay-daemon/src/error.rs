//! Daemon Error Types

use fuel_gauge::SnapshotError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or tearing down the relay
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Serial port could not be opened or cloned
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Fuel gauge state file could not be read or written
    #[error("State file {}: {source}", path.display())]
    StateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fuel gauge state file is corrupt
    #[error("State file {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    /// Tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// Prometheus exporter could not be installed
    #[error("Metrics exporter error: {0}")]
    Metrics(String),
}
