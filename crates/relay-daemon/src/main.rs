//! BMS Relay - Main Entry Point

use anyhow::Context;
use relay_daemon::{init_logging, init_metrics, run, RelaySettings, DEFAULT_SETTINGS_FILE};
use std::path::PathBuf;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = RelaySettings::load(&path)
        .with_context(|| format!("loading settings from {}", path.display()))?;

    init_logging(&settings.log_level)?;
    info!("=== BMS Relay v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(listen) = settings.metrics_listen {
        init_metrics(listen)?;
    }

    run(settings).await?;
    Ok(())
}
