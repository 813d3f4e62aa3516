//! Fuel Gauge Persistence

use crate::error::DaemonError;
use fuel_gauge::FuelGaugeState;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// Read a saved snapshot; `None` when no file exists yet
pub fn load_gauge_state(path: &Path) -> Result<Option<FuelGaugeState>, DaemonError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DaemonError::StateIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    FuelGaugeState::from_bytes(&bytes)
        .map(Some)
        .map_err(|source| DaemonError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
}

/// Write a snapshot, replacing any previous one in a single rename
pub fn save_gauge_state(path: &Path, state: &FuelGaugeState) -> Result<(), DaemonError> {
    let bytes = state.to_bytes().map_err(|source| DaemonError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    let staging = path.with_extension("tmp");
    fs::write(&staging, &bytes)
        .and_then(|()| fs::rename(&staging, path))
        .map_err(|source| DaemonError::StateIo {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Saved fuel gauge state to {}", path.display());
    Ok(())
}
