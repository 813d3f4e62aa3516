//! Snapshot Error Types

use thiserror::Error;

/// Errors while decoding a persisted gauge snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot bytes could not be decoded
    #[error("Corrupt fuel gauge snapshot: {0}")]
    Corrupt(#[from] postcard::Error),

    /// Decoded snapshot violates the bottom <= current invariant
    #[error("Inconsistent fuel gauge snapshot: bottom {bottom} > current {current}")]
    Inconsistent { bottom: f64, current: f64 },

    /// Only one SOC bound is set, or the bottom one is above the top one
    #[error("Inconsistent fuel gauge snapshot: SOC bounds {bottom_soc:?}..{top_soc:?}")]
    SocBounds {
        bottom_soc: Option<f64>,
        top_soc: Option<f64>,
    },
}
