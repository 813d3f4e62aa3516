//! Battery Fuel Gauge
//!
//! Estimates state of charge by integrating current over time. A cell
//! voltage reading anchors the counted charge to a state of charge, the
//! gauge remembers the lowest and highest charge it has observed, and the
//! whole state can be snapshotted so the estimate survives power loss.

mod error;
mod gauge;
mod voltage;

pub use error::SnapshotError;
pub use gauge::{FuelGauge, FuelGaugeState, DEFAULT_CAPACITY_MAH};
pub use voltage::soc_from_cell_millivolts;
