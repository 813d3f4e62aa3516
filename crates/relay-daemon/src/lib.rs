//! BMS Relay Daemon
//!
//! Runs the relay against a serial port on a host machine. Settings come from
//! a TOML file plus `BMS_RELAY_*` environment variables.

pub mod error;
mod logging;
mod monitor;
mod runner;
pub mod settings;
mod state;
mod transport;

pub use error::DaemonError;
pub use logging::{init_logging, init_metrics};
pub use monitor::TracingMonitor;
pub use runner::{configure, drive, monotonic_clock, run};
pub use settings::{RelaySettings, DEFAULT_SETTINGS_FILE};
pub use state::{load_gauge_state, save_gauge_state};
pub use transport::{open_port, ChunkedReader, SharedWriter};
