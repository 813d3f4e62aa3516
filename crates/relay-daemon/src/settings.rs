//! Relay Settings

use crate::error::DaemonError;
use config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `BMS_RELAY_IS_LOCKED=true`
pub const ENV_PREFIX: &str = "BMS_RELAY";

/// Settings file read when no path is given
pub const DEFAULT_SETTINGS_FILE: &str = "bms-relay.toml";

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Serial device wired to the BMS and board
    pub serial_device: String,
    /// Line rate of the BMS link
    pub baud_rate: u32,
    /// Period of the relay loop (ms)
    pub tick_interval_ms: u64,
    /// Period of the telemetry log line (s)
    pub status_interval_secs: u64,
    /// Start with the board cut off from BMS traffic
    pub is_locked: bool,
    /// Battery type to advertise instead of the real one
    pub battery_type_override: Option<u8>,
    /// Serial number to advertise instead of the real one
    pub serial_override: Option<u32>,
    /// Replace the BMS SOC with the fuel gauge estimate
    pub override_soc: bool,
    /// Pack capacity the fuel gauge scales counted charge by (mAh)
    pub battery_capacity_mah: u32,
    /// Where the fuel gauge state is persisted
    pub state_file: PathBuf,
    /// Persist the fuel gauge state when the daemon stops
    pub save_state_on_shutdown: bool,
    /// Default log filter; `RUST_LOG` wins when set
    pub log_level: String,
    /// Prometheus listen address; no exporter when unset
    pub metrics_listen: Option<SocketAddr>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            serial_device: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            tick_interval_ms: 5,
            status_interval_secs: 30,
            is_locked: false,
            battery_type_override: None,
            serial_override: None,
            override_soc: false,
            battery_capacity_mah: fuel_gauge::DEFAULT_CAPACITY_MAH,
            state_file: PathBuf::from("bms-relay-state.bin"),
            save_state_on_shutdown: false,
            log_level: "info".to_string(),
            metrics_listen: None,
        }
    }
}

impl RelaySettings {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        Self::from_sources(File::from(path).required(false), environment())
    }

    fn from_sources<S>(file: S, env: Environment) -> Result<Self, DaemonError>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize::<Self>()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), DaemonError> {
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms must be positive"));
        }
        if self.status_interval_secs == 0 {
            return Err(invalid("status_interval_secs must be positive"));
        }
        if self.serial_device.is_empty() {
            return Err(invalid("serial_device must be set"));
        }
        if self.battery_capacity_mah == 0 {
            return Err(invalid("battery_capacity_mah must be positive"));
        }
        if self.battery_type_override == Some(0) {
            return Err(invalid("battery_type_override 0 would be ignored, leave it unset"));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn invalid(message: &str) -> DaemonError {
    DaemonError::Config(config::ConfigError::Message(message.to_string()))
}
