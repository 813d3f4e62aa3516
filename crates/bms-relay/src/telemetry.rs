//! Last Known BMS Readings

use bms_protocol::{BmsMessage, CELL_COUNT, TEMPERATURE_SENSOR_COUNT};
use serde::Serialize;
use tracing::{debug, info};

/// Values captured from the most recent packets of each type.
///
/// Identity fields hold what the BMS sent, before any override.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BmsTelemetry {
    /// Raw status byte
    pub status: u8,
    /// Cell voltages (mV)
    pub cell_millivolts: [u16; CELL_COUNT],
    /// Sum of cell voltages (mV)
    pub total_voltage_millivolts: u32,
    /// Sensor temperatures (°C)
    pub temperatures_celsius: [i8; TEMPERATURE_SENSOR_COUNT],
    /// Mean of the sensor temperatures (°C)
    pub average_temperature_celsius: i8,
    /// Current (mA), positive while discharging
    pub current_milliamps: i32,
    /// State of charge computed by the BMS (%)
    pub bms_soc_percent: Option<i8>,
    /// First serial number seen
    pub captured_serial: Option<u32>,
    /// Battery type reported by the BMS
    pub battery_type: Option<u8>,
    /// Charge cycles
    pub cycles: u16,
    /// Battery life (%)
    pub battery_life: u8,
}

impl BmsTelemetry {
    /// Fold a decoded message into the readings
    pub fn update(&mut self, message: &BmsMessage) {
        match *message {
            BmsMessage::Status(status) => self.status = status,
            BmsMessage::CellVoltages(cells) => {
                self.cell_millivolts = cells;
                self.total_voltage_millivolts = cells.iter().map(|&mv| mv as u32).sum();
            }
            BmsMessage::StateOfCharge(soc) => self.bms_soc_percent = Some(soc),
            BmsMessage::Temperatures(temps) => {
                self.temperatures_celsius = temps;
                let sum: i16 = temps.iter().map(|&t| t as i16).sum();
                self.average_temperature_celsius = (sum / TEMPERATURE_SENSOR_COUNT as i16) as i8;
            }
            BmsMessage::Current(raw) => {
                self.current_milliamps = BmsMessage::current_milliamps(raw);
            }
            BmsMessage::SerialNumber(serial) => {
                if self.captured_serial.is_none() && serial != 0 {
                    info!("Captured BMS serial {}", serial);
                    self.captured_serial = Some(serial);
                }
            }
            BmsMessage::BatteryType(battery_type) => {
                if self.battery_type != Some(battery_type) {
                    debug!("BMS battery type {}", battery_type);
                }
                self.battery_type = Some(battery_type);
            }
            BmsMessage::HealthAndCycles { cycles, life } => {
                self.cycles = cycles;
                self.battery_life = life;
            }
        }
    }

    /// Charger connected
    pub fn is_charging(&self) -> bool {
        BmsMessage::is_charging(self.status)
    }

    /// Pack empty
    pub fn is_battery_empty(&self) -> bool {
        BmsMessage::is_battery_empty(self.status)
    }

    /// Pack temperature out of range
    pub fn is_temperature_out_of_range(&self) -> bool {
        BmsMessage::is_temperature_out_of_range(self.status)
    }

    /// Pack overcharged
    pub fn is_overcharged(&self) -> bool {
        BmsMessage::is_overcharged(self.status)
    }
}
