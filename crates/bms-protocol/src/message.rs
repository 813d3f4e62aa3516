//! Typed Decoding of Packet Payloads

use crate::packet::Packet;
use crate::packet_type;
use serde::{Deserialize, Serialize};

/// Number of series cells reported in a cell-voltage packet
pub const CELL_COUNT: usize = 15;

/// Number of temperature sensors reported
pub const TEMPERATURE_SENSOR_COUNT: usize = 5;

/// Milliamps per unit of the raw current reading (measured on a Pint)
pub const CURRENT_SCALE_MILLIAMPS: i32 = 55;

/// Status bit set while the charger is connected
const STATUS_CHARGING: u8 = 0x20;
/// Status bit set when the pack is empty
const STATUS_EMPTY: u8 = 0x04;
/// Status bits for over/under temperature
const STATUS_TEMPERATURE: u8 = 0x03;
/// Status bit set when the pack is overcharged
const STATUS_OVERCHARGED: u8 = 0x08;

/// A decoded BMS message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmsMessage {
    /// Status flag byte
    Status(u8),
    /// Cell voltages in millivolts
    CellVoltages([u16; CELL_COUNT]),
    /// State of charge in percent as computed by the BMS
    StateOfCharge(i8),
    /// Temperatures in °C
    Temperatures([i8; TEMPERATURE_SENSOR_COUNT]),
    /// Raw current reading, positive while discharging
    Current(i16),
    /// Serial number
    SerialNumber(u32),
    /// Battery type identifier
    BatteryType(u8),
    /// Charge cycles and remaining battery life
    HealthAndCycles { cycles: u16, life: u8 },
}

impl BmsMessage {
    /// Decode the packet types the relay cares about
    pub fn decode(packet: &Packet<'_>) -> Option<Self> {
        let data = packet.payload();
        let message = match packet.packet_type() {
            packet_type::STATUS => Self::Status(data[0]),
            packet_type::CELL_VOLTAGES => {
                let mut cells = [0u16; CELL_COUNT];
                for (cell, bytes) in cells.iter_mut().zip(data.chunks_exact(2)) {
                    *cell = u16::from_be_bytes([bytes[0], bytes[1]]);
                }
                Self::CellVoltages(cells)
            }
            packet_type::STATE_OF_CHARGE => Self::StateOfCharge(data[0] as i8),
            packet_type::TEMPERATURES => {
                let mut temps = [0i8; TEMPERATURE_SENSOR_COUNT];
                for (t, &b) in temps.iter_mut().zip(data) {
                    *t = b as i8;
                }
                Self::Temperatures(temps)
            }
            packet_type::CURRENT => Self::Current(i16::from_be_bytes([data[0], data[1]])),
            packet_type::SERIAL_NUMBER => {
                Self::SerialNumber(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
            }
            packet_type::BATTERY_TYPE => Self::BatteryType(data[0]),
            packet_type::HEALTH_AND_CYCLES => Self::HealthAndCycles {
                cycles: u16::from_be_bytes([data[0], data[1]]),
                life: data[2],
            },
            _ => return None,
        };
        Some(message)
    }

    /// Convert a raw current reading to milliamps
    pub fn current_milliamps(raw: i16) -> i32 {
        raw as i32 * CURRENT_SCALE_MILLIAMPS
    }

    /// Charger connected
    pub fn is_charging(status: u8) -> bool {
        status & STATUS_CHARGING != 0
    }

    /// Pack empty
    pub fn is_battery_empty(status: u8) -> bool {
        status & STATUS_EMPTY != 0
    }

    /// One bit is probably hot and the other cold; both raise the same error
    pub fn is_temperature_out_of_range(status: u8) -> bool {
        status & STATUS_TEMPERATURE != 0
    }

    /// Pack overcharged
    pub fn is_overcharged(status: u8) -> bool {
        status & STATUS_OVERCHARGED != 0
    }
}
