//! BMS Serial Protocol
//!
//! This crate decodes the byte stream a battery-management unit sends to the
//! board controller. Frames look like:
//!
//! ```text
//! FF 55 AA | type | payload | checksum_hi checksum_lo
//! ```
//!
//! The frame length is fixed per type and the checksum is the 16-bit sum of
//! every preceding byte.

mod error;
mod framer;
mod message;
mod packet;

pub use error::ProtocolError;
pub use framer::{Framed, PacketFramer, Rejection};
pub use message::{BmsMessage, CELL_COUNT, CURRENT_SCALE_MILLIAMPS, TEMPERATURE_SENSOR_COUNT};
pub use packet::{checksum, encode_frame, frame_len, write_checksum, Packet};

/// Frame layout constants
pub mod layout {
    /// Preamble every frame starts with
    pub const PREAMBLE: [u8; 3] = [0xFF, 0x55, 0xAA];
    /// Offset of the type byte
    pub const TYPE_OFFSET: usize = 3;
    /// Offset of the first payload byte
    pub const PAYLOAD_OFFSET: usize = 4;
    /// Trailing checksum size
    pub const CHECKSUM_LEN: usize = 2;
    /// Bytes in a frame that are not payload
    pub const OVERHEAD: usize = PAYLOAD_OFFSET + CHECKSUM_LEN;
    /// Longest frame in the type table
    pub const MAX_FRAME_LEN: usize = 38;
}

/// Packet type identifiers
pub mod packet_type {
    /// Status flags (charging, empty, temperature, overcharge)
    pub const STATUS: u8 = 0x00;
    /// Cell voltages
    pub const CELL_VOLTAGES: u8 = 0x02;
    /// State of charge as computed by the BMS
    pub const STATE_OF_CHARGE: u8 = 0x03;
    /// Temperature sensors
    pub const TEMPERATURES: u8 = 0x04;
    /// Instantaneous current
    pub const CURRENT: u8 = 0x05;
    /// BMS serial number
    pub const SERIAL_NUMBER: u8 = 0x06;
    /// Battery type
    pub const BATTERY_TYPE: u8 = 0x08;
    /// Cycle count and battery life
    pub const HEALTH_AND_CYCLES: u8 = 0x0D;
}
