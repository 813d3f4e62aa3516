//! Protocol Error Types

use thiserror::Error;

/// Errors raised when validating or building a complete frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Frame does not start with `FF 55 AA`
    #[error("Invalid preamble")]
    InvalidPreamble,

    /// Type byte has no entry in the frame length table
    #[error("Unknown packet type {0:#04X}")]
    UnknownType(u8),

    /// Buffer length differs from the length declared by the type
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Checksum trailer does not match the frame contents
    #[error("Checksum mismatch: expected {expected:04X}, got {actual:04X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// Payload handed to the encoder has the wrong size for its type
    #[error("Payload for type {packet_type:#04X} must be {expected} bytes, got {actual}")]
    PayloadSize {
        packet_type: u8,
        expected: usize,
        actual: usize,
    },
}
