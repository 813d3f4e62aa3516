//! Frame Definitions and Checksums

use crate::error::ProtocolError;
use crate::layout::{CHECKSUM_LEN, OVERHEAD, PAYLOAD_OFFSET, PREAMBLE, TYPE_OFFSET};

/// Total frame length for each packet type, indexed by type byte.
/// `None` marks types the BMS is not known to send.
const FRAME_LENGTHS: [Option<usize>; 15] = [
    Some(7),  // 0x00 status
    None,     // 0x01
    Some(38), // 0x02 cell voltages
    Some(7),  // 0x03 state of charge
    Some(11), // 0x04 temperatures
    Some(8),  // 0x05 current
    Some(10), // 0x06 serial number
    Some(13), // 0x07
    Some(7),  // 0x08 battery type
    None,     // 0x09
    Some(7),  // 0x0A
    Some(7),  // 0x0B
    Some(13), // 0x0C
    Some(9),  // 0x0D health and cycles
    Some(8),  // 0x0E
];

/// Get the full frame length declared by a type byte
pub fn frame_len(packet_type: u8) -> Option<usize> {
    FRAME_LENGTHS
        .get(packet_type as usize)
        .copied()
        .flatten()
}

/// 16-bit wrapping sum of all bytes
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

/// Recompute the checksum trailer of a complete frame in place
pub fn write_checksum(frame: &mut [u8]) {
    if frame.len() < OVERHEAD {
        return;
    }
    let body_len = frame.len() - CHECKSUM_LEN;
    let sum = checksum(&frame[..body_len]);
    frame[body_len..].copy_from_slice(&sum.to_be_bytes());
}

/// Build a valid frame for `packet_type` around `payload`
pub fn encode_frame(packet_type: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let len = frame_len(packet_type).ok_or(ProtocolError::UnknownType(packet_type))?;
    let expected = len - OVERHEAD;
    if payload.len() != expected {
        return Err(ProtocolError::PayloadSize {
            packet_type,
            expected,
            actual: payload.len(),
        });
    }

    let mut frame = Vec::with_capacity(len);
    frame.extend_from_slice(&PREAMBLE);
    frame.push(packet_type);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[0, 0]);
    write_checksum(&mut frame);
    Ok(frame)
}

/// A complete, checksum-validated frame borrowed from a buffer.
///
/// The view cannot outlive the buffer it was decoded from. The framer reuses
/// that buffer for the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    bytes: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Wrap bytes the framer has already validated
    pub(crate) fn new_unchecked(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Validate a complete frame
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PAYLOAD_OFFSET || bytes[..TYPE_OFFSET] != PREAMBLE {
            return Err(ProtocolError::InvalidPreamble);
        }

        let packet_type = bytes[TYPE_OFFSET];
        let expected = frame_len(packet_type).ok_or(ProtocolError::UnknownType(packet_type))?;
        if bytes.len() != expected {
            return Err(ProtocolError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let packet = Self { bytes };
        let computed = checksum(&bytes[..bytes.len() - CHECKSUM_LEN]);
        if computed != packet.checksum() {
            return Err(ProtocolError::ChecksumMismatch {
                expected: computed,
                actual: packet.checksum(),
            });
        }

        Ok(packet)
    }

    /// Raw frame bytes, preamble through checksum
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a validated frame
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Packet type identifier
    pub fn packet_type(&self) -> u8 {
        self.bytes[TYPE_OFFSET]
    }

    /// Payload between the type byte and the checksum
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[PAYLOAD_OFFSET..self.bytes.len() - CHECKSUM_LEN]
    }

    /// Checksum carried in the trailer
    pub fn checksum(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_be_bytes([self.bytes[n - 2], self.bytes[n - 1]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet_type;

    #[test]
    fn test_checksum_wraps() {
        let bytes = [0xFF; 300];
        assert_eq!(checksum(&bytes), (300u32 * 0xFF % 0x10000) as u16);
    }

    #[test]
    fn test_encode_and_parse() {
        let frame = encode_frame(packet_type::STATE_OF_CHARGE, &[0x42]).unwrap();
        // FF+55+AA+03+42 = 0x0243
        assert_eq!(frame, vec![0xFF, 0x55, 0xAA, 0x03, 0x42, 0x02, 0x43]);

        let packet = Packet::parse(&frame).unwrap();
        assert_eq!(packet.packet_type(), packet_type::STATE_OF_CHARGE);
        assert_eq!(packet.payload(), &[0x42]);
        assert_eq!(packet.len(), 7);
        assert_eq!(packet.checksum(), 0x0243);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let mut frame = encode_frame(packet_type::CURRENT, &[0x00, 0x10]).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert!(matches!(
            Packet::parse(&frame),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let frame = [0xFF, 0x55, 0xAA, 0x03, 0x42, 0x02];
        assert_eq!(
            Packet::parse(&frame),
            Err(ProtocolError::LengthMismatch {
                expected: 7,
                actual: 6
            })
        );
    }

    #[test]
    fn test_unknown_types() {
        assert_eq!(frame_len(0x01), None);
        assert_eq!(frame_len(0x09), None);
        assert_eq!(frame_len(0xFF), None);
        assert_eq!(
            encode_frame(0x09, &[]),
            Err(ProtocolError::UnknownType(0x09))
        );
    }

    #[test]
    fn test_payload_size_checked() {
        assert_eq!(
            encode_frame(packet_type::SERIAL_NUMBER, &[1, 2, 3]),
            Err(ProtocolError::PayloadSize {
                packet_type: packet_type::SERIAL_NUMBER,
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_write_checksum_after_rewrite() {
        let mut frame = encode_frame(packet_type::BATTERY_TYPE, &[0x01]).unwrap();
        frame[4] = 0x07;
        write_checksum(&mut frame);
        assert!(Packet::parse(&frame).is_ok());
    }
}
