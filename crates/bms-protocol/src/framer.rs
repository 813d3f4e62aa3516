//! Byte-at-a-time Frame Decoder

use crate::layout::{CHECKSUM_LEN, MAX_FRAME_LEN, PREAMBLE, TYPE_OFFSET};
use crate::packet::{checksum, frame_len, Packet};
use tracing::{debug, trace};

/// Why bytes were released as unknown data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Bytes did not form the `FF 55 AA` preamble
    NoPreamble,
    /// Preamble was followed by a type with no known length
    UnknownType(u8),
    /// Frame reached its declared length but the checksum was wrong
    ChecksumMismatch { expected: u16, actual: u16 },
}

/// Outcome of feeding one byte to the framer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framed<'a> {
    /// Byte is held as part of a frame still being accumulated
    Pending,
    /// Byte completed a valid frame
    Packet(Packet<'a>),
    /// Bytes that will never belong to a frame, in arrival order
    Unknown {
        bytes: &'a [u8],
        reason: Rejection,
    },
}

/// Incremental decoder for the BMS-to-board byte stream.
///
/// Framing relies only on the preamble, the length implied by the type byte,
/// and the checksum. A preamble inside a frame is treated as payload.
#[derive(Debug)]
pub struct PacketFramer {
    /// Bytes of the frame being accumulated
    frame: Vec<u8>,
    /// Declared length, known once the type byte arrived
    expected_len: usize,
    /// Bytes released by the last `push`
    rejected: Vec<u8>,
    /// Last `push` yielded a packet still borrowed from `frame`
    completed: bool,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFramer {
    /// Create an idle framer
    pub fn new() -> Self {
        Self {
            frame: Vec::with_capacity(MAX_FRAME_LEN),
            expected_len: 0,
            rejected: Vec::with_capacity(MAX_FRAME_LEN),
            completed: false,
        }
    }

    /// Feed one byte
    pub fn push(&mut self, byte: u8) -> Framed<'_> {
        if self.completed {
            self.frame.clear();
            self.completed = false;
        }
        self.rejected.clear();

        let held = self.frame.len();
        if held < PREAMBLE.len() {
            return self.push_preamble(byte, held);
        }

        self.frame.push(byte);

        if held == TYPE_OFFSET {
            return match frame_len(byte) {
                Some(len) => {
                    self.expected_len = len;
                    Framed::Pending
                }
                None => {
                    debug!("Unknown packet type {:#04X}, dropping frame", byte);
                    self.release(Rejection::UnknownType(byte))
                }
            };
        }

        if self.frame.len() < self.expected_len {
            return Framed::Pending;
        }

        let body_len = self.frame.len() - CHECKSUM_LEN;
        let expected = checksum(&self.frame[..body_len]);
        let actual = u16::from_be_bytes([self.frame[body_len], self.frame[body_len + 1]]);
        if expected != actual {
            debug!(
                "Checksum mismatch on type {:#04X}: expected {:04X}, got {:04X}",
                self.frame[TYPE_OFFSET], expected, actual
            );
            return self.release(Rejection::ChecksumMismatch { expected, actual });
        }

        trace!("Framed packet type {:#04X}", self.frame[TYPE_OFFSET]);
        self.completed = true;
        Framed::Packet(Packet::new_unchecked(&self.frame))
    }

    fn push_preamble(&mut self, byte: u8, held: usize) -> Framed<'_> {
        if byte == PREAMBLE[held] {
            self.frame.push(byte);
            return Framed::Pending;
        }

        self.rejected.extend(self.frame.drain(..));
        // A broken preamble may itself be the start of the next one.
        if held > 0 && byte == PREAMBLE[0] {
            self.frame.push(byte);
        } else {
            self.rejected.push(byte);
        }
        Framed::Unknown {
            bytes: &self.rejected,
            reason: Rejection::NoPreamble,
        }
    }

    fn release(&mut self, reason: Rejection) -> Framed<'_> {
        self.rejected.extend(self.frame.drain(..));
        self.expected_len = 0;
        Framed::Unknown {
            bytes: &self.rejected,
            reason,
        }
    }

    /// Discard any partially accumulated frame
    pub fn reset(&mut self) {
        self.frame.clear();
        self.rejected.clear();
        self.expected_len = 0;
        self.completed = false;
    }

    /// Check whether no frame is being accumulated
    pub fn is_idle(&self) -> bool {
        self.completed || self.frame.is_empty()
    }

    /// Number of bytes held for the frame in progress
    pub fn pending_len(&self) -> usize {
        if self.completed {
            0
        } else {
            self.frame.len()
        }
    }
}
