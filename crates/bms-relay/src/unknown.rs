//! Capped Unknown-Data Buffer

/// Maximum number of unframeable bytes kept for diagnostics
pub const UNKNOWN_DATA_CAPACITY: usize = 128;

/// Append-only record of bytes that never formed a valid packet.
///
/// Bytes past the capacity are dropped until the buffer is cleared.
#[derive(Debug, Clone)]
pub struct UnknownByteBuffer {
    bytes: Vec<u8>,
}

impl Default for UnknownByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl UnknownByteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(UNKNOWN_DATA_CAPACITY),
        }
    }

    /// Append a byte; returns false if it was dropped
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.bytes.push(byte);
        true
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.len() >= UNKNOWN_DATA_CAPACITY
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
