//! Serial Port Byte Source and Sink

use crate::error::DaemonError;
use bms_relay::{ByteSink, ByteSource};
use std::cell::RefCell;
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::rc::Rc;
use std::time::Duration;
use tokio_serial::{DataBits, Parity, SerialPort, StopBits};
use tracing::{info, warn};

const READ_CHUNK: usize = 256;

/// Open the BMS link. Reads never block; an empty port reads as a timeout.
pub fn open_port(device: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, DaemonError> {
    let port = tokio_serial::new(device, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::ZERO)
        .open()?;
    info!("Opened {} at {} baud", device, baud_rate);
    Ok(port)
}

/// Yields buffered bytes one at a time, refilling from the reader in chunks
pub struct ChunkedReader<R> {
    inner: R,
    buf: [u8; READ_CHUNK],
    pos: usize,
    len: usize,
}

impl<R: Read> ChunkedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: [0; READ_CHUNK],
            pos: 0,
            len: 0,
        }
    }

    /// Next byte, or `None` when the reader has nothing waiting
    pub fn next_byte(&mut self) -> Option<u8> {
        if self.pos == self.len {
            self.pos = 0;
            self.len = match self.inner.read(&mut self.buf) {
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => 0,
                Err(e) if e.kind() == ErrorKind::Interrupted => 0,
                Err(e) => {
                    warn!("Serial read failed: {}", e);
                    0
                }
            };
            if self.len == 0 {
                return None;
            }
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Some(byte)
    }
}

impl<R: Read + 'static> ChunkedReader<R> {
    pub fn into_source(mut self) -> ByteSource {
        Box::new(move || self.next_byte())
    }
}

/// Buffered writer shared between the relay sink and the loop that flushes it
pub struct SharedWriter<W: Write> {
    inner: Rc<RefCell<BufWriter<W>>>,
}

impl<W: Write> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<W: Write + 'static> SharedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Rc::new(RefCell::new(BufWriter::new(writer))),
        }
    }

    /// Sink for the relay; bytes stay buffered until [`SharedWriter::flush`]
    pub fn sink(&self) -> ByteSink {
        let inner = Rc::clone(&self.inner);
        Box::new(move |byte| {
            if let Err(e) = inner.borrow_mut().write_all(&[byte]) {
                warn!("Serial write failed: {}", e);
            }
        })
    }

    pub fn flush(&self) -> io::Result<()> {
        self.inner.borrow_mut().flush()
    }

    /// Bytes written but not yet flushed
    pub fn buffered(&self) -> usize {
        self.inner.borrow().buffer().len()
    }
}
