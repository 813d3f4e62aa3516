//! Listeners That Feed the Monitoring Endpoint

use crate::listener::{PacketListener, UnknownDataListener};
use crate::unknown::UnknownByteBuffer;
use bms_protocol::Packet;
use embedded_hal::digital::{OutputPin, PinState};
use std::convert::Infallible;

/// Destination for raw packet bytes (network or web monitor)
pub trait MonitorSink {
    fn push(&mut self, data: &[u8]);
}

impl<F> MonitorSink for F
where
    F: FnMut(&[u8]),
{
    fn push(&mut self, data: &[u8]) {
        self(data)
    }
}

/// Streams every decoded packet to a monitor
pub struct PacketStreamer<S> {
    sink: S,
}

impl<S: MonitorSink> PacketStreamer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: MonitorSink> PacketListener for PacketStreamer<S> {
    fn on_packet(&mut self, packet: &Packet<'_>) {
        self.sink.push(packet.as_bytes());
    }
}

/// Accumulates unframeable bytes and streams the whole buffer each time it
/// grows. Stops once the buffer is full.
pub struct UnknownDataStreamer<S> {
    sink: S,
    buffer: UnknownByteBuffer,
}

impl<S: MonitorSink> UnknownDataStreamer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            buffer: UnknownByteBuffer::new(),
        }
    }
}

impl<S: MonitorSink> UnknownDataListener for UnknownDataStreamer<S> {
    fn on_unknown_byte(&mut self, byte: u8) {
        if self.buffer.push(byte) {
            self.sink.push(self.buffer.as_slice());
        }
    }
}

/// Toggles an indicator pin on every packet
pub struct ActivityBlinker<P> {
    pin: P,
    level: PinState,
}

impl<P> ActivityBlinker<P>
where
    P: OutputPin<Error = Infallible>,
{
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            level: PinState::Low,
        }
    }
}

impl<P> PacketListener for ActivityBlinker<P>
where
    P: OutputPin<Error = Infallible>,
{
    fn on_packet(&mut self, _packet: &Packet<'_>) {
        if let Err(never) = self.pin.set_state(self.level) {
            match never {}
        }
        self.level = !self.level;
    }
}
