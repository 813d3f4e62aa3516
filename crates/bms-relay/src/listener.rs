//! Relay Listener Traits

use bms_protocol::Packet;

/// Receives every decoded packet.
///
/// Runs synchronously inside `BmsRelay::tick`, so implementations must not
/// block. The packet borrows the framer's buffer and cannot be kept.
pub trait PacketListener {
    fn on_packet(&mut self, packet: &Packet<'_>);
}

impl<F> PacketListener for F
where
    F: FnMut(&Packet<'_>),
{
    fn on_packet(&mut self, packet: &Packet<'_>) {
        self(packet)
    }
}

/// Receives bytes that could not be framed, one at a time
pub trait UnknownDataListener {
    fn on_unknown_byte(&mut self, byte: u8);
}

impl<F> UnknownDataListener for F
where
    F: FnMut(u8),
{
    fn on_unknown_byte(&mut self, byte: u8) {
        self(byte)
    }
}
