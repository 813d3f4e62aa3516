//! Relay Orchestrator

use crate::listener::{PacketListener, UnknownDataListener};
use crate::lock::LockFlag;
use crate::overrides::Overrides;
use crate::telemetry::BmsTelemetry;
use crate::tracker::PacketTracker;
use crate::unknown::UnknownByteBuffer;
use bms_protocol::layout::MAX_FRAME_LEN;
use bms_protocol::{BmsMessage, Framed, Packet, PacketFramer, Rejection};
use fuel_gauge::FuelGauge;
use metrics::counter;
use tracing::{debug, info, trace};

/// Polled for the next byte from the BMS; `None` when nothing is waiting
pub type ByteSource = Box<dyn FnMut() -> Option<u8>>;

/// Writes one byte to the board controller
pub type ByteSink = Box<dyn FnMut(u8)>;

/// Monotonic millisecond clock
pub type MillisClock = Box<dyn Fn() -> u64>;

/// What a single `tick` did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Bytes taken from the source
    pub bytes_read: usize,
    /// Valid packets decoded
    pub packets: usize,
    /// Bytes released as unknown data
    pub unknown_bytes: usize,
    /// Bytes written to the sink
    pub bytes_written: usize,
    /// Bytes withheld because the lock was set
    pub bytes_suppressed: usize,
}

/// Protocol-aware relay between the BMS and the board.
///
/// Owns the framer and the fuel gauge. All work happens in [`BmsRelay::tick`],
/// which must be called repeatedly from the scheduling loop.
pub struct BmsRelay {
    source: ByteSource,
    sink: ByteSink,
    clock: MillisClock,
    lock: LockFlag,
    framer: PacketFramer,
    /// Copy of the current packet that overrides are applied to
    outbound: Vec<u8>,
    unknown: UnknownByteBuffer,
    packet_listeners: Vec<Box<dyn PacketListener>>,
    forwarded_listeners: Vec<Box<dyn PacketListener>>,
    unknown_listener: Option<Box<dyn UnknownDataListener>>,
    overrides: Overrides,
    telemetry: BmsTelemetry,
    tracker: PacketTracker,
    gauge: FuelGauge,
    /// Clock reading at the previous current sample
    last_current_millis: Option<u64>,
    /// Clock reading at the previous cell voltage sample
    last_voltage_millis: Option<u64>,
}

impl BmsRelay {
    /// Create a relay around the transport primitives
    pub fn new(source: ByteSource, sink: ByteSink, clock: MillisClock, lock: LockFlag) -> Self {
        info!("Creating BMS relay (locked: {})", lock.is_locked());
        Self {
            source,
            sink,
            clock,
            lock,
            framer: PacketFramer::new(),
            outbound: Vec::with_capacity(MAX_FRAME_LEN),
            unknown: UnknownByteBuffer::new(),
            packet_listeners: Vec::new(),
            forwarded_listeners: Vec::new(),
            unknown_listener: None,
            overrides: Overrides::default(),
            telemetry: BmsTelemetry::default(),
            tracker: PacketTracker::default(),
            gauge: FuelGauge::new(),
            last_current_millis: None,
            last_voltage_millis: None,
        }
    }

    /// Drain every byte currently available from the BMS.
    ///
    /// Never fails: anything that does not frame is delivered as unknown data
    /// and relayed unchanged.
    pub fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary::default();

        while let Some(byte) = (self.source)() {
            summary.bytes_read += 1;

            match self.framer.push(byte) {
                Framed::Pending => {}
                Framed::Packet(packet) => {
                    trace!("Relaying packet type {:#04X}", packet.packet_type());
                    summary.packets += 1;
                    counter!("bms_relay_packets_total").increment(1);
                    let now = (self.clock)();
                    self.tracker.record_packet(packet.packet_type(), now);

                    if let Some(message) = BmsMessage::decode(&packet) {
                        self.telemetry.update(&message);
                        match message {
                            BmsMessage::Current(raw) => {
                                let elapsed = elapsed_since(&mut self.last_current_millis, now);
                                // The BMS reports discharge as positive
                                self.gauge
                                    .update(-BmsMessage::current_milliamps(raw), elapsed);
                            }
                            BmsMessage::CellVoltages(cells) => {
                                let elapsed = elapsed_since(&mut self.last_voltage_millis, now);
                                if let Some(&lowest) = cells.iter().min() {
                                    self.gauge.update_voltage(lowest, elapsed);
                                }
                            }
                            BmsMessage::Status(status) => {
                                self.gauge
                                    .update_charging_status(BmsMessage::is_charging(status));
                            }
                            BmsMessage::StateOfCharge(soc) if soc >= 0 => {
                                self.gauge.observe_reported_soc(soc as u8);
                            }
                            _ => {}
                        }
                    }
                    self.unknown.clear();

                    let outbound: &[u8] = if self.overrides.is_active() {
                        if self
                            .overrides
                            .apply(&packet, self.gauge.soc_percent(), &mut self.outbound)
                        {
                            trace!("Rewrote packet type {:#04X}", packet.packet_type());
                        }
                        self.outbound.as_slice()
                    } else {
                        packet.as_bytes()
                    };
                    let locked = self.lock.is_locked();
                    for &b in outbound {
                        write_byte(&mut self.sink, &self.lock, b, &mut summary);
                    }
                    if !locked && !self.forwarded_listeners.is_empty() {
                        match Packet::parse(outbound) {
                            Ok(forwarded) => {
                                for listener in &mut self.forwarded_listeners {
                                    listener.on_packet(&forwarded);
                                }
                            }
                            Err(e) => debug!("Rewritten packet failed validation: {}", e),
                        }
                    }

                    for listener in &mut self.packet_listeners {
                        listener.on_packet(&packet);
                    }
                }
                Framed::Unknown { bytes, reason } => {
                    if let Rejection::ChecksumMismatch { .. } = reason {
                        counter!("bms_relay_checksum_failures_total").increment(1);
                    }
                    counter!("bms_relay_unknown_bytes_total").increment(bytes.len() as u64);
                    self.tracker.record_unknown(bytes.len(), reason);
                    summary.unknown_bytes += bytes.len();

                    for &b in bytes {
                        self.unknown.push(b);
                        write_byte(&mut self.sink, &self.lock, b, &mut summary);
                        if let Some(listener) = self.unknown_listener.as_mut() {
                            listener.on_unknown_byte(b);
                        }
                    }
                }
            }
        }

        if summary.bytes_suppressed > 0 {
            counter!("bms_relay_locked_bytes_total").increment(summary.bytes_suppressed as u64);
        }
        summary
    }

    /// Spoof the battery type sent to the board; `None` or zero disables
    pub fn set_battery_type_override(&mut self, battery_type: Option<u8>) {
        self.overrides.battery_type = Overrides::battery_type_from(battery_type);
        info!("Battery type override: {:?}", self.overrides.battery_type);
    }

    /// Spoof the BMS serial number sent to the board
    pub fn set_serial_number_override(&mut self, serial: Option<u32>) {
        self.overrides.serial_number = serial;
        info!("Serial number override: {:?}", serial);
    }

    /// Replace the BMS state of charge with the fuel gauge estimate
    pub fn set_soc_override(&mut self, enabled: bool) {
        self.overrides.soc_from_gauge = enabled;
        info!("State of charge override: {}", enabled);
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Register a listener for decoded packets, called in registration order
    pub fn add_received_packet_listener<L>(&mut self, listener: L)
    where
        L: PacketListener + 'static,
    {
        self.packet_listeners.push(Box::new(listener));
        debug!("{} packet listeners registered", self.packet_listeners.len());
    }

    /// Register a closure for decoded packets
    pub fn add_received_packet_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Packet<'_>) + 'static,
    {
        self.add_received_packet_listener(callback);
    }

    /// Register a listener for packets as written to the board, after
    /// overrides. Not called while the lock is set.
    pub fn add_forwarded_packet_listener<L>(&mut self, listener: L)
    where
        L: PacketListener + 'static,
    {
        self.forwarded_listeners.push(Box::new(listener));
    }

    /// Register a closure for packets as written to the board
    pub fn add_forwarded_packet_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Packet<'_>) + 'static,
    {
        self.add_forwarded_packet_listener(callback);
    }

    /// Set the listener for unframeable bytes, replacing any previous one
    pub fn set_unknown_data_listener<L>(&mut self, listener: L)
    where
        L: UnknownDataListener + 'static,
    {
        self.unknown_listener = Some(Box::new(listener));
    }

    /// Set a closure for unframeable bytes
    pub fn set_unknown_data_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u8) + 'static,
    {
        self.set_unknown_data_listener(callback);
    }

    pub fn fuel_gauge(&self) -> &FuelGauge {
        &self.gauge
    }

    /// Mutable gauge access for restoring a snapshot at start-up
    pub fn fuel_gauge_mut(&mut self) -> &mut FuelGauge {
        &mut self.gauge
    }

    pub fn telemetry(&self) -> &BmsTelemetry {
        &self.telemetry
    }

    /// Per-type packet counts and arrival times
    pub fn packet_tracker(&self) -> &PacketTracker {
        &self.tracker
    }

    /// Unframeable bytes seen since the last valid packet
    pub fn unknown_data(&self) -> &[u8] {
        self.unknown.as_slice()
    }

    pub fn clear_unknown_data(&mut self) {
        self.unknown.clear();
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }
}

/// Milliseconds since the previous sample; zero for the first one
fn elapsed_since(last: &mut Option<u64>, now: u64) -> u64 {
    let elapsed = last.map_or(0, |previous| now.saturating_sub(previous));
    *last = Some(now);
    elapsed
}

fn write_byte(sink: &mut ByteSink, lock: &LockFlag, byte: u8, summary: &mut TickSummary) {
    if lock.is_locked() {
        summary.bytes_suppressed += 1;
    } else {
        sink(byte);
        summary.bytes_written += 1;
    }
}
