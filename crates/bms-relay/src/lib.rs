//! BMS Relay
//!
//! Sits between the BMS and the board controller. Every byte from the BMS is
//! decoded, counted and passed on (unless the lock flag is set), with a few
//! identity fields optionally rewritten on the way.

mod listener;
mod lock;
mod monitor;
mod overrides;
mod relay;
mod telemetry;
mod tracker;
mod unknown;

pub use listener::{PacketListener, UnknownDataListener};
pub use lock::LockFlag;
pub use monitor::{ActivityBlinker, MonitorSink, PacketStreamer, UnknownDataStreamer};
pub use overrides::Overrides;
pub use relay::{BmsRelay, ByteSink, ByteSource, MillisClock, TickSummary};
pub use telemetry::BmsTelemetry;
pub use tracker::{PacketStats, PacketTracker};
pub use unknown::{UnknownByteBuffer, UNKNOWN_DATA_CAPACITY};

pub use bms_protocol::Packet;
pub use fuel_gauge::{FuelGauge, FuelGaugeState, DEFAULT_CAPACITY_MAH};
