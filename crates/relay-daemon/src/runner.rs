//! Relay Loop

use crate::error::DaemonError;
use crate::monitor::TracingMonitor;
use crate::settings::RelaySettings;
use crate::state::{load_gauge_state, save_gauge_state};
use crate::transport::{open_port, ChunkedReader, SharedWriter};
use bms_relay::{
    BmsRelay, FuelGauge, LockFlag, MillisClock, PacketStreamer, UnknownDataStreamer,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Clock counting milliseconds since it was created
pub fn monotonic_clock() -> MillisClock {
    let start = Instant::now();
    Box::new(move || start.elapsed().as_millis() as u64)
}

/// Apply overrides and restore the fuel gauge from disk
pub fn configure(relay: &mut BmsRelay, settings: &RelaySettings) {
    *relay.fuel_gauge_mut() = FuelGauge::with_capacity_mah(settings.battery_capacity_mah);
    relay.set_battery_type_override(settings.battery_type_override);
    relay.set_serial_number_override(settings.serial_override);
    relay.set_soc_override(settings.override_soc);
    relay.add_received_packet_listener(PacketStreamer::new(TracingMonitor::new("packet")));
    relay.set_unknown_data_listener(UnknownDataStreamer::new(TracingMonitor::new("unknown")));

    match load_gauge_state(&settings.state_file) {
        Ok(Some(state)) => relay.fuel_gauge_mut().restore_state(state),
        Ok(None) => info!("No fuel gauge state at {}", settings.state_file.display()),
        // A bad snapshot must not keep the board from getting BMS data
        Err(e) => warn!("Ignoring fuel gauge state: {}", e),
    }
}

/// Tick the relay every `period` until `shutdown` resolves.
///
/// `after_tick` runs after every tick (used to flush the serial writer).
/// Returns the number of ticks performed.
pub async fn drive<F, A>(
    relay: &mut BmsRelay,
    period: Duration,
    status_period: Duration,
    mut after_tick: A,
    shutdown: F,
) -> u64
where
    F: Future,
    A: FnMut(),
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut status = time::interval_at(Instant::now() + status_period, status_period);
    status.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let summary = relay.tick();
                after_tick();
                ticks += 1;
                if summary.bytes_read > 0 {
                    debug!(
                        read = summary.bytes_read,
                        packets = summary.packets,
                        unknown = summary.unknown_bytes,
                        suppressed = summary.bytes_suppressed,
                        "Relay tick"
                    );
                }
            }
            _ = status.tick() => log_status(relay),
        }
    }
    ticks
}

fn log_status(relay: &BmsRelay) {
    let gauge = relay.fuel_gauge();
    let tracker = relay.packet_tracker();
    match serde_json::to_string(relay.telemetry()) {
        Ok(json) => info!(
            locked = relay.is_locked(),
            soc = ?gauge.soc_percent(),
            voltage_soc = ?gauge.voltage_soc_percent(),
            used_mah = gauge.used_charge_mah(),
            regen_mah = gauge.regenerated_charge_mah(),
            packets = tracker.total_packets(),
            checksum_failures = tracker.checksum_failures(),
            "Telemetry {}",
            json
        ),
        Err(e) => warn!("Failed to encode telemetry: {}", e),
    }
    for (packet_type, stats) in tracker.iter() {
        debug!(
            packet_type,
            count = stats.count,
            interval_ms = ?stats.last_interval_millis,
            "Packet stats"
        );
    }
}

/// Run the relay on the configured serial port until Ctrl-C
pub async fn run(settings: RelaySettings) -> Result<(), DaemonError> {
    let port = open_port(&settings.serial_device, settings.baud_rate)?;
    let writer = SharedWriter::new(port.try_clone()?);
    let lock = LockFlag::new(settings.is_locked);

    let mut relay = BmsRelay::new(
        ChunkedReader::new(port).into_source(),
        writer.sink(),
        monotonic_clock(),
        lock,
    );
    configure(&mut relay, &settings);
    info!(
        locked = relay.is_locked(),
        soc_override = settings.override_soc,
        "Relay started"
    );

    let flush = || {
        if let Err(e) = writer.flush() {
            warn!("Serial flush failed: {}", e);
        }
    };
    let ticks = drive(
        &mut relay,
        Duration::from_millis(settings.tick_interval_ms),
        Duration::from_secs(settings.status_interval_secs),
        flush,
        tokio::signal::ctrl_c(),
    )
    .await;
    info!("Relay stopped after {} ticks", ticks);

    if settings.save_state_on_shutdown {
        save_gauge_state(&settings.state_file, &relay.fuel_gauge().state())?;
    }
    Ok(())
}
