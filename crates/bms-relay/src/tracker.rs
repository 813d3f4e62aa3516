//! Per-type Packet Statistics

use bms_protocol::Rejection;
use serde::Serialize;

/// Packet types fit in a nibble on every BMS seen so far
const TRACKED_TYPES: usize = 16;

/// Counters for one packet type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PacketStats {
    /// Packets of this type decoded
    pub count: u64,
    /// Clock reading when the last one arrived (ms)
    pub last_seen_millis: Option<u64>,
    /// Gap between the two most recent packets (ms)
    pub last_interval_millis: Option<u64>,
}

/// What the relay has decoded so far, broken down by packet type
#[derive(Debug, Clone, Default, Serialize)]
pub struct PacketTracker {
    by_type: [PacketStats; TRACKED_TYPES],
    total_packets: u64,
    unknown_bytes: u64,
    checksum_failures: u64,
}

impl PacketTracker {
    pub(crate) fn record_packet(&mut self, packet_type: u8, now_millis: u64) {
        self.total_packets += 1;
        if let Some(stats) = self.by_type.get_mut(packet_type as usize) {
            stats.count += 1;
            stats.last_interval_millis = stats
                .last_seen_millis
                .map(|last| now_millis.saturating_sub(last));
            stats.last_seen_millis = Some(now_millis);
        }
    }

    pub(crate) fn record_unknown(&mut self, bytes: usize, reason: Rejection) {
        self.unknown_bytes += bytes as u64;
        if let Rejection::ChecksumMismatch { .. } = reason {
            self.checksum_failures += 1;
        }
    }

    /// Statistics for one type, if any packet of it was seen
    pub fn stats(&self, packet_type: u8) -> Option<&PacketStats> {
        self.by_type
            .get(packet_type as usize)
            .filter(|stats| stats.count > 0)
    }

    /// Types seen so far with their statistics, in type order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &PacketStats)> + '_ {
        self.by_type
            .iter()
            .enumerate()
            .filter(|(_, stats)| stats.count > 0)
            .map(|(packet_type, stats)| (packet_type as u8, stats))
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    /// Bytes released as unknown data
    pub fn unknown_bytes(&self) -> u64 {
        self.unknown_bytes
    }

    /// Frames dropped for a bad checksum
    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_intervals() {
        let mut tracker = PacketTracker::default();
        tracker.record_packet(5, 100);
        tracker.record_packet(5, 350);
        tracker.record_packet(0, 400);

        let current = tracker.stats(5).unwrap();
        assert_eq!(current.count, 2);
        assert_eq!(current.last_seen_millis, Some(350));
        assert_eq!(current.last_interval_millis, Some(250));

        assert_eq!(tracker.stats(0).unwrap().last_interval_millis, None);
        assert_eq!(tracker.stats(3), None);
        assert_eq!(tracker.total_packets(), 3);

        let seen: Vec<u8> = tracker.iter().map(|(t, _)| t).collect();
        assert_eq!(seen, vec![0, 5]);
    }

    #[test]
    fn test_unknown_and_checksum_failures() {
        let mut tracker = PacketTracker::default();
        tracker.record_unknown(1, Rejection::NoPreamble);
        tracker.record_unknown(
            8,
            Rejection::ChecksumMismatch {
                expected: 1,
                actual: 2,
            },
        );
        assert_eq!(tracker.unknown_bytes(), 9);
        assert_eq!(tracker.checksum_failures(), 1);
    }

    #[test]
    fn test_out_of_range_type_only_counts_total() {
        let mut tracker = PacketTracker::default();
        tracker.record_packet(0x40, 10);
        assert_eq!(tracker.total_packets(), 1);
        assert_eq!(tracker.iter().count(), 0);
    }
}
