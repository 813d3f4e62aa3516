//! Outbound Field Overrides

use bms_protocol::layout::PAYLOAD_OFFSET;
use bms_protocol::{packet_type, write_checksum, Packet};

/// Identity fields rewritten on packets relayed to the board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces the battery type byte
    pub battery_type: Option<u8>,
    /// Replaces the BMS serial number
    pub serial_number: Option<u32>,
    /// Replaces the BMS state of charge with the fuel gauge estimate
    pub soc_from_gauge: bool,
}

impl Overrides {
    /// Normalise a battery type override; zero means none
    pub fn battery_type_from(value: Option<u8>) -> Option<u8> {
        value.filter(|&t| t > 0)
    }

    /// Whether any override is active
    pub fn is_active(&self) -> bool {
        self.battery_type.is_some() || self.serial_number.is_some() || self.soc_from_gauge
    }

    /// Copy `packet` into `outbound` with overrides applied and the checksum
    /// fixed. Returns true if any byte changed.
    pub fn apply(&self, packet: &Packet<'_>, gauge_soc: Option<u8>, outbound: &mut Vec<u8>) -> bool {
        outbound.clear();
        outbound.extend_from_slice(packet.as_bytes());

        // Payload sizes are fixed by the type, which `Packet` has validated
        let payload = &mut outbound[PAYLOAD_OFFSET..];
        let changed = match packet.packet_type() {
            packet_type::SERIAL_NUMBER => match self.serial_number {
                Some(serial) => replace(&mut payload[..4], &serial.to_be_bytes()),
                None => false,
            },
            packet_type::BATTERY_TYPE => match self.battery_type {
                Some(battery_type) => replace(&mut payload[..1], &[battery_type]),
                None => false,
            },
            packet_type::STATE_OF_CHARGE => match gauge_soc.filter(|_| self.soc_from_gauge) {
                Some(soc) => replace(&mut payload[..1], &[soc]),
                None => false,
            },
            _ => false,
        };

        if changed {
            write_checksum(outbound);
        }
        changed
    }
}

fn replace(field: &mut [u8], value: &[u8]) -> bool {
    if field == value {
        return false;
    }
    field.copy_from_slice(value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use bms_protocol::encode_frame;

    /// Apply `overrides` to a fresh frame, returning the outbound bytes
    fn rewrite(
        overrides: &Overrides,
        packet_type: u8,
        payload: &[u8],
        gauge_soc: Option<u8>,
    ) -> (bool, Vec<u8>) {
        let frame = encode_frame(packet_type, payload).unwrap();
        let packet = Packet::parse(&frame).unwrap();
        let mut outbound = Vec::new();
        let changed = overrides.apply(&packet, gauge_soc, &mut outbound);
        (changed, outbound)
    }

    #[test]
    fn test_serial_override() {
        let overrides = Overrides {
            serial_number: Some(0xFFAB_CDEF),
            ..Default::default()
        };
        let (changed, outbound) =
            rewrite(&overrides, packet_type::SERIAL_NUMBER, &[0, 0x12, 0xD6, 0x87], None);
        assert!(changed);

        let packet = Packet::parse(&outbound).unwrap();
        assert_eq!(packet.payload(), &[0xFF, 0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn test_battery_type_override() {
        let overrides = Overrides {
            battery_type: Some(4),
            ..Default::default()
        };
        let (changed, outbound) = rewrite(&overrides, packet_type::BATTERY_TYPE, &[1], None);
        assert!(changed);
        assert_eq!(Packet::parse(&outbound).unwrap().payload(), &[4]);

        // Already matching: untouched
        let (changed, outbound) = rewrite(&overrides, packet_type::BATTERY_TYPE, &[4], None);
        assert!(!changed);
        assert_eq!(outbound, encode_frame(packet_type::BATTERY_TYPE, &[4]).unwrap());
    }

    #[test]
    fn test_zero_battery_type_means_none() {
        assert_eq!(Overrides::battery_type_from(Some(0)), None);
        assert_eq!(Overrides::battery_type_from(None), None);
        assert_eq!(Overrides::battery_type_from(Some(3)), Some(3));
    }

    #[test]
    fn test_soc_override_needs_estimate() {
        let overrides = Overrides {
            soc_from_gauge: true,
            ..Default::default()
        };
        let (changed, _) = rewrite(&overrides, packet_type::STATE_OF_CHARGE, &[50], None);
        assert!(!changed);

        let (changed, outbound) = rewrite(&overrides, packet_type::STATE_OF_CHARGE, &[50], Some(73));
        assert!(changed);
        assert_eq!(Packet::parse(&outbound).unwrap().payload(), &[73]);
    }

    #[test]
    fn test_other_types_untouched() {
        let overrides = Overrides {
            battery_type: Some(4),
            serial_number: Some(1),
            soc_from_gauge: true,
        };
        assert!(overrides.is_active());
        let (changed, outbound) = rewrite(&overrides, packet_type::CURRENT, &[0, 9], Some(10));
        assert!(!changed);
        assert_eq!(outbound, encode_frame(packet_type::CURRENT, &[0, 9]).unwrap());
    }

    #[test]
    fn test_default_is_inactive() {
        assert!(!Overrides::default().is_active());
        let soc_only = Overrides {
            soc_from_gauge: true,
            ..Default::default()
        };
        assert!(soc_only.is_active());
    }
}
