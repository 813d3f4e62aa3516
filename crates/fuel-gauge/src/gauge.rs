//! Coulomb Counter Implementation

use crate::error::SnapshotError;
use crate::voltage::soc_from_cell_millivolts;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// Pack capacity assumed when none is configured (mAh)
pub const DEFAULT_CAPACITY_MAH: u32 = 4000;

/// Time constant of the voltage estimate's low-pass filter (ms)
const VOLTAGE_FILTER_MILLIS: f64 = 30_000.0;

/// Persisted gauge state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FuelGaugeState {
    /// Lowest charge observed (mAs)
    pub bottom_milliamp_seconds: f64,
    /// Running charge counter (mAs)
    pub current_milliamp_seconds: f64,
    /// State of charge at the lowest charge (%)
    pub bottom_soc: Option<f64>,
    /// State of charge at the highest charge (%)
    pub top_soc: Option<f64>,
}

impl FuelGaugeState {
    /// Encode for persistence
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Decode a persisted snapshot
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let state: Self = postcard::from_bytes(bytes)?;
        state.validate()?;
        Ok(state)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        if self.bottom_milliamp_seconds > self.current_milliamp_seconds {
            return Err(SnapshotError::Inconsistent {
                bottom: self.bottom_milliamp_seconds,
                current: self.current_milliamp_seconds,
            });
        }
        let consistent = match (self.bottom_soc, self.top_soc) {
            (None, None) => true,
            (Some(bottom), Some(top)) => bottom <= top,
            _ => false,
        };
        if !consistent {
            return Err(SnapshotError::SocBounds {
                bottom_soc: self.bottom_soc,
                top_soc: self.top_soc,
            });
        }
        Ok(())
    }
}

/// Coulomb-counting fuel gauge.
///
/// Positive current charges the battery. The gauge never reads a clock;
/// callers pass the elapsed time with every sample.
///
/// Until the first usable cell voltage arrives the gauge only counts charge.
/// That reading anchors the charge scale to a state of charge; from then on
/// the estimate follows the counted charge and the pack capacity, and the
/// SOC bounds are the estimate at the lowest and highest charge seen. The
/// top charge bound is derived from `top_soc`, so a restored snapshot keeps
/// the same estimate.
#[derive(Debug, Clone)]
pub struct FuelGauge {
    state: FuelGaugeState,
    milliamp_seconds_per_percent: f64,
    /// Highest charge observed while no SOC anchor exists (mAs)
    unanchored_top: f64,
    /// Low-pass filtered SOC implied by the lowest cell voltage
    voltage_soc: Option<f64>,
    /// Most recent SOC reported by the BMS
    reported_soc: Option<u8>,
    charging: bool,
    /// Charge removed since start (mAs)
    discharged: f64,
    /// Charge added since start (mAs)
    recharged: f64,
}

impl Default for FuelGauge {
    fn default() -> Self {
        Self::with_capacity_mah(DEFAULT_CAPACITY_MAH)
    }
}

impl FuelGauge {
    /// Create an empty gauge for a pack of the default capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty gauge for a pack of `capacity_mah`
    pub fn with_capacity_mah(capacity_mah: u32) -> Self {
        let capacity = f64::from(capacity_mah.max(1));
        Self {
            state: FuelGaugeState::default(),
            milliamp_seconds_per_percent: capacity * 3600.0 / 100.0,
            unanchored_top: 0.0,
            voltage_soc: None,
            reported_soc: None,
            charging: false,
            discharged: 0.0,
            recharged: 0.0,
        }
    }

    /// Pack capacity the charge scale is based on (mAh)
    pub fn capacity_mah(&self) -> f64 {
        self.milliamp_seconds_per_percent * 100.0 / 3600.0
    }

    /// Integrate one current sample over `elapsed_millis`
    pub fn update(&mut self, current_milliamps: i32, elapsed_millis: u64) {
        let delta = f64::from(current_milliamps) * elapsed_millis as f64 / 1000.0;
        if delta < 0.0 {
            self.discharged -= delta;
        } else {
            self.recharged += delta;
        }

        let charge = self.state.current_milliamp_seconds + delta;
        if charge < self.state.bottom_milliamp_seconds {
            if let Some(soc) = self.soc_at(charge) {
                self.state.bottom_soc = Some(soc);
            }
            self.state.bottom_milliamp_seconds = charge;
            debug!("Fuel gauge bottom widened to {:.1} mAs", charge);
        }
        self.state.current_milliamp_seconds = charge;

        if charge > self.top_milliamp_seconds() {
            match self.soc_at(charge) {
                Some(soc) => self.state.top_soc = Some(soc),
                None => self.unanchored_top = charge,
            }
            debug!("Fuel gauge top widened to {:.1} mAs", charge);
        }
    }

    /// Feed the lowest cell voltage, `elapsed_millis` after the previous one.
    ///
    /// Ignored while charging, when cell voltage reads high. The first
    /// reading anchors the charge scale.
    pub fn update_voltage(&mut self, min_cell_millivolts: u16, elapsed_millis: u64) {
        if self.charging {
            trace!("Ignoring cell voltage while charging");
            return;
        }

        let sample = soc_from_cell_millivolts(min_cell_millivolts);
        let filtered = match self.voltage_soc {
            Some(previous) => {
                let elapsed = elapsed_millis as f64;
                previous + (sample - previous) * elapsed / (VOLTAGE_FILTER_MILLIS + elapsed)
            }
            None => sample,
        };
        self.voltage_soc = Some(filtered);

        if self.state.bottom_soc.is_none() {
            self.anchor(filtered);
        }
    }

    /// Record whether the charger is connected
    pub fn update_charging_status(&mut self, charging: bool) {
        if charging != self.charging {
            debug!("Fuel gauge charging: {}", charging);
        }
        self.charging = charging;
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }

    /// Record the SOC most recently reported by the BMS
    pub fn observe_reported_soc(&mut self, percent: u8) {
        self.reported_soc = Some(percent.min(100));
    }

    /// Label both bounds so that the current charge sits at `soc`
    fn anchor(&mut self, soc: f64) {
        let scale = self.milliamp_seconds_per_percent;
        let state = &mut self.state;
        state.bottom_soc =
            Some(soc - (state.current_milliamp_seconds - state.bottom_milliamp_seconds) / scale);
        state.top_soc = Some(soc + (self.unanchored_top - state.current_milliamp_seconds) / scale);
        info!("Fuel gauge anchored at {:.1}%", soc);
    }

    /// Estimated SOC at `charge` on the anchored scale
    fn soc_at(&self, charge: f64) -> Option<f64> {
        let state = &self.state;
        state.bottom_soc.map(|bottom_soc| {
            bottom_soc + (charge - state.bottom_milliamp_seconds) / self.milliamp_seconds_per_percent
        })
    }

    /// Snapshot for persistence
    pub fn state(&self) -> FuelGaugeState {
        self.state
    }

    /// Replace the whole state with a persisted snapshot. The estimate carries
    /// over when the snapshot came from a gauge of the same capacity.
    pub fn restore_state(&mut self, state: FuelGaugeState) {
        debug!("Restoring fuel gauge state: {:?}", state);
        self.state = state;
        self.unanchored_top = state.current_milliamp_seconds;
    }

    /// Whether a cell voltage reading has anchored the charge scale
    pub fn is_anchored(&self) -> bool {
        self.state.bottom_soc.is_some()
    }

    /// Highest charge observed (mAs)
    pub fn top_milliamp_seconds(&self) -> f64 {
        match (self.state.bottom_soc, self.state.top_soc) {
            (Some(bottom_soc), Some(top_soc)) => {
                self.state.bottom_milliamp_seconds
                    + (top_soc - bottom_soc) * self.milliamp_seconds_per_percent
            }
            _ => self.unanchored_top,
        }
    }

    /// Charge removed since start (mAs)
    pub fn milliamp_seconds_discharged(&self) -> f64 {
        self.discharged
    }

    /// Charge added since start (mAs)
    pub fn milliamp_seconds_recharged(&self) -> f64 {
        self.recharged
    }

    /// Charge used this ride (mAh)
    pub fn used_charge_mah(&self) -> f64 {
        self.discharged / 3600.0
    }

    /// Charge regenerated this ride (mAh)
    pub fn regenerated_charge_mah(&self) -> f64 {
        self.recharged / 3600.0
    }

    /// Filtered SOC implied by cell voltage alone
    pub fn voltage_soc_percent(&self) -> Option<u8> {
        self.voltage_soc.map(percent)
    }

    /// Estimated state of charge in percent.
    ///
    /// Follows the counted charge once anchored; otherwise falls back to the
    /// BMS-reported value.
    pub fn soc_percent(&self) -> Option<u8> {
        match self.soc_at(self.state.current_milliamp_seconds) {
            Some(soc) => Some(percent(soc)),
            None => self.reported_soc,
        }
    }
}

fn percent(soc: f64) -> u8 {
    soc.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Drive the charge counter through the given absolute values (mAs)
    fn walk(gauge: &mut FuelGauge, values: &[f64]) {
        for &target in values {
            let delta = target - gauge.state().current_milliamp_seconds;
            gauge.update(delta as i32, 1000);
        }
    }

    /// One amp-hour in mAs
    const AMP_HOUR: f64 = 3_600_000.0;

    #[test]
    fn test_uninitialized_gauge() {
        let gauge = FuelGauge::new();
        assert_eq!(gauge.state(), FuelGaugeState::default());
        assert_eq!(gauge.soc_percent(), None);
        assert!(!gauge.is_anchored());
        assert_eq!(gauge.milliamp_seconds_discharged(), 0.0);
        assert_eq!(gauge.milliamp_seconds_recharged(), 0.0);
        assert_eq!(gauge.capacity_mah(), 4000.0);
    }

    #[test]
    fn test_accumulation_is_linear() {
        let mut gauge = FuelGauge::new();
        gauge.update(1000, 1000);
        let once = gauge.state().current_milliamp_seconds;
        gauge.update(1000, 1000);
        assert_eq!(once, 1000.0);
        assert_eq!(gauge.state().current_milliamp_seconds, 2.0 * once);
    }

    #[test]
    fn test_bounds_only_widen() {
        let mut gauge = FuelGauge::new();
        walk(&mut gauge, &[5.0, -3.0, 10.0]);
        let before = gauge.state();
        let top_before = gauge.top_milliamp_seconds();

        walk(&mut gauge, &[-3.0]);
        let after = gauge.state();

        assert!(after.bottom_milliamp_seconds <= -3.0);
        assert!(gauge.top_milliamp_seconds() >= 10.0);
        assert_eq!(after.bottom_milliamp_seconds, before.bottom_milliamp_seconds);
        assert_eq!(gauge.top_milliamp_seconds(), top_before);
        assert_eq!(after.current_milliamp_seconds, -3.0);
    }

    #[test]
    fn test_ride_totals_track_sign() {
        let mut gauge = FuelGauge::new();
        gauge.update(-1000, 123);
        assert_eq!(gauge.milliamp_seconds_discharged(), 123.0);
        assert_eq!(gauge.milliamp_seconds_recharged(), 0.0);
        gauge.update(1000, 333);
        assert_eq!(gauge.milliamp_seconds_recharged(), 333.0);
        assert_eq!(gauge.milliamp_seconds_discharged(), 123.0);
    }

    #[test]
    fn test_first_voltage_sets_soc_and_survives_restore() {
        let mut gauge = FuelGauge::new();
        gauge.update_voltage(3800, 0);
        assert_eq!(gauge.soc_percent(), Some(53));

        let state = gauge.state();
        let mut restored = FuelGauge::new();
        restored.restore_state(state);
        assert_eq!(restored.soc_percent(), Some(53));
    }

    #[test]
    fn test_charge_then_discharge_across_restore() {
        let mut gauge = FuelGauge::new();
        gauge.update_voltage(3400, 0);
        assert_eq!(gauge.soc_percent(), Some(18));

        // 2 A for an hour; voltage no longer moves the estimate
        for _ in 0..36_000 {
            gauge.update(2000, 100);
            gauge.update_voltage(3908, 100);
        }
        assert_eq!(gauge.soc_percent(), Some(68));
        assert_eq!(gauge.milliamp_seconds_recharged(), 2.0 * AMP_HOUR);
        assert_eq!(gauge.milliamp_seconds_discharged(), 0.0);

        let mut gauge = {
            let mut restored = FuelGauge::new();
            restored.restore_state(gauge.state());
            restored
        };
        assert_eq!(gauge.soc_percent(), Some(68));

        // 6 A for ten minutes
        for _ in 0..6_000 {
            gauge.update(-6000, 100);
            gauge.update_voltage(3908, 100);
        }
        assert_eq!(gauge.soc_percent(), Some(43));
        assert_eq!(gauge.milliamp_seconds_discharged(), AMP_HOUR);
        assert_eq!(gauge.milliamp_seconds_recharged(), 0.0);
    }

    #[test]
    fn test_restore_mid_range_keeps_estimate() {
        let mut gauge = FuelGauge::new();
        gauge.update_voltage(3800, 0); // 53%
        walk(&mut gauge, &[-AMP_HOUR, AMP_HOUR, 0.0]);
        assert_eq!(gauge.soc_percent(), Some(53));
        assert_eq!(gauge.state().bottom_soc.map(percent), Some(28));
        assert_eq!(gauge.state().top_soc.map(percent), Some(78));

        let mut restored = FuelGauge::new();
        restored.restore_state(gauge.state());
        assert_eq!(restored.soc_percent(), gauge.soc_percent());
        assert!((restored.top_milliamp_seconds() - AMP_HOUR).abs() < 1e-6);

        // Both keep tracking the same charge afterwards
        gauge.update(-1000, 108_000);
        restored.update(-1000, 108_000);
        assert_eq!(restored.soc_percent(), gauge.soc_percent());
        assert_eq!(restored.soc_percent(), Some(52));
    }

    #[test]
    fn test_charging_blocks_voltage_anchor() {
        let mut gauge = FuelGauge::new();
        gauge.observe_reported_soc(64);
        gauge.update_charging_status(true);
        gauge.update_voltage(4100, 0);
        assert!(!gauge.is_anchored());
        assert_eq!(gauge.voltage_soc_percent(), None);
        assert_eq!(gauge.soc_percent(), Some(64));

        gauge.update_charging_status(false);
        gauge.update_voltage(3600, 0);
        assert!(gauge.is_anchored());
        assert_eq!(gauge.soc_percent(), Some(36));
    }

    #[test]
    fn test_voltage_filter_settles() {
        let mut gauge = FuelGauge::new();
        gauge.update_voltage(3400, 0);
        gauge.update_voltage(3800, 1000);
        let early = gauge.voltage_soc_percent().unwrap();
        assert!(early > 18 && early < 53, "early = {}", early);

        for _ in 0..600 {
            gauge.update_voltage(3800, 1000);
        }
        assert_eq!(gauge.voltage_soc_percent(), Some(53));
        // The anchor came from the first reading
        assert_eq!(gauge.soc_percent(), Some(18));
    }

    #[test]
    fn test_anchor_labels_prior_history() {
        let mut gauge = FuelGauge::new();
        walk(&mut gauge, &[-AMP_HOUR, 0.0]);
        gauge.update_voltage(3800, 0);
        let state = gauge.state();
        assert_eq!(state.bottom_soc.map(percent), Some(28));
        assert_eq!(state.top_soc.map(percent), Some(53));
    }

    #[test]
    fn test_soc_falls_back_to_reported() {
        let mut gauge = FuelGauge::new();
        gauge.observe_reported_soc(42);
        assert_eq!(gauge.soc_percent(), Some(42));
    }

    #[test]
    fn test_capacity_scales_estimate() {
        let mut gauge = FuelGauge::with_capacity_mah(2000);
        gauge.update_voltage(3800, 0);
        gauge.update(-1000, 360_000); // 100 mAh = 5%
        assert_eq!(gauge.soc_percent(), Some(48));
    }

    #[test]
    fn test_restore_state_exact() {
        let snapshot = FuelGaugeState {
            bottom_milliamp_seconds: -12_345.5,
            current_milliamp_seconds: 678.25,
            bottom_soc: Some(12.0),
            top_soc: Some(97.0),
        };
        let mut gauge = FuelGauge::new();
        gauge.update(5000, 100);
        gauge.restore_state(snapshot);
        assert_eq!(gauge.state(), snapshot);
    }

    #[test]
    fn test_snapshot_bytes() {
        let snapshot = FuelGaugeState {
            bottom_milliamp_seconds: -100.0,
            current_milliamp_seconds: 50.0,
            bottom_soc: Some(40.5),
            top_soc: Some(88.0),
        };
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(FuelGaugeState::from_bytes(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(matches!(
            FuelGaugeState::from_bytes(&[0x01]),
            Err(SnapshotError::Corrupt(_))
        ));

        let inverted = FuelGaugeState {
            bottom_milliamp_seconds: 10.0,
            current_milliamp_seconds: 0.0,
            ..Default::default()
        };
        let bytes = inverted.to_bytes().unwrap();
        assert!(matches!(
            FuelGaugeState::from_bytes(&bytes),
            Err(SnapshotError::Inconsistent { .. })
        ));

        let half_labelled = FuelGaugeState {
            bottom_soc: Some(10.0),
            ..Default::default()
        };
        let bytes = half_labelled.to_bytes().unwrap();
        assert!(matches!(
            FuelGaugeState::from_bytes(&bytes),
            Err(SnapshotError::SocBounds { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_bounds_contain_history(
            samples in proptest::collection::vec((-20_000i32..20_000, 0u64..2_000), 1..200)
        ) {
            let mut gauge = FuelGauge::new();
            let mut prev_bottom = 0.0;
            let mut prev_top = 0.0;
            for (current, elapsed) in samples {
                gauge.update(current, elapsed);
                let state = gauge.state();
                prop_assert!(state.bottom_milliamp_seconds <= prev_bottom);
                prop_assert!(gauge.top_milliamp_seconds() >= prev_top);
                prop_assert!(state.bottom_milliamp_seconds <= state.current_milliamp_seconds);
                prop_assert!(state.current_milliamp_seconds <= gauge.top_milliamp_seconds());
                prev_bottom = state.bottom_milliamp_seconds;
                prev_top = gauge.top_milliamp_seconds();
            }
        }

        #[test]
        fn prop_restore_is_seamless(
            millivolts in 3000u16..4200,
            before in proptest::collection::vec((-20_000i32..20_000, 0u64..60_000), 0..100),
            after in proptest::collection::vec((-20_000i32..20_000, 0u64..60_000), 0..100),
        ) {
            let mut gauge = FuelGauge::new();
            gauge.update_voltage(millivolts, 0);
            for &(current, elapsed) in &before {
                gauge.update(current, elapsed);
            }

            let mut restored = FuelGauge::new();
            restored.restore_state(gauge.state());
            prop_assert_eq!(restored.soc_percent(), gauge.soc_percent());

            for &(current, elapsed) in &after {
                gauge.update(current, elapsed);
                restored.update(current, elapsed);
                prop_assert_eq!(restored.soc_percent(), gauge.soc_percent());
            }
        }
    }
}
