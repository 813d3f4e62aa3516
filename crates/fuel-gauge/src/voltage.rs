//! Open-circuit Voltage to State of Charge

/// Resting cell voltage (mV) against state of charge (%), ascending.
/// Linear between points, clamped outside.
const CELL_CURVE: [(u16, f64); 13] = [
    (3000, 0.0),
    (3100, 2.0),
    (3200, 5.0),
    (3300, 11.0),
    (3400, 18.0),
    (3500, 27.0),
    (3600, 36.0),
    (3700, 44.0),
    (3800, 53.0),
    (3900, 67.0),
    (4000, 80.0),
    (4100, 91.0),
    (4200, 100.0),
];

/// State of charge implied by the lowest cell voltage
pub fn soc_from_cell_millivolts(millivolts: u16) -> f64 {
    let (first_mv, first_soc) = CELL_CURVE[0];
    if millivolts <= first_mv {
        return first_soc;
    }
    for pair in CELL_CURVE.windows(2) {
        let ((lo_mv, lo_soc), (hi_mv, hi_soc)) = (pair[0], pair[1]);
        if millivolts <= hi_mv {
            let fraction = f64::from(millivolts - lo_mv) / f64::from(hi_mv - lo_mv);
            return lo_soc + fraction * (hi_soc - lo_soc);
        }
    }
    100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_points() {
        assert_eq!(soc_from_cell_millivolts(3400), 18.0);
        assert_eq!(soc_from_cell_millivolts(3800), 53.0);
        assert_eq!(soc_from_cell_millivolts(3908).round(), 68.0);
    }

    #[test]
    fn test_curve_clamps() {
        assert_eq!(soc_from_cell_millivolts(0), 0.0);
        assert_eq!(soc_from_cell_millivolts(2500), 0.0);
        assert_eq!(soc_from_cell_millivolts(4350), 100.0);
    }

    #[test]
    fn test_curve_is_monotonic() {
        let mut previous = 0.0;
        for mv in (2900..=4300).step_by(5) {
            let soc = soc_from_cell_millivolts(mv);
            assert!(soc >= previous, "{} mV -> {}", mv, soc);
            previous = soc;
        }
    }
}
