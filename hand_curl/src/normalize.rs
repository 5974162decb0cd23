//! Raw metric → `[0, 1]` using a channel's calibration range.
//!
//! 0.0 is fully open, 1.0 fully closed (or fully rotated for the thumb
//! rotation channel).  A channel without a usable range reads 0.0 so an
//! uncalibrated hand sits open instead of twitching on garbage.

use crate::calibration::{CalibrationRange, CalibrationSet};
use crate::channel::{NormalizedValues, RawMetrics};

/// Rescale `raw` into `range` and clamp.
pub fn normalize(raw: f32, range: &CalibrationRange) -> f32 {
    let Some((min, max)) = range.bounds() else {
        return 0.0;
    };
    if min == max {
        return 0.0;
    }
    let t = ((raw - min) / (max - min)).clamp(0.0, 1.0);
    if t.is_nan() {
        0.0
    } else {
        t
    }
}

/// [`normalize`] every channel against its own range.
pub fn normalize_all(raw: &RawMetrics, calibration: &CalibrationSet) -> NormalizedValues {
    raw.map(|channel, value| normalize(value, calibration.range(channel)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::BoundKind;
    use crate::channel::Channel;
    use proptest::prelude::*;

    fn range(min: f32, max: f32) -> CalibrationRange {
        CalibrationRange::new(Some(min), Some(max))
    }

    #[test]
    fn midpoint() {
        assert!((normalize(0.2, &range(0.1, 0.3)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn endpoints_exact() {
        let r = range(0.7, 1.9);
        assert_eq!(normalize(0.7, &r), 0.0);
        assert_eq!(normalize(1.9, &r), 1.0);
    }

    #[test]
    fn clamped_outside_range() {
        let r = range(1.0, 2.0);
        assert_eq!(normalize(0.2, &r), 0.0);
        assert_eq!(normalize(7.0, &r), 1.0);
    }

    #[test]
    fn incomplete_or_degenerate_is_zero() {
        assert_eq!(normalize(1.0, &CalibrationRange::default()), 0.0);
        assert_eq!(normalize(1.0, &CalibrationRange::new(Some(0.5), None)), 0.0);
        assert_eq!(normalize(1.0, &CalibrationRange::new(None, Some(2.0))), 0.0);
        assert_eq!(normalize(1.0, &range(1.5, 1.5)), 0.0);
    }

    #[test]
    fn nan_raw_is_zero() {
        assert_eq!(normalize(f32::NAN, &range(0.0, 1.0)), 0.0);
    }

    #[test]
    fn all_channels_use_own_range() {
        let mut cal = CalibrationSet::new();
        cal.record(Channel::Index, BoundKind::Min, 0.1);
        cal.record(Channel::Index, BoundKind::Max, 0.3);
        let raw = RawMetrics::splat(0.2);
        let n = normalize_all(&raw, &cal);
        assert!((n[Channel::Index] - 0.5).abs() < 1e-6);
        assert_eq!(n[Channel::Thumb], 0.0);
        assert_eq!(n[Channel::ThumbRotation], 0.0);
    }

    proptest! {
        #[test]
        fn output_in_unit_interval(raw in -100.0f32..100.0, a in 0.0f32..10.0, b in 0.0f32..10.0) {
            let n = normalize(raw, &range(a, b));
            prop_assert!((0.0..=1.0).contains(&n));
        }

        #[test]
        fn monotonic_in_raw(x in 0.0f32..5.0, dx in 0.0f32..5.0, min in 0.0f32..2.0, span in 0.01f32..3.0) {
            let r = range(min, min + span);
            prop_assert!(normalize(x, &r) <= normalize(x + dx, &r));
        }

        #[test]
        fn deterministic(raw in 0.0f32..5.0, min in 0.0f32..2.0, span in 0.0f32..3.0) {
            let r = range(min, min + span);
            prop_assert_eq!(normalize(raw, &r).to_bits(), normalize(raw, &r).to_bits());
        }
    }
}
