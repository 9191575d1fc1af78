//! Metric normalization
//!
//! Instrumentation reports the same logical signal under several names and in
//! several units (fractions, percentages, raw depths). These helpers bring a raw
//! value onto a comparable unit interval before it is weighted.

use std::collections::BTreeMap;

/// Lower bound of the percent scale
const PERCENT_MIN: f64 = 0.0;

/// Upper bound of the percent scale
const PERCENT_MAX: f64 = 100.0;

/// Return the first present, finite value among `aliases`, in order.
///
/// A missing alias and a non-finite value are treated the same way: the lookup
/// moves on to the next alias. `None` means no alias yielded a usable value.
pub fn resolve(metrics: &BTreeMap<String, f64>, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|key| metrics.get(*key).copied())
        .find(|value| value.is_finite())
}

/// Linearly rescale `value` from `[min, max]` to `[0, 1]`, clamped.
///
/// Returns 0 when the value is absent or non-finite, and when `max <= min`.
pub fn to_unit_interval(min: f64, max: f64, value: Option<f64>) -> f64 {
    let value = match value {
        Some(v) if v.is_finite() => v,
        _ => return 0.0,
    };

    if max <= min {
        return 0.0;
    }

    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Heuristic unit detection for percent-like signals.
///
/// Values `<= 1.0` are fractions and get scaled by 100, anything above is
/// already a percentage.
pub fn to_percent_scale(value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() => Some(if v <= 1.0 { v * 100.0 } else { v }),
        _ => None,
    }
}

/// Percentage to unit interval (`0..=100` → `0..=1`)
pub fn percent_to_unit(percent: Option<f64>) -> f64 {
    to_unit_interval(PERCENT_MIN, PERCENT_MAX, percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_resolve_first_alias_wins() {
        let m = metrics(&[("queue_pressure", 40.0), ("queuePressure", 70.0)]);
        assert_eq!(resolve(&m, &["queuePressure", "queue_pressure"]), Some(70.0));
    }

    #[test]
    fn test_resolve_skips_non_finite() {
        let m = metrics(&[
            ("lockWait", f64::NAN),
            ("lock_wait", f64::INFINITY),
            ("lockWaitRatio", 0.4),
        ]);
        assert_eq!(
            resolve(&m, &["lockWait", "lock_wait", "lockWaitRatio"]),
            Some(0.4)
        );
    }

    #[test]
    fn test_resolve_absent() {
        let m = metrics(&[("cpuUtil", f64::NEG_INFINITY)]);
        assert_eq!(resolve(&m, &["cpuUtil", "cpu_util"]), None);
        assert_eq!(resolve(&BTreeMap::new(), &["cpuUtil"]), None);
    }

    #[test]
    fn test_unit_interval_bounds() {
        assert_eq!(to_unit_interval(0.0, 100.0, Some(50.0)), 0.5);
        assert_eq!(to_unit_interval(0.0, 100.0, Some(-20.0)), 0.0);
        assert_eq!(to_unit_interval(0.0, 100.0, Some(250.0)), 1.0);
        assert_eq!(to_unit_interval(10.0, 300.0, Some(300.0)), 1.0);
        assert_eq!(to_unit_interval(10.0, 300.0, Some(10.0)), 0.0);
    }

    #[test]
    fn test_unit_interval_degenerate() {
        assert_eq!(to_unit_interval(0.0, 100.0, None), 0.0);
        assert_eq!(to_unit_interval(0.0, 100.0, Some(f64::NAN)), 0.0);
        assert_eq!(to_unit_interval(0.0, 100.0, Some(f64::INFINITY)), 0.0);
        assert_eq!(to_unit_interval(5.0, 5.0, Some(5.0)), 0.0);
        assert_eq!(to_unit_interval(10.0, 1.0, Some(5.0)), 0.0);
    }

    #[test]
    fn test_unit_interval_monotonic() {
        let mut previous = 0.0;
        let mut value = -50.0;

        while value <= 400.0 {
            let current = to_unit_interval(10.0, 300.0, Some(value));
            assert!((0.0..=1.0).contains(&current));
            assert!(current >= previous, "not monotonic at {value}");
            previous = current;
            value += 3.7;
        }
    }

    #[test]
    fn test_percent_scale() {
        assert_eq!(to_percent_scale(Some(0.8)), Some(80.0));
        assert_eq!(to_percent_scale(Some(1.0)), Some(100.0));
        assert_eq!(to_percent_scale(Some(45.0)), Some(45.0));
        assert_eq!(to_percent_scale(Some(f64::NAN)), None);
        assert_eq!(to_percent_scale(None), None);
    }

    #[test]
    fn test_percent_to_unit() {
        assert_eq!(percent_to_unit(Some(80.0)), 0.8);
        assert_eq!(percent_to_unit(Some(100.0)), 1.0);
        assert_eq!(percent_to_unit(None), 0.0);
    }
}
