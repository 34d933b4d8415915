//! Scalar numeric helpers shared by layout and sampling.

/// Default time tolerance: two times within this of each other are treated
/// as equal during layout comparisons.
pub const DEFAULT_TIME_TOLERANCE: f64 = 1e-12;

/// Default amplitude tolerance: pulses whose merged amplitude magnitude
/// falls below this are pruned before sampling.
pub const DEFAULT_AMP_TOLERANCE: f64 = 0.1 / 65536.0;

/// True if `a` and `b` are within `tolerance` of each other.
#[inline]
pub fn nearly_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Clamp `value` into `[lo, hi]`. Unlike `f64::clamp`, tolerates `lo > hi`
/// by treating the range as a single point at `lo` (callers are expected to
/// have already rejected `min > max` as invalid input; this is a last line
/// of defense against floating-point roundoff at the boundary).
#[inline]
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi {
        lo
    } else {
        value.max(lo).min(hi)
    }
}

/// Durations shorter than `tolerance` truncate to zero.
#[inline]
pub fn truncate_duration(duration: f64, tolerance: f64) -> f64 {
    if duration.abs() < tolerance {
        0.0
    } else {
        duration
    }
}

/// Snap `t` to the nearest multiple of `2^align_level / sample_rate`.
#[inline]
pub fn snap(t: f64, sample_rate: f64, align_level: i32) -> f64 {
    let grid = 2f64.powi(align_level) / sample_rate;
    (t / grid).round() * grid
}

/// Order `a` against `b`, treating values within `tolerance` as equal. Gives
/// layout comparisons a consistent, drift-tolerant total order.
#[inline]
pub fn tolerant_cmp(a: f64, b: f64, tolerance: f64) -> core::cmp::Ordering {
    if nearly_eq(a, b, tolerance) {
        core::cmp::Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(core::cmp::Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_rounds_to_grid() {
        let sample_rate = 2e9;
        let grid = 2f64.powi(-10) / sample_rate;
        let t = 3.3 * grid;
        assert!(nearly_eq(snap(t, sample_rate, -10), 3.0 * grid, 1e-20));
    }

    #[test]
    fn truncate_duration_zeros_small_values() {
        assert_eq!(truncate_duration(1e-13, DEFAULT_TIME_TOLERANCE), 0.0);
        assert_eq!(truncate_duration(1e-9, DEFAULT_TIME_TOLERANCE), 1e-9);
    }

    #[test]
    fn tolerant_cmp_treats_close_values_as_equal() {
        assert_eq!(
            tolerant_cmp(1.0, 1.0 + 1e-13, DEFAULT_TIME_TOLERANCE),
            core::cmp::Ordering::Equal
        );
        assert_eq!(
            tolerant_cmp(1.0, 1.1, DEFAULT_TIME_TOLERANCE),
            core::cmp::Ordering::Less
        );
    }
}
