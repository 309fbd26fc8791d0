//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;
use std::time::Duration;

/// Integer percentage `part / whole`, rounded half-up. Returns 0 when `whole` is 0.
#[must_use]
pub fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = cast::<usize, u128>(part.min(whole)).unwrap_or(0);
    let whole = cast::<usize, u128>(whole).unwrap_or(1);
    let pct = (part * 200 + whole) / (whole * 2);
    cast::<u128, u32>(pct).unwrap_or(100)
}

/// Fraction of `total` still remaining, clamped to `0.0..=1.0`.
/// A zero-length total reads as empty.
#[must_use]
pub fn remaining_fraction(remaining: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 0.0;
    }
    let ratio = remaining.as_secs_f64() / total.as_secs_f64();
    clamp_f64_to_f32(ratio.clamp(0.0, 1.0))
}

/// Clamp a f64 to the f32 range and downcast, returning 0.0 for non-finite values.
#[must_use]
pub fn clamp_f64_to_f32(value: f64) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let min = cast::<f32, f64>(f32::MIN).unwrap_or(f64::MIN);
    let max = cast::<f32, f64>(f32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max);
    cast::<f64, f32>(clamped).unwrap_or(0.0)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(rounded_percent(0, 0), 0);
        assert_eq!(rounded_percent(3, 4), 75);
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(1, 200), 1);
        assert_eq!(rounded_percent(5, 5), 100);
        assert_eq!(rounded_percent(9, 5), 100);
    }

    #[test]
    fn fraction_clamps_and_handles_zero_total() {
        let total = Duration::from_secs(4);
        assert!((remaining_fraction(Duration::from_secs(1), total) - 0.25).abs() < f32::EPSILON);
        assert!((remaining_fraction(Duration::from_secs(8), total) - 1.0).abs() < f32::EPSILON);
        assert!(remaining_fraction(Duration::from_secs(1), Duration::ZERO).abs() < f32::EPSILON);
    }

    #[test]
    fn clamp_handles_non_finite() {
        assert!((clamp_f64_to_f32(f64::NAN) - 0.0).abs() < f32::EPSILON);
        assert!((clamp_f64_to_f32(f64::from(f32::MAX) * 2.0) - f32::MAX).abs() < f32::EPSILON);
    }
}
