//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

use crate::constants::HOUR_MS;

/// 2^63, the first f64 above the i64 range.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Ceil a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn ceil_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let ceiled = value.ceil();
    // i64::MAX rounds up to 2^63 as f64, which is already out of range.
    if ceiled >= I64_BOUND {
        return i64::MAX;
    }
    if ceiled < -I64_BOUND {
        return i64::MIN;
    }
    cast::<f64, i64>(ceiled).unwrap_or(0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Elapsed hours between two millisecond timestamps (negative when `to < from`).
#[must_use]
pub fn hours_between(from_ms: i64, to_ms: i64) -> f64 {
    i64_to_f64(to_ms.saturating_sub(from_ms)) / i64_to_f64(HOUR_MS)
}

/// Round to two decimals the way the game UI formats money.
///
/// Amounts of 100 and above drop their fractional part first.
#[must_use]
pub fn format_money(value: f64) -> f64 {
    let money = if value >= 100.0 { value.floor() } else { value };
    (money * 100.0).round() / 100.0
}
