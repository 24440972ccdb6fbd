//! Linear vectors: a value plus an hourly rate anchored at a timestamp.

use serde::{Deserialize, Serialize};

use crate::constants::{
    HOUR_MS, PRICE_TIER_DAY_BASE, PRICE_TIER_DAY_SECS, PRICE_TIER_DAY_SPAN,
    PRICE_TIER_HOUR_BASE, PRICE_TIER_HOUR_SECS, PRICE_TIER_HOUR_SPAN, PRICE_TIER_LONG_DIVISOR,
    PRICE_TIER_MINUTES_SECS,
};
use crate::error::{ProjectionError, ensure_finite, ensure_non_negative, ensure_not_before};
use crate::numbers::{ceil_f64_to_i64, hours_between, i64_to_f64};

/// A quantity that moves linearly from `timestamp` at `rate` units per hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub value: f64,
    #[serde(rename = "vector")]
    pub rate: f64,
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

impl Vector {
    #[must_use]
    pub const fn new(value: f64, rate: f64, timestamp: i64) -> Self {
        Self {
            value,
            rate,
            timestamp,
        }
    }

    fn check(&self, op: &'static str, to_ts: i64) -> Result<f64, ProjectionError> {
        ensure_finite(op, "value", self.value)?;
        ensure_finite(op, "rate", self.rate)?;
        ensure_not_before(op, self.timestamp, to_ts)?;
        Ok(hours_between(self.timestamp, to_ts))
    }

    /// Value at `to_ts`, clamped at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector is not finite or `to_ts` precedes the
    /// vector's own timestamp.
    pub fn evaluate(&self, to_ts: i64) -> Result<f64, ProjectionError> {
        let hours = self.check("evaluate", to_ts)?;
        Ok(self.rate.mul_add(hours, self.value).max(0.0))
    }

    /// Area under the line between the vector's timestamp and `to_ts`.
    ///
    /// The result is not clamped; callers split at zero crossings first.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector is not finite or `to_ts` precedes the
    /// vector's own timestamp.
    pub fn integrate(&self, to_ts: i64) -> Result<f64, ProjectionError> {
        let hours = self.check("integrate", to_ts)?;
        Ok(self.value * hours + self.rate * hours * hours / 2.0)
    }
}

/// Earliest millisecond at which `value` moving at `rate` per hour reaches `target`.
///
/// # Errors
///
/// Returns an error for non-finite input, a zero rate, or a rate that moves
/// `value` away from `target`.
pub fn solve_for_target(
    value: f64,
    target: f64,
    rate: f64,
    from_ts: i64,
) -> Result<i64, ProjectionError> {
    const OP: &str = "solve_for_target";
    ensure_finite(OP, "value", value)?;
    ensure_finite(OP, "target", target)?;
    ensure_finite(OP, "rate", rate)?;
    if rate == 0.0 {
        return Err(ProjectionError::ZeroRate { op: OP });
    }
    if (rate < 0.0 && value < target) || (rate > 0.0 && value > target) {
        return Err(ProjectionError::WrongDirection {
            op: OP,
            value,
            target,
            rate,
        });
    }
    let offset = ceil_f64_to_i64(i64_to_f64(HOUR_MS) * (target - value) / rate);
    Ok(from_ts.saturating_add(offset))
}

/// Price of cutting short a timed action, as a staircase over the remaining seconds.
///
/// All arguments are in seconds. The remaining time is clamped to
/// `0..=duration`; nothing remaining costs nothing and every other tier costs
/// at least 1.
///
/// # Errors
///
/// Returns an error if any argument is negative or not finite.
pub fn tiered_price(duration: f64, end_time: f64, ts: f64) -> Result<i64, ProjectionError> {
    const OP: &str = "tiered_price";
    let duration = ensure_non_negative(OP, "duration", duration)?;
    let end_time = ensure_non_negative(OP, "end_time", end_time)?;
    let ts = ensure_non_negative(OP, "ts", ts)?;

    let remaining = (end_time - ts).clamp(0.0, duration);
    if remaining == 0.0 {
        return Ok(0);
    }
    let raw = if remaining <= PRICE_TIER_MINUTES_SECS {
        (remaining / PRICE_TIER_MINUTES_SECS).ceil()
    } else if remaining <= PRICE_TIER_HOUR_SECS {
        (PRICE_TIER_HOUR_SPAN * (remaining - PRICE_TIER_MINUTES_SECS)
            / (PRICE_TIER_HOUR_SECS - PRICE_TIER_MINUTES_SECS)
            + PRICE_TIER_HOUR_BASE)
            .ceil()
    } else if remaining <= PRICE_TIER_DAY_SECS {
        (PRICE_TIER_DAY_SPAN * (remaining - PRICE_TIER_HOUR_SECS)
            / (PRICE_TIER_DAY_SECS - PRICE_TIER_HOUR_SECS)
            + PRICE_TIER_DAY_BASE)
            .ceil()
    } else {
        (remaining / PRICE_TIER_LONG_DIVISOR).ceil().sqrt().ceil()
    };
    Ok(ceil_f64_to_i64(raw).max(1))
}
