//! Splitting a projection interval into regimes.
//!
//! Inside a regime no source crosses zero and the summed traffic stays on
//! one side of the capacity, so traffic and revenue ratio are both linear
//! and their integrals have a closed form. `Regimes` walks the interval one
//! regime at a time, re-anchoring the snapshot at every boundary, until the
//! whole interval is covered.

use smallvec::SmallVec;

use crate::error::{ProjectionError, ensure_not_before};
use crate::numbers::hours_between;
use crate::traffic::{SpeedSnapshot, capacity};
use crate::vector::solve_for_target;

/// One linear stretch of a projection interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regime {
    pub start: i64,
    pub end: i64,
    /// Snapshot anchored at `start`.
    pub snapshot: SpeedSnapshot,
}

impl Regime {
    #[must_use]
    pub fn hours(&self) -> f64 {
        hours_between(self.start, self.end)
    }
}

/// Iterator over the regimes covering `[snapshot.ts, to_ts]`.
#[derive(Debug, Clone)]
pub struct Regimes {
    current: SpeedSnapshot,
    to_ts: i64,
    done: bool,
}

impl Regimes {
    /// # Errors
    ///
    /// Returns an error if the snapshot violates a projection precondition
    /// or `to_ts` precedes it.
    pub fn new(
        snapshot: &SpeedSnapshot,
        to_ts: i64,
        op: &'static str,
    ) -> Result<Self, ProjectionError> {
        snapshot.validate(op)?;
        ensure_not_before(op, snapshot.ts, to_ts)?;
        Ok(Self {
            current: settle(*snapshot),
            to_ts,
            done: false,
        })
    }

    fn advance(&mut self) -> Result<Regime, ProjectionError> {
        let end = next_boundary(&self.current, self.to_ts)?;
        let regime = Regime {
            start: self.current.ts,
            end,
            snapshot: self.current,
        };
        if end < self.to_ts {
            self.current = reset_at(&self.current, end)?;
        } else {
            self.done = true;
        }
        Ok(regime)
    }
}

impl Iterator for Regimes {
    type Item = Result<Regime, ProjectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current.ts >= self.to_ts {
            return None;
        }
        let regime = self.advance();
        if regime.is_err() {
            self.done = true;
        }
        Some(regime)
    }
}

/// Zero out the rate of any source already drained to zero.
const fn settle(mut speed: SpeedSnapshot) -> SpeedSnapshot {
    if speed.community_value <= 0.0 && speed.community_vector < 0.0 {
        speed.community_vector = 0.0;
    }
    if speed.generic_value <= 0.0 && speed.generic_vector < 0.0 {
        speed.generic_vector = 0.0;
    }
    if speed.link_value <= 0.0 && speed.link_vector < 0.0 {
        speed.link_vector = 0.0;
    }
    if speed.speed_ratio_value <= 0.0 && speed.speed_ratio_vector < 0.0 {
        speed.speed_ratio_vector = 0.0;
    }
    speed
}

/// Re-anchor a snapshot at `at`, evaluating every source and stopping the
/// ones that have drained.
///
/// # Errors
///
/// Returns an error if the snapshot violates a projection precondition or
/// `at` precedes it.
pub fn reset_at(speed: &SpeedSnapshot, at: i64) -> Result<SpeedSnapshot, ProjectionError> {
    speed.validate("reset_at")?;
    ensure_not_before("reset_at", speed.ts, at)?;
    if at == speed.ts {
        return Ok(*speed);
    }
    let next = SpeedSnapshot {
        community_value: speed.community().evaluate(at)?,
        generic_value: speed.generic().evaluate(at)?,
        link_value: speed.link().evaluate(at)?,
        speed_ratio_value: speed.speed_ratio().evaluate(at)?,
        ts: at,
        ..*speed
    };
    Ok(settle(next))
}

/// Earliest regime boundary strictly inside `(speed.ts, to_ts)`, else `to_ts`.
fn next_boundary(speed: &SpeedSnapshot, to_ts: i64) -> Result<i64, ProjectionError> {
    let mut candidates: SmallVec<[i64; 6]> = SmallVec::new();

    for source in [
        speed.community(),
        speed.generic(),
        speed.link(),
        speed.speed_ratio(),
    ] {
        if source.rate < 0.0 && source.value > 0.0 {
            candidates.push(solve_for_target(source.value, 0.0, source.rate, speed.ts)?);
        }
    }

    let cap = capacity(speed)?;
    if cap > 0.0 {
        let raw_sum =
            speed.community_value + speed.generic_value * speed.front_ratio + speed.link_value;
        let rate_sum = speed.community_vector
            + speed.generic_vector * speed.front_ratio
            + speed.link_vector;
        let crosses_down = rate_sum < 0.0 && raw_sum > cap;
        let crosses_up = rate_sum > 0.0 && raw_sum < cap;
        if crosses_down || crosses_up {
            candidates.push(solve_for_target(raw_sum, cap, rate_sum, speed.ts)?);
        }
    }

    Ok(candidates
        .into_iter()
        .filter(|&at| at > speed.ts && at < to_ts)
        .min()
        .unwrap_or(to_ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HOUR_MS;

    const T: i64 = 1_700_000_000_000;

    fn collect(speed: &SpeedSnapshot, to_ts: i64) -> Vec<Regime> {
        Regimes::new(speed, to_ts, "test")
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn empty_interval_has_no_regimes() {
        let speed = SpeedSnapshot {
            ts: T,
            ..SpeedSnapshot::default()
        };
        assert!(collect(&speed, T).is_empty());
    }

    #[test]
    fn steady_interval_is_one_regime() {
        let speed = SpeedSnapshot {
            community_value: 10.0,
            community_vector: 1.0,
            limit: 1_000.0,
            ts: T,
            ..SpeedSnapshot::default()
        };
        let regimes = collect(&speed, T + 5 * HOUR_MS);
        assert_eq!(regimes.len(), 1);
        assert_eq!(regimes[0].start, T);
        assert_eq!(regimes[0].end, T + 5 * HOUR_MS);
    }

    #[test]
    fn splits_at_each_zero_crossing_in_order() {
        let speed = SpeedSnapshot {
            community_value: 10.0,
            community_vector: -10.0,
            link_value: 30.0,
            link_vector: -10.0,
            speed_ratio_value: 2.0,
            speed_ratio_vector: -1.0,
            limit: 1_000.0,
            ts: T,
            ..SpeedSnapshot::default()
        };
        let regimes = collect(&speed, T + 10 * HOUR_MS);
        let ends: Vec<i64> = regimes.iter().map(|r| r.end).collect();
        assert_eq!(
            ends,
            vec![T + HOUR_MS, T + 2 * HOUR_MS, T + 3 * HOUR_MS, T + 10 * HOUR_MS]
        );
        let last = regimes[3].snapshot;
        assert_eq!(last.community_vector, 0.0);
        assert_eq!(last.link_vector, 0.0);
        assert_eq!(last.speed_ratio_vector, 0.0);
    }

    #[test]
    fn simultaneous_boundaries_collapse_into_one() {
        let speed = SpeedSnapshot {
            community_value: 10.0,
            community_vector: -10.0,
            generic_value: 5.0,
            generic_vector: -5.0,
            limit: 1_000.0,
            ts: T,
            ..SpeedSnapshot::default()
        };
        let regimes = collect(&speed, T + 4 * HOUR_MS);
        assert_eq!(regimes.len(), 2);
        assert_eq!(regimes[1].snapshot.community_vector, 0.0);
        assert_eq!(regimes[1].snapshot.generic_vector, 0.0);
    }

    #[test]
    fn reset_keeps_rising_sources_running() {
        let speed = SpeedSnapshot {
            link_value: 0.0,
            link_vector: 4.0,
            community_value: 1.0,
            community_vector: -2.0,
            limit: 100.0,
            ts: T,
            ..SpeedSnapshot::default()
        };
        let reset = reset_at(&speed, T + HOUR_MS).unwrap();
        assert_eq!(reset.ts, T + HOUR_MS);
        assert_eq!(reset.link_value, 4.0);
        assert_eq!(reset.link_vector, 4.0);
        assert_eq!(reset.community_value, 0.0);
        assert_eq!(reset.community_vector, 0.0);
        assert_eq!(reset_at(&speed, T).unwrap(), speed);
        assert!(reset_at(&speed, T - 1).is_err());
    }

    #[test]
    fn capacity_crossing_downward_is_a_boundary() {
        let speed = SpeedSnapshot {
            community_value: 200.0,
            community_vector: -50.0,
            limit: 100.0,
            ts: T,
            ..SpeedSnapshot::default()
        };
        let regimes = collect(&speed, T + 3 * HOUR_MS);
        assert_eq!(regimes[0].end, T + 2 * HOUR_MS);
        assert_eq!(regimes[1].end, T + 3 * HOUR_MS);
    }
}
