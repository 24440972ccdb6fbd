//! Site traffic projection.
//!
//! A site's visitors come from three growing or decaying sources (community,
//! generic content, inbound links) and are capped by the hosting capacity,
//! which a DDoS attack lowers. When the sources overflow the capacity, each
//! is scaled down proportionally with the generic source absorbing rounding.

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, ensure_finite, ensure_non_negative, ensure_not_before};
use crate::regime::Regimes;
use crate::vector::Vector;

/// Last server-observed rates for one site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedSnapshot {
    pub community_value: f64,
    pub community_vector: f64,
    pub generic_value: f64,
    pub generic_vector: f64,
    pub link_value: f64,
    pub link_vector: f64,
    #[serde(default)]
    pub speed_ratio_value: f64,
    #[serde(default)]
    pub speed_ratio_vector: f64,
    #[serde(default)]
    pub ddos_value: f64,
    pub limit: f64,
    #[serde(default)]
    pub anno: f64,
    #[serde(default = "SpeedSnapshot::default_front_ratio")]
    pub front_ratio: f64,
    pub ts: i64,
}

impl Default for SpeedSnapshot {
    fn default() -> Self {
        Self {
            community_value: 0.0,
            community_vector: 0.0,
            generic_value: 0.0,
            generic_vector: 0.0,
            link_value: 0.0,
            link_vector: 0.0,
            speed_ratio_value: 0.0,
            speed_ratio_vector: 0.0,
            ddos_value: 0.0,
            limit: 0.0,
            anno: 0.0,
            front_ratio: Self::default_front_ratio(),
            ts: 0,
        }
    }
}

impl SpeedSnapshot {
    const fn default_front_ratio() -> f64 {
        1.0
    }

    #[must_use]
    pub const fn community(&self) -> Vector {
        Vector::new(self.community_value, self.community_vector, self.ts)
    }

    /// Generic content vector before the front-end multiplier.
    #[must_use]
    pub const fn generic(&self) -> Vector {
        Vector::new(self.generic_value, self.generic_vector, self.ts)
    }

    #[must_use]
    pub const fn link(&self) -> Vector {
        Vector::new(self.link_value, self.link_vector, self.ts)
    }

    #[must_use]
    pub const fn speed_ratio(&self) -> Vector {
        Vector::new(self.speed_ratio_value, self.speed_ratio_vector, self.ts)
    }

    /// Copy with the revenue ratio replaced.
    #[must_use]
    pub const fn with_speed_ratio(mut self, value: f64, rate: f64) -> Self {
        self.speed_ratio_value = value;
        self.speed_ratio_vector = rate;
        self
    }

    /// Check every projection precondition on the snapshot's own fields.
    ///
    /// # Errors
    ///
    /// Returns the first violated precondition, tagged with `op`.
    pub fn validate(&self, op: &'static str) -> Result<(), ProjectionError> {
        ensure_non_negative(op, "communityValue", self.community_value)?;
        ensure_finite(op, "communityVector", self.community_vector)?;
        ensure_non_negative(op, "genericValue", self.generic_value)?;
        ensure_finite(op, "genericVector", self.generic_vector)?;
        ensure_non_negative(op, "linkValue", self.link_value)?;
        ensure_finite(op, "linkVector", self.link_vector)?;
        ensure_non_negative(op, "speedRatioValue", self.speed_ratio_value)?;
        ensure_finite(op, "speedRatioVector", self.speed_ratio_vector)?;
        ensure_non_negative(op, "frontRatio", self.front_ratio)?;
        ensure_non_negative(op, "limit", self.limit)?;
        ensure_ddos(op, self.ddos_value)?;
        Ok(())
    }
}

/// Per-source visitors per hour at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficResult {
    pub total_speed: f64,
    pub generic_speed: f64,
    pub community_speed: f64,
    pub link_speed: f64,
    pub ddos_speed: f64,
}

fn ensure_ddos(op: &'static str, ddos: f64) -> Result<f64, ProjectionError> {
    ensure_finite(op, "ddosValue", ddos)?;
    if ddos > 0.0 {
        return Err(ProjectionError::Positive {
            op,
            field: "ddosValue",
            value: ddos,
        });
    }
    Ok(ddos)
}

/// Community visitors per hour at `to_ts`.
///
/// # Errors
///
/// Returns an error for a negative or non-finite community vector or a
/// `to_ts` in the snapshot's past.
pub fn community_traffic(speed: &SpeedSnapshot, to_ts: i64) -> Result<f64, ProjectionError> {
    ensure_non_negative("community_traffic", "communityValue", speed.community_value)?;
    speed.community().evaluate(to_ts)
}

/// Generic content score at `to_ts`, before the front-end multiplier.
///
/// # Errors
///
/// Returns an error for a negative or non-finite generic vector or a
/// `to_ts` in the snapshot's past.
pub fn generic_value(speed: &SpeedSnapshot, to_ts: i64) -> Result<f64, ProjectionError> {
    ensure_non_negative("generic_value", "genericValue", speed.generic_value)?;
    speed.generic().evaluate(to_ts)
}

/// Generic visitors per hour at `to_ts`, scaled by the front-end ratio.
///
/// # Errors
///
/// Returns an error for a negative or non-finite generic vector or front
/// ratio, or a `to_ts` in the snapshot's past.
pub fn generic_traffic(speed: &SpeedSnapshot, to_ts: i64) -> Result<f64, ProjectionError> {
    let front_ratio = ensure_non_negative("generic_traffic", "frontRatio", speed.front_ratio)?;
    Ok(generic_value(speed, to_ts)? * front_ratio)
}

/// Link visitors per hour at `to_ts`.
///
/// # Errors
///
/// Returns an error for a negative or non-finite link vector or a `to_ts`
/// in the snapshot's past.
pub fn link_traffic(speed: &SpeedSnapshot, to_ts: i64) -> Result<f64, ProjectionError> {
    ensure_non_negative("link_traffic", "linkValue", speed.link_value)?;
    speed.link().evaluate(to_ts)
}

/// DDoS offset; never positive.
///
/// # Errors
///
/// Returns an error if the offset is positive or not finite.
pub fn ddos_traffic(speed: &SpeedSnapshot) -> Result<f64, ProjectionError> {
    ensure_ddos("ddos_traffic", speed.ddos_value).map(|ddos| ddos.min(0.0))
}

/// Capacity left after the DDoS offset.
///
/// # Errors
///
/// Returns an error if the limit is negative or the DDoS offset is positive.
pub fn capacity(speed: &SpeedSnapshot) -> Result<f64, ProjectionError> {
    let limit = ensure_non_negative("capacity", "limit", speed.limit)?;
    let ddos = ensure_ddos("capacity", speed.ddos_value)?;
    Ok((limit + ddos).max(0.0))
}

struct Sources {
    community: f64,
    generic: f64,
    link: f64,
    ddos: f64,
    capacity: f64,
}

impl Sources {
    fn at(speed: &SpeedSnapshot, to_ts: i64) -> Result<Self, ProjectionError> {
        Ok(Self {
            community: community_traffic(speed, to_ts)?,
            generic: generic_traffic(speed, to_ts)?,
            link: link_traffic(speed, to_ts)?,
            ddos: ddos_traffic(speed)?,
            capacity: capacity(speed)?,
        })
    }

    fn raw_sum(&self) -> f64 {
        self.community + self.generic + self.link
    }
}

/// Visitors per hour at `to_ts`, rescaled against capacity.
///
/// # Errors
///
/// Returns an error if any snapshot field violates its precondition or
/// `to_ts` precedes the snapshot.
pub fn project_traffic(speed: &SpeedSnapshot, to_ts: i64) -> Result<TrafficResult, ProjectionError> {
    ensure_not_before("project_traffic", speed.ts, to_ts)?;
    let sources = Sources::at(speed, to_ts)?;
    let raw_sum = sources.raw_sum();
    if raw_sum > sources.capacity {
        // Community and link floor first; generic takes the remainder.
        let community = (sources.capacity * sources.community / raw_sum).floor();
        let link = (sources.capacity * sources.link / raw_sum).floor();
        let generic = sources.capacity - community - link;
        return Ok(TrafficResult {
            total_speed: sources.capacity,
            generic_speed: generic,
            community_speed: community,
            link_speed: link,
            ddos_speed: sources.ddos,
        });
    }
    Ok(TrafficResult {
        total_speed: raw_sum,
        generic_speed: sources.generic,
        community_speed: sources.community,
        link_speed: sources.link,
        ddos_speed: sources.ddos,
    })
}

/// Total visitors per hour at `to_ts`: `min(capacity, raw sum)`.
///
/// # Errors
///
/// Returns an error if any snapshot field violates its precondition or
/// `to_ts` precedes the snapshot.
pub fn limited_total(speed: &SpeedSnapshot, to_ts: i64) -> Result<f64, ProjectionError> {
    ensure_not_before("limited_total", speed.ts, to_ts)?;
    let sources = Sources::at(speed, to_ts)?;
    Ok(sources.capacity.min(sources.raw_sum()))
}

/// Visitors accumulated between the snapshot and `to_ts`.
///
/// Traffic is linear within a regime, so each regime contributes its
/// trapezoid exactly.
///
/// # Errors
///
/// Returns an error if any snapshot field violates its precondition or
/// `to_ts` precedes the snapshot.
pub fn traffic_amount(speed: &SpeedSnapshot, to_ts: i64) -> Result<f64, ProjectionError> {
    let mut total = 0.0;
    for regime in Regimes::new(speed, to_ts, "traffic_amount")? {
        let regime = regime?;
        let start = limited_total(&regime.snapshot, regime.start)?;
        let end = limited_total(&regime.snapshot, regime.end)?;
        total += regime.hours() * (start + end) / 2.0;
    }
    Ok(total)
}
