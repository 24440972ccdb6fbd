//! Site growth formulas: how hosting, version scores and level shape the
//! speed vectors the server records.

use crate::constants::{
    SCORE_RATIO_MAX, SCORE_RATIO_MIN, SCORE_SHARE_EXPONENT, SCORE_SHARE_PERCENT, SCORE_SHARE_PIVOT,
};
use crate::error::{ProjectionError, ensure_finite, ensure_non_negative};
use crate::revenue::anno_ratio;

fn score_ratio(part: f64, total: f64) -> f64 {
    let share = (part / total * SCORE_SHARE_PERCENT / SCORE_SHARE_PIVOT).powf(SCORE_SHARE_EXPONENT);
    (SCORE_RATIO_MAX.min(share).max(SCORE_RATIO_MIN) * 100.0).round() / 100.0
}

fn ensure_at_least(
    op: &'static str,
    field: &'static str,
    value: f64,
    min: f64,
) -> Result<f64, ProjectionError> {
    ensure_finite(op, field, value)?;
    if value < min {
        return Err(ProjectionError::OutOfRange {
            op,
            field,
            min,
            max: f64::INFINITY,
            value,
        });
    }
    Ok(value)
}

/// Traffic capacity of a site: hosting bandwidth scaled by the backend share
/// of all version scores.
///
/// # Errors
///
/// Returns an error for negative or non-finite inputs.
pub fn traffic_limit(
    max_bandwidth: f64,
    backend: f64,
    sum_version_score_all: f64,
) -> Result<f64, ProjectionError> {
    const OP: &str = "traffic_limit";
    let max_bandwidth = ensure_non_negative(OP, "maxBw", max_bandwidth)?;
    let backend = ensure_non_negative(OP, "backend", backend)?;
    let total = ensure_non_negative(OP, "sumVersionScoreAll", sum_version_score_all)?;
    if total == 0.0 {
        return Ok(max_bandwidth);
    }
    Ok(max_bandwidth * score_ratio(backend, total))
}

/// Multiplier applied to generic traffic from the frontend share of all
/// version scores.
///
/// # Errors
///
/// Returns an error unless `1 <= frontend < sum_version_score_all`.
pub fn front_ratio(frontend: f64, sum_version_score_all: f64) -> Result<f64, ProjectionError> {
    const OP: &str = "front_ratio";
    let frontend = ensure_at_least(OP, "frontend", frontend, 1.0)?;
    let total = ensure_at_least(OP, "sumVersionScoreAll", sum_version_score_all, 1.0)?;
    if frontend >= total {
        return Err(ProjectionError::OutOfRange {
            op: OP,
            field: "frontend",
            min: 1.0,
            max: total,
            value: frontend,
        });
    }
    Ok(score_ratio(frontend, total))
}

/// Share of visitors that return, rounded to three decimals.
///
/// # Errors
///
/// Returns an error for negative or non-finite inputs, an `anno` outside
/// `0..=100`, or a frontend score above the total.
pub fn retention(
    level: f64,
    frontend: f64,
    anno: f64,
    sum_version_score_all: f64,
) -> Result<f64, ProjectionError> {
    const OP: &str = "retention";
    let level = ensure_non_negative(OP, "level", level)?;
    let frontend = ensure_non_negative(OP, "frontend", frontend)?;
    let total = ensure_non_negative(OP, "sumVersionScoreAll", sum_version_score_all)?;
    let anno = anno_ratio(anno)?;
    if frontend > total {
        return Err(ProjectionError::OutOfRange {
            op: OP,
            field: "frontend",
            min: 0.0,
            max: total,
            value: frontend,
        });
    }
    if level == 0.0 {
        return Ok(0.0);
    }
    Ok((2.0 * level * frontend / total * anno * 1_000.0).round() / 1_000.0)
}

/// Baseline generic traffic for a site level and total version score.
///
/// # Errors
///
/// Returns an error for negative or non-finite inputs.
pub fn generic_base(level: f64, sum_version_score_all: f64) -> Result<f64, ProjectionError> {
    const OP: &str = "generic_base";
    let level = ensure_non_negative(OP, "level", level)?;
    let total = ensure_non_negative(OP, "sumVersionScoreAll", sum_version_score_all)?;
    if level == 0.0 {
        return Ok(0.0);
    }
    let level_term = 1.5 * (level + level.powi(2)) * 100.0 + 500.0;
    let base = ((0.5 * (100.0 * total.powf(0.75) / level + level_term) + 2_100.0) / 15.0).floor();
    Ok(((base * 100.0).round() / 100.0).max(0.0))
}
