//! Ad revenue projection.
//!
//! An ad earns `traffic × ratio` per hour, where the ratio folds the ad's
//! click-through rate, its price per thousand clicks, and the site's
//! annoyance into one vector. Both factors are linear inside a regime, so
//! each regime integrates to a cubic in closed form.

use serde::{Deserialize, Serialize};

use crate::constants::{ANNO_MAX, CPC_PER_MILLE, CTR_PERCENT, MONEY_CENTS, SECOND_MS};
use crate::error::{ProjectionError, ensure_finite, ensure_non_negative, ensure_not_before};
use crate::numbers::format_money;
use crate::regime::Regimes;
use crate::state::Ad;
use crate::traffic::{SpeedSnapshot, limited_total};
use crate::vector::Vector;

/// Rate parameters of one advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdTerms {
    pub ctr_base: f64,
    pub ctr_vector: f64,
    /// Epoch seconds.
    pub start_date: i64,
    pub cpc: f64,
}

impl AdTerms {
    #[must_use]
    pub const fn start_ms(&self) -> i64 {
        self.start_date.saturating_mul(SECOND_MS)
    }
}

/// Revenue ratio contributed by ads: value and hourly rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedRatio {
    pub value: f64,
    pub rate: f64,
}

/// Revenue earned up to a time and the earn-rate at that time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenueProjection {
    pub total: f64,
    pub rate: f64,
}

/// What the bot reads when deciding whether an ad is worth keeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdStats {
    pub profit_total: f64,
    pub profit_per_hour: f64,
    pub conversion: f64,
}

/// Share of clicks left after ad annoyance.
///
/// # Errors
///
/// Returns an error unless `anno` is a finite number in `0..=100`.
pub fn anno_ratio(anno: f64) -> Result<f64, ProjectionError> {
    const OP: &str = "anno_ratio";
    ensure_finite(OP, "anno", anno)?;
    if !(0.0..=ANNO_MAX).contains(&anno) {
        return Err(ProjectionError::OutOfRange {
            op: OP,
            field: "anno",
            min: 0.0,
            max: ANNO_MAX,
            value: anno,
        });
    }
    Ok((1.0 - anno / ANNO_MAX).clamp(0.0, 1.0))
}

/// Click-through rate at `at_ts`, evaluated from the ad's start date.
///
/// # Errors
///
/// Returns an error for non-finite terms or an `at_ts` before the ad started.
pub fn current_ctr(terms: &AdTerms, at_ts: i64) -> Result<f64, ProjectionError> {
    const OP: &str = "current_ctr";
    ensure_finite(OP, "ctrBase", terms.ctr_base)?;
    ensure_finite(OP, "ctrVector", terms.ctr_vector)?;
    ensure_not_before(OP, terms.start_ms(), at_ts)?;
    Vector::new(terms.ctr_base, terms.ctr_vector, terms.start_ms()).evaluate(at_ts)
}

/// Revenue ratio of one ad on a site with the given annoyance.
///
/// # Errors
///
/// Returns an error for non-finite terms, a negative CTR base or CPC, or an
/// out-of-range `anno`.
pub fn speed_ratio_for_ad(terms: &AdTerms, anno: f64) -> Result<SpeedRatio, ProjectionError> {
    const OP: &str = "speed_ratio_for_ad";
    let ctr_base = ensure_non_negative(OP, "ctrBase", terms.ctr_base)?;
    let ctr_vector = ensure_finite(OP, "ctrVector", terms.ctr_vector)?;
    let cpc = ensure_non_negative(OP, "cpc", terms.cpc)?;
    let ratio = anno_ratio(anno)?;
    Ok(SpeedRatio {
        value: ratio * ctr_base / CTR_PERCENT * cpc / CPC_PER_MILLE,
        rate: ratio * ctr_vector / CTR_PERCENT * cpc / CPC_PER_MILLE,
    })
}

/// Combined revenue ratio of every ad on a site.
///
/// # Errors
///
/// Returns the first error raised by [`speed_ratio_for_ad`].
pub fn speed_ratio_for_ads<'a, I>(ads: I, anno: f64) -> Result<SpeedRatio, ProjectionError>
where
    I: IntoIterator<Item = &'a AdTerms>,
{
    ads.into_iter()
        .try_fold(SpeedRatio::default(), |acc, terms| {
            let one = speed_ratio_for_ad(terms, anno)?;
            Ok(SpeedRatio {
                value: acc.value + one.value,
                rate: acc.rate + one.rate,
            })
        })
}

/// Revenue earned between the snapshot and `to_ts` using the snapshot's own ratio.
///
/// # Errors
///
/// Returns an error if any snapshot field violates its precondition or
/// `to_ts` precedes the snapshot.
pub fn amount(speed: &SpeedSnapshot, to_ts: i64) -> Result<f64, ProjectionError> {
    let mut total = 0.0;
    for regime in Regimes::new(speed, to_ts, "amount")? {
        let regime = regime?;
        let hours = regime.hours();
        let start_traffic = limited_total(&regime.snapshot, regime.start)?;
        let end_traffic = limited_total(&regime.snapshot, regime.end)?;
        let slope = (end_traffic - start_traffic) / hours;
        let ratio = regime.snapshot.speed_ratio_value;
        let ratio_rate = regime.snapshot.speed_ratio_vector;
        // ∫ (L + T·t)(i + r·t) dt over [0, M]
        total += hours * ratio * start_traffic
            + hours.powi(2) * (slope * ratio + start_traffic * ratio_rate) / 2.0
            + hours.powi(3) * slope * ratio_rate / 3.0;
    }
    Ok(total)
}

/// Instantaneous earn-rate at `at_ts` using the snapshot's own ratio.
///
/// # Errors
///
/// Returns an error if any snapshot field violates its precondition or
/// `at_ts` precedes the snapshot.
pub fn rate(speed: &SpeedSnapshot, at_ts: i64) -> Result<f64, ProjectionError> {
    speed.validate("rate")?;
    let traffic = limited_total(speed, at_ts)?;
    let ratio = speed.speed_ratio().evaluate(at_ts)?;
    Ok(traffic * ratio)
}

/// Revenue of a single ad placed on the site described by `speed`.
///
/// # Errors
///
/// Returns an error if the snapshot or the ad terms violate a precondition
/// or `at_ts` precedes the snapshot.
pub fn project_revenue(
    speed: &SpeedSnapshot,
    terms: &AdTerms,
    at_ts: i64,
) -> Result<RevenueProjection, ProjectionError> {
    let ratio = speed_ratio_for_ad(terms, speed.anno)?;
    let single = speed.with_speed_ratio(ratio.value, ratio.rate);
    Ok(RevenueProjection {
        total: amount(&single, at_ts)?,
        rate: rate(&single, at_ts)?,
    })
}

/// Money earned so far, earn-rate and conversion of an ad, in currency units.
///
/// `now_ts` earlier than the last speed record is treated as the record time.
///
/// # Errors
///
/// Returns an error if the snapshot or the ad terms violate a precondition.
pub fn ad_stats(speed: &SpeedSnapshot, ad: &Ad, now_ts: i64) -> Result<AdStats, ProjectionError> {
    let terms = ad.terms();
    let at = now_ts.max(speed.ts);
    let projection = project_revenue(speed, &terms, at)?;
    let earned = ensure_finite("ad_stats", "money", ad.money)?;
    let conversion =
        current_ctr(&terms, now_ts.max(terms.start_ms()))? * anno_ratio(speed.anno)?;
    Ok(AdStats {
        profit_total: format_money((earned + projection.total) / MONEY_CENTS).max(0.0),
        profit_per_hour: format_money(projection.rate / MONEY_CENTS),
        conversion,
    })
}
