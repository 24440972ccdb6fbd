//! Accumulated traffic and revenue over a site's recorded speed samples.

use crate::error::{ProjectionError, ensure_not_before};
use crate::regime::reset_at;
use crate::revenue::amount;
use crate::state::{Site, SiteSpeed};
use crate::traffic::{SpeedSnapshot, traffic_amount};

/// Speed records of one site ordered by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedHistory {
    records: Vec<SiteSpeed>,
}

impl SpeedHistory {
    #[must_use]
    pub fn new(mut records: Vec<SiteSpeed>) -> Self {
        records.sort_by_key(|record| record.ts);
        Self { records }
    }

    #[must_use]
    pub fn for_site(site: &Site) -> Self {
        Self::new(site.sitespeed.clone())
    }

    #[must_use]
    pub fn records(&self) -> &[SiteSpeed] {
        &self.records
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest record taken at or before `ts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the history is empty or `ts` precedes the first record.
    pub fn find_near(&self, ts: i64) -> Result<&SiteSpeed, ProjectionError> {
        let first = self
            .records
            .first()
            .ok_or(ProjectionError::EmptyHistory { op: "find_near" })?;
        ensure_not_before("find_near", first.ts, ts)?;
        let after = self.records.partition_point(|record| record.ts <= ts);
        Ok(&self.records[after.saturating_sub(1)])
    }

    /// Visitors received between `start` and `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if the history is empty, `end < start`, or a record
    /// violates a projection precondition.
    pub fn traffic_between(&self, start: i64, end: i64) -> Result<f64, ProjectionError> {
        self.accumulate(start, end, |record| record.traffic, traffic_amount)
    }

    /// Money earned between `start` and `end`, in cents.
    ///
    /// # Errors
    ///
    /// Returns an error if the history is empty, `end < start`, or a record
    /// violates a projection precondition.
    pub fn revenue_between(&self, start: i64, end: i64) -> Result<f64, ProjectionError> {
        self.accumulate(start, end, |record| record.money, amount)
    }

    /// Sum per record segment: the next record's accumulator when the server
    /// reported one, otherwise the projection from this record.
    fn accumulate<R, P>(
        &self,
        start: i64,
        end: i64,
        recorded: R,
        project: P,
    ) -> Result<f64, ProjectionError>
    where
        R: Fn(&SiteSpeed) -> Option<f64>,
        P: Fn(&SpeedSnapshot, i64) -> Result<f64, ProjectionError>,
    {
        if self.records.is_empty() {
            return Err(ProjectionError::EmptyHistory { op: "accumulate" });
        }
        ensure_not_before("accumulate", start, end)?;

        let first = self
            .records
            .iter()
            .position(|record| record.ts > start)
            .map_or(self.records.len() - 1, |index| index.saturating_sub(1));

        let mut total = 0.0;
        for (index, record) in self.records.iter().enumerate().skip(first) {
            if record.ts >= end {
                break;
            }
            let mut speed = record.speed();
            if speed.ts < start {
                speed = reset_at(&speed, start)?;
            }
            let next = self.records.get(index + 1);
            match next.and_then(&recorded).filter(|value| value.is_finite()) {
                Some(value) => total += value,
                None => {
                    let segment_end = next.map_or(end, |record| record.ts).min(end);
                    total += project(&speed, segment_end)?;
                }
            }
        }
        Ok(total)
    }
}
