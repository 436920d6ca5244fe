//! Per-day view of a query source as a function of the threshold.

use crate::error::SourceError;
use crate::model::{Day, SourceMode, Totals};
use crate::source::QuerySource;

/// Totals of the pledges made on one day with `amount >= threshold`.
///
/// Selected once per run from the source's [`SourceMode`]. Holds no
/// reference to the source so it can be rebuilt freely after a cache flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCounter {
    /// `query(t, day) - query(t, day + 1)`; the last day subtracts nothing.
    Cumulative { day: Day, last_day: bool },
    /// `query(t, day)` directly.
    DayExact { day: Day },
}

impl DayCounter {
    pub fn new(mode: SourceMode, day: Day, max_day: Day) -> Self {
        match mode {
            SourceMode::Cumulative => Self::Cumulative {
                day,
                last_day: day + 1 >= max_day,
            },
            SourceMode::DayExact => Self::DayExact { day },
        }
    }

    pub fn day(&self) -> Day {
        match *self {
            Self::Cumulative { day, .. } | Self::DayExact { day } => day,
        }
    }

    pub fn totals<S>(&self, src: &mut S, threshold: i64) -> Result<Totals, SourceError>
    where
        S: QuerySource + ?Sized,
    {
        self.observe(src, threshold, S::query)
    }

    pub fn count<S>(&self, src: &mut S, threshold: i64) -> Result<i64, SourceError>
    where
        S: QuerySource + ?Sized,
    {
        Ok(self.totals(src, threshold)?.count)
    }

    /// Count read through [`QuerySource::requery`].
    pub fn fresh_count<S>(&self, src: &mut S, threshold: i64) -> Result<i64, SourceError>
    where
        S: QuerySource + ?Sized,
    {
        Ok(self.observe(src, threshold, S::requery)?.count)
    }

    fn observe<S, Q>(&self, src: &mut S, threshold: i64, mut ask: Q) -> Result<Totals, SourceError>
    where
        S: QuerySource + ?Sized,
        Q: FnMut(&mut S, Option<i64>, Option<Day>) -> Result<Totals, SourceError>,
    {
        match *self {
            Self::Cumulative { day, last_day } => {
                let from_today = ask(&mut *src, Some(threshold), Some(day))?;
                if last_day {
                    return Ok(from_today);
                }
                let from_tomorrow = ask(&mut *src, Some(threshold), Some(day + 1))?;
                Ok(from_today - from_tomorrow)
            }
            Self::DayExact { day } => ask(&mut *src, Some(threshold), Some(day)),
        }
    }
}
