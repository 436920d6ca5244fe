use serde::Serialize;

use crate::error::SourceError;
use crate::model::{Day, SourceMode, Totals};
use crate::source::QuerySource;

/// Raw per-day observations at `threshold = None` and the per-day deltas
/// derived from them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyTable {
    observations: Vec<Totals>,
    deltas: Vec<Totals>,
}

impl DailyTable {
    /// Query one observation per day in `0..max_day`.
    pub fn fetch<S>(src: &mut S, max_day: Day, mode: SourceMode) -> Result<Self, SourceError>
    where
        S: QuerySource + ?Sized,
    {
        let observations = (0..max_day)
            .map(|day| src.query(None, Some(day)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_observations(observations, mode))
    }

    /// Cumulative observations become consecutive differences, the last
    /// day keeping its raw value. Day-exact observations already are deltas.
    pub fn from_observations(observations: Vec<Totals>, mode: SourceMode) -> Self {
        let deltas = match mode {
            SourceMode::Cumulative => observations
                .iter()
                .enumerate()
                .map(|(day, &today)| match observations.get(day + 1) {
                    Some(&tomorrow) => today - tomorrow,
                    None => today,
                })
                .collect(),
            SourceMode::DayExact => observations.clone(),
        };
        Self { observations, deltas }
    }

    pub fn observations(&self) -> &[Totals] {
        &self.observations
    }

    pub fn deltas(&self) -> &[Totals] {
        &self.deltas
    }

    pub fn delta(&self, day: Day) -> Totals {
        self.deltas.get(day as usize).copied().unwrap_or(Totals::ZERO)
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Days whose count delta is negative. Never happens on a stable
    /// dataset; a hit means the source changed while the table was read.
    pub fn negative_days(&self) -> Vec<Day> {
        self.deltas
            .iter()
            .enumerate()
            .filter(|(_, d)| d.count < 0)
            .map(|(day, _)| day as Day)
            .collect()
    }
}
