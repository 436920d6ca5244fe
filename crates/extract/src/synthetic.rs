//! In-memory query source over a known pledge list.
//!
//! Used for self-checks and tests: the engine's output can be compared
//! against the entries the source was built from.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SourceError;
use crate::model::{Day, Investment, SourceMode, Totals};
use crate::source::QuerySource;

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    entries: Vec<Investment>,
    mode: SourceMode,
    queries: u64,
}

impl SyntheticSource {
    pub fn new(entries: Vec<Investment>, mode: SourceMode) -> Self {
        Self {
            entries,
            mode,
            queries: 0,
        }
    }

    /// `num_entries` pledges with uniform days in `0..num_days` and uniform
    /// amounts in `min_cents..=max_cents`. Same seed, same entries.
    pub fn random(
        seed: u64,
        num_entries: usize,
        num_days: Day,
        min_cents: i64,
        max_cents: i64,
        mode: SourceMode,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let entries = if num_days == 0 || min_cents > max_cents {
            Vec::new()
        } else {
            (0..num_entries)
                .map(|_| Investment {
                    day: rng.gen_range(0..num_days),
                    amount_cents: rng.gen_range(min_cents..=max_cents),
                })
                .collect()
        };
        Self::new(entries, mode)
    }

    pub fn entries(&self) -> &[Investment] {
        &self.entries
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Add a pledge, as a live writer would between two queries.
    pub fn insert(&mut self, investment: Investment) {
        self.entries.push(investment);
    }

    pub fn queries(&self) -> u64 {
        self.queries
    }

    /// Summed amount per day for `0..num_days`.
    pub fn daily_amounts(&self, num_days: Day) -> Vec<i64> {
        let mut out = vec![0; num_days as usize];
        for inv in &self.entries {
            if let Some(slot) = out.get_mut(inv.day as usize) {
                *slot += inv.amount_cents;
            }
        }
        out
    }
}

impl QuerySource for SyntheticSource {
    fn query(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError> {
        self.queries += 1;
        let mode = self.mode;
        let total = self
            .entries
            .iter()
            .filter(|inv| threshold.map_or(true, |t| inv.amount_cents >= t))
            .filter(|inv| match (day, mode) {
                (None, _) => true,
                (Some(d), SourceMode::Cumulative) => inv.day >= d,
                (Some(d), SourceMode::DayExact) => inv.day == d,
            })
            .fold(Totals::ZERO, |acc, inv| acc + Totals::new(inv.amount_cents, 1));
        Ok(total)
    }
}
