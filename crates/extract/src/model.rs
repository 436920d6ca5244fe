use std::collections::BTreeMap;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Day index counted from the source's epoch day.
pub type Day = u32;

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

/// One aggregate answer: summed amount (minor units) and number of pledges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Totals {
    pub amount_cents: i64,
    pub count: i64,
}

impl Totals {
    pub const ZERO: Totals = Totals { amount_cents: 0, count: 0 };

    pub fn new(amount_cents: i64, count: i64) -> Self {
        Self { amount_cents, count }
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            amount_cents: self.amount_cents + rhs.amount_cents,
            count: self.count + rhs.count,
        }
    }
}

impl Sub for Totals {
    type Output = Totals;

    fn sub(self, rhs: Totals) -> Totals {
        Totals {
            amount_cents: self.amount_cents - rhs.amount_cents,
            count: self.count - rhs.count,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A single inferred pledge. Equal pledges on the same day appear as
/// repeated identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Investment {
    pub day: Day,
    pub amount_cents: i64,
}

impl Investment {
    pub fn new(day: Day, amount_cents: i64) -> Self {
        Self { day, amount_cents }
    }
}

/// Result of one reconstruction run.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// One entry per inferred pledge; order carries no meaning.
    pub investments: Vec<Investment>,
    /// Per-day `(amount, count)` deltas of the snapshot the run finished on.
    pub daily: Vec<Totals>,
    pub stats: ExtractStats,
}

impl Extraction {
    /// Pledges grouped into a multiset (pledge -> multiplicity).
    pub fn multiset(&self) -> BTreeMap<Investment, usize> {
        let mut out = BTreeMap::new();
        for inv in &self.investments {
            *out.entry(*inv).or_insert(0) += 1;
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub days: Day,
    /// Consistency failures detected across all days.
    pub anomalies: usize,
    /// Restarts per day, only days that needed one.
    pub restarts_by_day: BTreeMap<Day, u32>,
    /// Steps whose amount delta did not divide evenly by the pledge count.
    pub suspected_fees: usize,
    /// Number of times the daily observation table was queried.
    pub table_fetches: usize,
}

// ---------------------------------------------------------------------------
// Run options
// ---------------------------------------------------------------------------

/// How the source interprets its `day` argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Results cover every day on/after the given day.
    #[default]
    Cumulative,
    /// Results cover exactly the given day.
    DayExact,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cumulative => write!(f, "cumulative"),
            Self::DayExact => write!(f, "day_exact"),
        }
    }
}

/// Which per-day search drives the reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Peel one distinct value per bisection, highest first.
    #[default]
    Stepwise,
    /// Find every jump of the day's count curve in one pass.
    Fast,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stepwise => write!(f, "stepwise"),
            Self::Fast => write!(f, "fast"),
        }
    }
}
