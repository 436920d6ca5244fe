//! Diagnostics handle for extraction runs.
//!
//! Anomalies and suspected fee discrepancies are always reported at `warn`.
//! Per-day progress (verbosity >= 1) and per-step functor values
//! (verbosity >= 2) are opt-in because a long run has thousands of steps.

use std::fmt;

use log::{debug, info, warn};

use crate::error::Precondition;
use crate::model::Day;

const TARGET: &str = "pledgetrace::extract";

/// A contradiction between answers that should agree, caused by the
/// dataset changing while a day was being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Count at the threshold found by bisection differs from the target.
    CountNotReproduced { threshold: i64, expected: i64, observed: i64 },
    /// Stepping one unit above the threshold did not lower the count.
    CountNotDecreasing { threshold: i64, count: i64, new_count: i64 },
    /// The day's count delta is negative.
    NegativeDelta { count: i64 },
    /// A search saw values contradicting monotonicity.
    Bisection(Precondition),
    /// Jump multiplicities do not add up to the day's count delta.
    JumpTotalMismatch { expected: i64, recovered: i64 },
    /// Values peel off in increasing order; this one is not above the last.
    ValueNotIncreasing { previous: i64, value: i64 },
    /// Re-reading the finished day disagrees with what was recovered.
    DayChanged { threshold: i64, recovered: i64, observed: i64 },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountNotReproduced { threshold, expected, observed } => write!(
                f,
                "count at threshold {threshold} changed: expected {expected}, observed {observed}"
            ),
            Self::CountNotDecreasing { threshold, count, new_count } => write!(
                f,
                "count change above threshold {threshold} not positive ({count} -> {new_count})"
            ),
            Self::NegativeDelta { count } => write!(f, "negative daily count delta ({count})"),
            Self::Bisection(p) => write!(f, "bisection failed ({p})"),
            Self::JumpTotalMismatch { expected, recovered } => write!(
                f,
                "jump multiplicities sum to {recovered}, daily delta is {expected}"
            ),
            Self::ValueNotIncreasing { previous, value } => write!(
                f,
                "bisection returned {value} after already peeling {previous}"
            ),
            Self::DayChanged { threshold, recovered, observed } => write!(
                f,
                "day changed before it was confirmed: {observed} pledges at threshold {threshold}, {recovered} recovered"
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    verbosity: u8,
    label: Option<String>,
}

impl Diagnostics {
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity, label: None }
    }

    pub fn quiet() -> Self {
        Self::default()
    }

    /// Prefix every message with `label` (e.g. the offering slug).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    fn prefix(&self) -> String {
        match &self.label {
            Some(label) => format!("[{label}] "),
            None => String::new(),
        }
    }

    /// `nearby` holds `(threshold, f(threshold))` pairs read around the
    /// point where the contradiction showed up.
    pub fn anomaly(&self, day: Day, anomaly: &Anomaly, history: &[i64], nearby: &[(i64, i64)]) {
        warn!(
            target: TARGET,
            "{}day {day}: {anomaly}; count history {history:?}{}",
            self.prefix(),
            format_nearby(nearby)
        );
    }

    pub fn negative_deltas(&self, days: &[Day]) {
        warn!(
            target: TARGET,
            "{}daily table has negative deltas on days {days:?}; data arrived while it was read",
            self.prefix()
        );
    }

    pub fn restart(&self, day: Day, attempt: u32, max_restarts: u32) {
        warn!(
            target: TARGET,
            "{}day {day}: likely new data incorporated, flushing cache and retrying ({attempt}/{max_restarts})",
            self.prefix()
        );
    }

    pub fn budget_exhausted(&self, day: Day, anomalies: u32) {
        warn!(
            target: TARGET,
            "{}day {day}: max day error exceeded after {anomalies} anomalies, aborting",
            self.prefix()
        );
    }

    pub fn fee_suspect(&self, day: Day, threshold: i64, amount_diff: i64, changed: i64) {
        warn!(
            target: TARGET,
            "{}day {day}: possible fees at {threshold}: amount delta {amount_diff} not divisible by {changed}",
            self.prefix()
        );
    }

    pub fn step(&self, day: Day, count: i64, at: i64, above: i64) {
        if self.verbosity > 1 {
            debug!(
                target: TARGET,
                "{}day {day}: count {count}, f(v) = {at}, f(v+1) = {above}",
                self.prefix()
            );
        }
    }

    pub fn day_done(&self, day: Day, recovered: usize) {
        if self.verbosity > 0 {
            info!(target: TARGET, "{}day {day}: {recovered} pledges", self.prefix());
        }
    }
}

fn format_nearby(nearby: &[(i64, i64)]) -> String {
    if nearby.is_empty() {
        return String::new();
    }
    let values: Vec<String> = nearby.iter().map(|(t, c)| format!("f({t}) = {c}")).collect();
    format!("; {}", values.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_messages() {
        let a = Anomaly::CountNotReproduced { threshold: 500, expected: 2, observed: 3 };
        assert_eq!(
            a.to_string(),
            "count at threshold 500 changed: expected 2, observed 3"
        );
        let a = Anomaly::CountNotDecreasing { threshold: 700, count: 1, new_count: 1 };
        assert!(a.to_string().contains("not positive (1 -> 1)"));
        let a = Anomaly::Bisection(Precondition {
            search: "find_last_ge",
            detail: "f(0) = 1 < 2".into(),
        });
        assert!(a.to_string().contains("find_last_ge"));
        let a = Anomaly::DayChanged { threshold: 500, recovered: 2, observed: 3 };
        assert!(a.to_string().contains("3 pledges at threshold 500, 2 recovered"));
    }

    #[test]
    fn nearby_values_are_listed() {
        assert_eq!(format_nearby(&[]), "");
        assert_eq!(
            format_nearby(&[(499, 3), (500, 3), (501, 1)]),
            "; f(499) = 3, f(500) = 3, f(501) = 1"
        );
    }

    #[test]
    fn label_prefix() {
        let d = Diagnostics::new(2).with_label("aptera-rega");
        assert_eq!(d.prefix(), "[aptera-rega] ");
        assert_eq!(d.verbosity(), 2);
        assert_eq!(Diagnostics::quiet().prefix(), "");
    }
}
