//! Per-day reconstruction loop.
//!
//! For a day with `n` unrecovered pledges, `f(t)` = "pledges that day with
//! amount >= t" is a non-increasing step function. The largest `t` with
//! `f(t) >= n` is the smallest remaining amount `v`; `f(v) - f(v + 1)` is how
//! many pledges equal it. Peeling values off the bottom until `n` reaches
//! zero recovers the day, one strictly larger value per step.
//!
//! The source is live, so a day's queries are not an atomic snapshot. A
//! finished day is re-read at every step of the recovered function before
//! it is accepted. Any contradiction between answers discards everything
//! recovered for that day, flushes cached answers, re-reads the daily table
//! and starts the day over.

use std::collections::BTreeSet;
use std::iter;

use crate::bisect::{self, SearchError};
use crate::config::ExtractConfig;
use crate::counter::DayCounter;
use crate::daily::DailyTable;
use crate::diagnostics::{Anomaly, Diagnostics};
use crate::error::{ExtractError, SourceError};
use crate::jumps;
use crate::model::{Day, ExtractStats, Extraction, Investment, Strategy};
use crate::source::QuerySource;

enum DayOutcome {
    Done(Vec<Investment>),
    Retry {
        anomaly: Anomaly,
        history: Vec<i64>,
        nearby: Vec<(i64, i64)>,
    },
}

pub struct Extractor {
    config: ExtractConfig,
    max_day: Day,
    diag: Diagnostics,
}

impl Extractor {
    /// Reconstruct days `0..max_day`.
    pub fn new(config: ExtractConfig, max_day: Day, diag: Diagnostics) -> Result<Self, ExtractError> {
        config.validate()?;
        if max_day == 0 {
            return Err(ExtractError::Config("max_day must be at least 1".into()));
        }
        Ok(Self { config, max_day, diag })
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Run the configured strategy against `src`.
    pub fn run<S>(&self, src: &mut S) -> Result<Extraction, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        self.run_days(src, self.config.strategy)
    }

    /// Step-by-step extraction: one bisection per distinct value.
    pub fn extract_investments<S>(&self, src: &mut S) -> Result<Extraction, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        self.run_days(src, Strategy::Stepwise)
    }

    /// One jump search per day; fewer round trips, coarser diagnostics.
    pub fn fast_extraction<S>(&self, src: &mut S) -> Result<Extraction, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        self.run_days(src, Strategy::Fast)
    }

    fn run_days<S>(&self, src: &mut S, strategy: Strategy) -> Result<Extraction, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        let mut stats = ExtractStats {
            days: self.max_day,
            ..ExtractStats::default()
        };
        let mut daily = self.fetch_table(src, &mut stats)?;

        let mut investments = Vec::new();
        for day in 0..self.max_day {
            let mut anomalies = 0u32;
            loop {
                let outcome = match strategy {
                    Strategy::Stepwise => self.extract_day(src, &daily, day, &mut stats)?,
                    Strategy::Fast => self.extract_day_fast(src, &daily, day)?,
                };
                match outcome {
                    DayOutcome::Done(found) => {
                        self.diag.day_done(day, found.len());
                        investments.extend(found);
                        break;
                    }
                    DayOutcome::Retry { anomaly, history, nearby } => {
                        anomalies += 1;
                        stats.anomalies += 1;
                        self.diag.anomaly(day, &anomaly, &history, &nearby);
                        if anomalies > self.config.max_restarts {
                            self.diag.budget_exhausted(day, anomalies);
                            return Err(ExtractError::RetryBudgetExhausted { day, anomalies });
                        }
                        *stats.restarts_by_day.entry(day).or_insert(0) += 1;
                        self.diag.restart(day, anomalies, self.config.max_restarts);

                        src.flush();
                        daily = self.fetch_table(src, &mut stats)?;
                    }
                }
            }
        }

        Ok(Extraction {
            investments,
            daily: daily.deltas().to_vec(),
            stats,
        })
    }

    fn fetch_table<S>(&self, src: &mut S, stats: &mut ExtractStats) -> Result<DailyTable, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        let daily = DailyTable::fetch(src, self.max_day, self.config.mode)?;
        stats.table_fetches += 1;
        let negative = daily.negative_days();
        if !negative.is_empty() {
            self.diag.negative_deltas(&negative);
        }
        Ok(daily)
    }

    fn extract_day<S>(
        &self,
        src: &mut S,
        daily: &DailyTable,
        day: Day,
        stats: &mut ExtractStats,
    ) -> Result<DayOutcome, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        let counter = DayCounter::new(self.config.mode, day, self.max_day);
        let (lo, hi) = (self.config.min_amount_cents, self.config.max_amount_cents);

        let mut count = daily.delta(day).count;
        let mut found = Vec::new();
        let mut history = Vec::new();
        let mut previous: Option<i64> = None;

        while count > 0 {
            history.push(count);
            let value = match bisect::find_last_ge(|t| counter.count(src, t), count, lo, hi) {
                Ok(v) => v,
                Err(SearchError::Precondition(p)) => {
                    let anomaly = Anomaly::Bisection(p);
                    return Ok(DayOutcome::Retry { anomaly, history, nearby: Vec::new() });
                }
                Err(SearchError::Eval(e)) => return Err(e.into()),
            };

            if let Some(previous) = previous.filter(|&p| value <= p) {
                let nearby = values_around(&counter, src, value)?;
                let anomaly = Anomaly::ValueNotIncreasing { previous, value };
                return Ok(DayOutcome::Retry { anomaly, history, nearby });
            }

            let at = counter.totals(src, value)?;
            if at.count != count {
                let nearby = values_around(&counter, src, value)?;
                let anomaly = Anomaly::CountNotReproduced {
                    threshold: value,
                    expected: count,
                    observed: at.count,
                };
                return Ok(DayOutcome::Retry { anomaly, history, nearby });
            }

            let above = counter.totals(src, value + 1)?;
            self.diag.step(day, count, at.count, above.count);
            let changed = count - above.count;
            if changed <= 0 {
                let anomaly = Anomaly::CountNotDecreasing {
                    threshold: value,
                    count,
                    new_count: above.count,
                };
                let nearby = vec![(value, at.count), (value + 1, above.count)];
                return Ok(DayOutcome::Retry { anomaly, history, nearby });
            }

            // The threshold is an observed boundary, not a net amount; an
            // uneven split usually means a per-pledge deduction upstream.
            let amount_diff = at.amount_cents - above.amount_cents;
            if amount_diff % changed != 0 {
                stats.suspected_fees += 1;
                self.diag.fee_suspect(day, value, amount_diff, changed);
            }

            found.extend(iter::repeat(Investment::new(day, value)).take(changed as usize));
            previous = Some(value);
            count = above.count;
        }

        if count != 0 {
            return Ok(DayOutcome::Retry {
                anomaly: Anomaly::NegativeDelta { count },
                history,
                nearby: Vec::new(),
            });
        }
        if found.is_empty() {
            return Ok(DayOutcome::Done(found));
        }
        self.confirm_day(src, &counter, found, history)
    }

    fn extract_day_fast<S>(&self, src: &mut S, daily: &DailyTable, day: Day) -> Result<DayOutcome, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        let expected = daily.delta(day).count;
        if expected == 0 {
            return Ok(DayOutcome::Done(Vec::new()));
        }
        let history = vec![expected];
        if expected < 0 {
            return Ok(DayOutcome::Retry {
                anomaly: Anomaly::NegativeDelta { count: expected },
                history,
                nearby: Vec::new(),
            });
        }

        let counter = DayCounter::new(self.config.mode, day, self.max_day);
        let (lo, hi) = (self.config.min_amount_cents, self.config.max_amount_cents);

        // a pledge of exactly `hi` jumps at `hi`, so search one past it
        let values = match jumps::find_lasts(|t| counter.count(src, t), lo, hi + 1) {
            Ok(values) => values,
            Err(SearchError::Precondition(p)) => {
                let anomaly = Anomaly::Bisection(p);
                return Ok(DayOutcome::Retry { anomaly, history, nearby: Vec::new() });
            }
            Err(SearchError::Eval(e)) => return Err(e.into()),
        };

        let mut found = Vec::new();
        let mut seen = Vec::with_capacity(values.len());
        for value in values {
            let count = counter.count(src, value)?;
            let new_count = counter.count(src, value + 1)?;
            seen.push((value, count));
            let changed = count - new_count;
            if changed <= 0 {
                let anomaly = Anomaly::CountNotDecreasing { threshold: value, count, new_count };
                seen.push((value + 1, new_count));
                return Ok(DayOutcome::Retry { anomaly, history, nearby: seen });
            }
            found.extend(iter::repeat(Investment::new(day, value)).take(changed as usize));
        }

        if found.len() as i64 != expected {
            let anomaly = Anomaly::JumpTotalMismatch {
                expected,
                recovered: found.len() as i64,
            };
            return Ok(DayOutcome::Retry { anomaly, history, nearby: seen });
        }
        self.confirm_day(src, &counter, found, history)
    }

    /// Re-read the day at `min_amount` and on both sides of every recovered
    /// value, bypassing memoized answers. If every read agrees with `found`,
    /// the day's step function is exactly the one `found` describes.
    fn confirm_day<S>(
        &self,
        src: &mut S,
        counter: &DayCounter,
        found: Vec<Investment>,
        history: Vec<i64>,
    ) -> Result<DayOutcome, ExtractError>
    where
        S: QuerySource + ?Sized,
    {
        let mut thresholds = BTreeSet::from([self.config.min_amount_cents]);
        for inv in &found {
            thresholds.insert(inv.amount_cents);
            thresholds.insert(inv.amount_cents + 1);
        }

        let mut nearby = Vec::with_capacity(thresholds.len());
        for threshold in thresholds {
            let recovered = found.iter().filter(|inv| inv.amount_cents >= threshold).count() as i64;
            let observed = counter.fresh_count(src, threshold)?;
            nearby.push((threshold, observed));
            if observed != recovered {
                let anomaly = Anomaly::DayChanged { threshold, recovered, observed };
                return Ok(DayOutcome::Retry { anomaly, history, nearby });
            }
        }
        Ok(DayOutcome::Done(found))
    }
}

/// `f(v - 1)`, `f(v)` and `f(v + 1)` for the anomaly log.
fn values_around<S>(counter: &DayCounter, src: &mut S, value: i64) -> Result<Vec<(i64, i64)>, SourceError>
where
    S: QuerySource + ?Sized,
{
    let mut out = Vec::with_capacity(3);
    for threshold in [value - 1, value, value + 1] {
        out.push((threshold, counter.count(src, threshold)?));
    }
    Ok(out)
}

/// Convenience wrapper: default diagnostics, configured strategy.
pub fn extract<S>(src: &mut S, config: ExtractConfig, max_day: Day) -> Result<Extraction, ExtractError>
where
    S: QuerySource + ?Sized,
{
    Extractor::new(config, max_day, Diagnostics::quiet())?.run(src)
}
