//! Day index ↔ calendar date.

use chrono::{Days, Local, NaiveDate};
use pledgetrace_extract::Day;

/// Day 0 is `epoch`; day `n` is `n` days later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCalendar {
    epoch: NaiveDate,
}

impl DayCalendar {
    pub fn new(epoch: NaiveDate) -> Self {
        Self { epoch }
    }

    pub fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    /// `None` only past the end of chrono's date range.
    pub fn date_of(&self, day: Day) -> Option<NaiveDate> {
        self.epoch.checked_add_days(Days::new(u64::from(day)))
    }

    /// `None` for dates before the epoch.
    pub fn day_of(&self, date: NaiveDate) -> Option<Day> {
        let days = (date - self.epoch).num_days();
        Day::try_from(days).ok()
    }

    /// Day number of `today`; 0 when `today` is before the epoch.
    pub fn day_number_on(&self, today: NaiveDate) -> Day {
        self.day_of(today).unwrap_or(0)
    }

    pub fn today_day_number(&self) -> Day {
        self.day_number_on(Local::now().date_naive())
    }
}
