use crate::error::SourceError;
use crate::model::{Day, Totals};

/// The single capability the engine needs from its environment.
///
/// `query(threshold, day)` returns the summed amount and the number of
/// pledges with `amount >= threshold` (no minimum when `None`). Whether `day`
/// selects "on or after this day" or "exactly this day" is a property of the
/// source, see [`SourceMode`](crate::model::SourceMode); `None` covers every
/// day.
pub trait QuerySource {
    fn query(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError>;

    /// Drop any memoized answers so later queries observe fresh data.
    /// Sources without memory have nothing to do.
    fn flush(&mut self) {}

    /// Same question as [`query`](Self::query), answered without reusing
    /// anything memoized during this run. Confirms a finished day.
    fn requery(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError> {
        self.query(threshold, day)
    }
}

impl<S: QuerySource + ?Sized> QuerySource for &mut S {
    fn query(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError> {
        (**self).query(threshold, day)
    }

    fn flush(&mut self) {
        (**self).flush()
    }

    fn requery(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError> {
        (**self).requery(threshold, day)
    }
}
