//! Binary search over monotone integer functions.
//!
//! Same idea as `slice::partition_point`, except the "slice" is an integer
//! range `[x0, x1]` and each element is produced on demand by evaluating `f`.
//! Evaluations may be remote queries, so they are fallible and every search costs
//! `O(log(x1 - x0))` of them.
//!
//! `find_first_ge` / `find_last_le` assume `f` is non-decreasing;
//! `find_first_le` / `find_last_ge` assume `f` is non-increasing. Each checks
//! the endpoint that must satisfy the threshold and fails with
//! [`SearchError::Precondition`] when it does not. A single-point range is
//! answered by that endpoint check alone.

use std::fmt;

use crate::error::Precondition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError<E> {
    /// Bad range, or endpoint values contradicting the search contract.
    Precondition(Precondition),
    /// Evaluating `f` itself failed.
    Eval(E),
}

impl<E: fmt::Display> fmt::Display for SearchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precondition(p) => write!(f, "{p}"),
            Self::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for SearchError<E> {}

pub(crate) fn violation<E>(search: &'static str, detail: String) -> SearchError<E> {
    SearchError::Precondition(Precondition { search, detail })
}

pub(crate) fn check_range<E>(search: &'static str, x0: i64, x1: i64) -> Result<(), SearchError<E>> {
    if x0 > x1 {
        return Err(violation(search, format!("empty range [{x0}, {x1}]")));
    }
    Ok(())
}

/// Floor of the midpoint; never overflows.
pub(crate) fn midpoint(x0: i64, x1: i64) -> i64 {
    ((x0 as i128 + x1 as i128).div_euclid(2)) as i64
}

/// Smallest `x` in `[x0, x1]` with `f(x) >= y`, for non-decreasing `f`.
///
/// Requires `f(x1) >= y`.
pub fn find_first_ge<F, E>(mut f: F, y: i64, x0: i64, x1: i64) -> Result<i64, SearchError<E>>
where
    F: FnMut(i64) -> Result<i64, E>,
{
    const NAME: &str = "find_first_ge";
    check_range(NAME, x0, x1)?;
    let mut f = |x| f(x).map_err(SearchError::Eval);

    let y1 = f(x1)?;
    if y1 < y {
        return Err(violation(NAME, format!("f({x1}) = {y1} < {y}")));
    }
    if x0 == x1 || f(x0)? >= y {
        return Ok(x0);
    }

    // f(lo) < y <= f(hi)
    let (mut lo, mut hi) = (x0, x1);
    while lo + 1 < hi {
        let mid = midpoint(lo, hi);
        if f(mid)? >= y {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}

/// Largest `x` in `[x0, x1]` with `f(x) <= y`, for non-decreasing `f`.
///
/// Requires `f(x0) <= y`.
pub fn find_last_le<F, E>(mut f: F, y: i64, x0: i64, x1: i64) -> Result<i64, SearchError<E>>
where
    F: FnMut(i64) -> Result<i64, E>,
{
    const NAME: &str = "find_last_le";
    check_range(NAME, x0, x1)?;
    let mut f = |x| f(x).map_err(SearchError::Eval);

    let y0 = f(x0)?;
    if y0 > y {
        return Err(violation(NAME, format!("f({x0}) = {y0} > {y}")));
    }
    if x0 == x1 || f(x1)? <= y {
        return Ok(x1);
    }

    // f(lo) <= y < f(hi)
    let (mut lo, mut hi) = (x0, x1);
    while lo + 1 < hi {
        let mid = midpoint(lo, hi);
        if f(mid)? <= y {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Smallest `x` in `[x0, x1]` with `f(x) <= y`, for non-increasing `f`.
///
/// Requires `f(x1) <= y`.
pub fn find_first_le<F, E>(mut f: F, y: i64, x0: i64, x1: i64) -> Result<i64, SearchError<E>>
where
    F: FnMut(i64) -> Result<i64, E>,
{
    const NAME: &str = "find_first_le";
    check_range(NAME, x0, x1)?;
    let mut f = |x| f(x).map_err(SearchError::Eval);

    let y1 = f(x1)?;
    if y1 > y {
        return Err(violation(NAME, format!("f({x1}) = {y1} > {y}")));
    }
    if x0 == x1 || f(x0)? <= y {
        return Ok(x0);
    }

    // f(lo) > y >= f(hi)
    let (mut lo, mut hi) = (x0, x1);
    while lo + 1 < hi {
        let mid = midpoint(lo, hi);
        if f(mid)? <= y {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}

/// Largest `x` in `[x0, x1]` with `f(x) >= y`, for non-increasing `f`.
///
/// Requires `f(x0) >= y`. With `f` = "pledges at or above threshold" this
/// finds the upper edge of the plateau where at least `y` pledges qualify.
pub fn find_last_ge<F, E>(mut f: F, y: i64, x0: i64, x1: i64) -> Result<i64, SearchError<E>>
where
    F: FnMut(i64) -> Result<i64, E>,
{
    const NAME: &str = "find_last_ge";
    check_range(NAME, x0, x1)?;
    let mut f = |x| f(x).map_err(SearchError::Eval);

    let y0 = f(x0)?;
    if y0 < y {
        return Err(violation(NAME, format!("f({x0}) = {y0} < {y}")));
    }
    if x0 == x1 || f(x1)? >= y {
        return Ok(x1);
    }

    // f(lo) >= y > f(hi)
    let (mut lo, mut hi) = (x0, x1);
    while lo + 1 < hi {
        let mid = midpoint(lo, hi);
        if f(mid)? >= y {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn table(data: &[i64]) -> impl FnMut(i64) -> Result<i64, Infallible> + '_ {
        move |ix| Ok(data[ix as usize])
    }

    fn last(data: &[i64]) -> i64 {
        data.len() as i64 - 1
    }

    #[test]
    fn first_ge_small_tables() {
        let data = [-2, -1, -1, 0, 0, 10, 20, 30];
        assert_eq!(find_first_ge(table(&data), 0, 0, last(&data)), Ok(3));
        assert_eq!(find_first_ge(table(&data), 10, 0, last(&data)), Ok(5));

        let data = [-100, -2, -1, -1, 0, 0, 10, 20, 30];
        assert_eq!(find_first_ge(table(&data), 0, 0, last(&data)), Ok(4));
        assert_eq!(find_first_ge(table(&data), -2, 0, last(&data)), Ok(1));

        let data = [-100, -20, -10, -5, -1, -1, 10, 20, 20, 30];
        assert_eq!(find_first_ge(table(&data), 0, 0, last(&data)), Ok(6));
        assert_eq!(find_first_ge(table(&data), 20, 0, last(&data)), Ok(7));
    }

    #[test]
    fn first_ge_long_tails() {
        let mut data = vec![-100, 10, 20, 30];
        data.extend((0..10_000).map(|i| i + 31));
        assert_eq!(find_first_ge(table(&data), 0, 0, last(&data)), Ok(1));
        assert_eq!(find_first_ge(table(&data), 32, 0, last(&data)), Ok(5));

        let mut data: Vec<i64> = (0..10_000).map(|i| -i - 200).collect();
        data.sort();
        data.extend([-100, 10, 20, 30]);
        assert_eq!(find_first_ge(table(&data), 0, 0, last(&data)), Ok(10_001));
        assert_eq!(find_first_ge(table(&data), 15, 0, last(&data)), Ok(10_002));
    }

    #[test]
    fn first_ge_negative_domain() {
        let f = |x: i64| Ok::<_, Infallible>(x * 200 + 300);
        assert_eq!(find_first_ge(f, 0, -1000, 1000), Ok(-1));
        assert_eq!(find_first_ge(f, 123, -1000, 1000), Ok(0));
    }

    #[test]
    fn first_ge_at_left_endpoint() {
        let data = [5, 6, 7];
        assert_eq!(find_first_ge(table(&data), 1, 0, 2), Ok(0));
    }

    #[test]
    fn last_le_nondecreasing() {
        let data = [-2, -1, -1, 0, 0, 10, 20, 30];
        assert_eq!(find_last_le(table(&data), 0, 0, last(&data)), Ok(4));
        assert_eq!(find_last_le(table(&data), -1, 0, last(&data)), Ok(2));
        assert_eq!(find_last_le(table(&data), 100, 0, last(&data)), Ok(7));
    }

    #[test]
    fn first_le_nonincreasing() {
        let data = [30, 20, 10, 0, 0, -1, -1, -2];
        assert_eq!(find_first_le(table(&data), 0, 0, last(&data)), Ok(3));
        assert_eq!(find_first_le(table(&data), -1, 0, last(&data)), Ok(5));
        assert_eq!(find_first_le(table(&data), 30, 0, last(&data)), Ok(0));
    }

    #[test]
    fn last_ge_nonincreasing() {
        let data = [30, 20, 10, 0, 0, -1, -1, -2];
        assert_eq!(find_last_ge(table(&data), 0, 0, last(&data)), Ok(4));
        assert_eq!(find_last_ge(table(&data), 20, 0, last(&data)), Ok(1));
        assert_eq!(find_last_ge(table(&data), -2, 0, last(&data)), Ok(7));
    }

    #[test]
    fn last_ge_plateau_returns_upper_edge() {
        // count of pledges >= threshold for pledges {500, 500, 700}
        let f = |t: i64| {
            Ok::<_, Infallible>([500, 500, 700].iter().filter(|&&a| a >= t).count() as i64)
        };
        assert_eq!(find_last_ge(f, 3, 0, 1000), Ok(500));
        assert_eq!(find_last_ge(f, 1, 0, 1000), Ok(700));
    }

    #[test]
    fn precondition_violations() {
        let data = [0, 1, 2];
        let err = find_first_ge(table(&data), 5, 0, 2).unwrap_err();
        assert!(matches!(err, SearchError::Precondition(ref p) if p.search == "find_first_ge"));

        let err = find_last_le(table(&data), -1, 0, 2).unwrap_err();
        assert!(matches!(err, SearchError::Precondition(_)));

        let rev = [2, 1, 0];
        assert!(matches!(
            find_first_le(table(&rev), -1, 0, 2),
            Err(SearchError::Precondition(_))
        ));
        assert!(matches!(
            find_last_ge(table(&rev), 3, 0, 2),
            Err(SearchError::Precondition(_))
        ));
    }

    #[test]
    fn reversed_range_is_rejected_without_probing() {
        let mut calls = 0;
        let f = |x: i64| {
            calls += 1;
            Ok::<_, Infallible>(x)
        };
        let err = find_last_ge(f, 0, 5, 4).unwrap_err();
        assert!(err.to_string().contains("empty range"));
        assert_eq!(calls, 0);
    }

    #[test]
    fn single_point_range_uses_one_evaluation() {
        let mut calls = 0;
        let f = |_: i64| {
            calls += 1;
            Ok::<_, Infallible>(1)
        };
        assert_eq!(find_last_ge(f, 1, 500, 500), Ok(500));
        assert_eq!(calls, 1);
    }

    #[test]
    fn evaluation_errors_pass_through() {
        let f = |x: i64| if x > 10 { Err("boom") } else { Ok(-x) };
        assert_eq!(find_last_ge(f, -3, 0, 20), Err(SearchError::Eval("boom")));
    }

    #[test]
    fn logarithmic_evaluation_count() {
        let mut calls = 0u32;
        let f = |x: i64| {
            calls += 1;
            Ok::<_, Infallible>(if x <= 123_456 { 1 } else { 0 })
        };
        assert_eq!(find_last_ge(f, 1, 0, 1_000_000), Ok(123_456));
        assert!(calls <= 2 + 20, "took {calls} evaluations");
    }

    #[test]
    fn midpoint_handles_extremes() {
        assert_eq!(midpoint(i64::MAX - 1, i64::MAX), i64::MAX - 1);
        assert_eq!(midpoint(-3, 0), -2);
        assert_eq!(midpoint(i64::MIN, i64::MAX), -1);
    }
}
