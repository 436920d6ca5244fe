//! Jump-set search over a non-increasing integer step function.
//!
//! A jump is a point `x` with `f(x) > f(x + 1)`. Instead of evaluating every
//! point, the range is split at its midpoint and only halves whose endpoint
//! values differ are explored, so `k` jumps cost `O(k log((x1 - x0) / k))`
//! evaluations.

use crate::bisect::{check_range, midpoint, violation, SearchError};

/// Every `x` in `[x0, x1)` with `f(x) > f(x + 1)`, in ascending order.
///
/// Requires `f(x0) >= f(x1)`; equal endpoints mean no jumps.
pub fn find_lasts<F, E>(mut f: F, x0: i64, x1: i64) -> Result<Vec<i64>, SearchError<E>>
where
    F: FnMut(i64) -> Result<i64, E>,
{
    const NAME: &str = "find_lasts";
    check_range(NAME, x0, x1)?;
    let mut f = |x| f(x).map_err(SearchError::Eval);

    let y0 = f(x0)?;
    let y1 = if x0 == x1 { y0 } else { f(x1)? };
    if y0 == y1 {
        return Ok(Vec::new());
    }
    if y0 < y1 {
        return Err(violation(
            NAME,
            format!("f({x0}) = {y0} < f({x1}) = {y1}: not non-increasing"),
        ));
    }

    let mut jumps = Vec::new();
    descend(&mut f, (x0, y0), (x1, y1), &mut jumps)?;
    Ok(jumps)
}

// Invariant: x0 < x1 and y0 > y1, so at least one jump lies in [x0, x1).
fn descend<F, E>(
    f: &mut F,
    (x0, y0): (i64, i64),
    (x1, y1): (i64, i64),
    jumps: &mut Vec<i64>,
) -> Result<(), SearchError<E>>
where
    F: FnMut(i64) -> Result<i64, SearchError<E>>,
{
    if x0 + 1 == x1 {
        jumps.push(x0);
        return Ok(());
    }
    let xmid = midpoint(x0, x1);
    let ymid = f(xmid)?;
    if y0 > ymid {
        descend(f, (x0, y0), (xmid, ymid), jumps)?;
    }
    if ymid > y1 {
        descend(f, (xmid, ymid), (x1, y1), jumps)?;
    }
    Ok(())
}
