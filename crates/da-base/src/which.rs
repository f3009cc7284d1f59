//! Positions of true, minimal and maximal elements.

use std::cmp::Ordering;

use da_columnar::{ArrayLike, DatarError, RArray, make_array};
use da_types::Value;

use crate::from_positions;

/// 0-based positions of the `TRUE` elements; missing ones are skipped.
pub fn which(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let positions = x
        .values()?
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, Value::Bool(true)))
        .map(|(pos, _)| pos)
        .collect::<Vec<_>>();
    from_positions(positions)
}

fn which_extreme(x: impl Into<ArrayLike>, wanted: Ordering) -> Result<RArray, DatarError> {
    let values = make_array(x, None)?.values()?;
    let mut best: Option<(usize, &Value)> = None;
    for (pos, value) in values.iter().enumerate() {
        if value.is_missing() {
            continue;
        }
        match best {
            Some((_, current)) if value.compare(current) != Some(wanted) => {}
            _ => best = Some((pos, value)),
        }
    }
    from_positions(best.map(|(pos, _)| pos))
}

/// Position of the first minimum, or an empty array when nothing is present.
pub fn which_min(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    which_extreme(x, Ordering::Less)
}

/// Position of the first maximum.
pub fn which_max(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    which_extreme(x, Ordering::Greater)
}
