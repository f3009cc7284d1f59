//! Logical reductions, set operations and vector slicing helpers.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::BooleanArray;
use da_columnar::{ArrayLike, BinaryOp, DatarError, Index, RArray, binop, make_array};
use da_types::{Value, ValueKey};

fn logicals(x: impl Into<ArrayLike>) -> Result<Vec<Option<bool>>, DatarError> {
    let x = make_array(x, None)?;
    Ok(x
        .values()?
        .into_iter()
        .map(|v| match v {
            Value::Bool(b) => Some(b),
            Value::Int(i) => Some(i != 0),
            Value::Float(f) if !f.is_nan() => Some(f != 0.0),
            Value::Str(s) => Some(!s.is_empty()),
            _ => None,
        })
        .collect())
}

/// `NA` when any element is missing, otherwise whether all are true.
pub fn all_(x: impl Into<ArrayLike>) -> Result<Value, DatarError> {
    let values = logicals(x)?;
    if values.iter().any(Option::is_none) {
        return Ok(Value::Null);
    }
    Ok(Value::Bool(values.into_iter().all(|v| v == Some(true))))
}

/// Three-valued: `TRUE` if any element is true, else `NA` if any is
/// missing, else `FALSE`.
pub fn any_(x: impl Into<ArrayLike>) -> Result<Value, DatarError> {
    let values = logicals(x)?;
    if values.contains(&Some(true)) {
        return Ok(Value::Bool(true));
    }
    if values.iter().any(Option::is_none) {
        return Ok(Value::Null);
    }
    Ok(Value::Bool(false))
}

pub fn any_na(x: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    Ok(make_array(x, None)?.values()?.iter().any(Value::is_missing))
}

/// Insert `values` into `x` after the 0-based position `after`.
///
/// `None` inserts at the front; a negative `after` counts from the end, so
/// `-1` appends.
pub fn append(
    x: impl Into<ArrayLike>,
    values: impl Into<ArrayLike>,
    after: Option<i64>,
) -> Result<RArray, DatarError> {
    let mut out = make_array(x, None)?.values()?;
    let len = out.len() as i64;
    let at = match after {
        None => 0,
        Some(after) if after < 0 => after + len + 1,
        Some(after) => after + 1,
    };
    let at = at.clamp(0, len) as usize;
    let inserted = make_array(values, None)?.values()?;
    out.splice(at..at, inserted);
    RArray::from_values(&out)
}

/// One row per element of `x`: `fun(x[i], y)`.
pub fn outer_with(
    x: impl Into<ArrayLike>,
    y: impl Into<ArrayLike>,
    fun: impl Fn(Value, &RArray) -> Result<RArray, DatarError>,
) -> Result<Vec<RArray>, DatarError> {
    let y = make_array(y, None)?;
    make_array(x, None)?
        .values()?
        .into_iter()
        .map(|xi| fun(xi, &y))
        .collect()
}

/// Outer product.
pub fn outer(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<Vec<RArray>, DatarError> {
    outer_with(x, y, |xi, y| binop(BinaryOp::Mul, xi, y))
}

/// Successive differences, applied `differences` times.
pub fn diff(x: impl Into<ArrayLike>, lag: usize, differences: usize) -> Result<RArray, DatarError> {
    if lag != 1 {
        return Err(DatarError::invalid("diff", "only lag = 1 is supported"));
    }
    let mut out = make_array(x, None)?;
    for _ in 0..differences {
        let len = out.len();
        if len <= 1 {
            return out.take(&[]);
        }
        let later: Vec<usize> = (1..len).collect();
        let earlier: Vec<usize> = (0..len - 1).collect();
        out = binop(BinaryOp::Sub, out.take(&later)?, out.take(&earlier)?)?;
    }
    Ok(out)
}

/// Whether each element repeats an earlier one (a later one with
/// `from_last`). Values in `incomparables` are never duplicates.
pub fn duplicated(
    x: impl Into<ArrayLike>,
    incomparables: &[Value],
    from_last: bool,
) -> Result<RArray, DatarError> {
    let values = make_array(x, None)?.values()?;
    let skip: HashSet<ValueKey> = incomparables.iter().map(Value::key).collect();
    let mut seen = HashSet::new();
    let mut flags = vec![false; values.len()];
    let positions: Box<dyn Iterator<Item = usize>> = if from_last {
        Box::new((0..values.len()).rev())
    } else {
        Box::new(0..values.len())
    };
    for pos in positions {
        let key = values[pos].key();
        if skip.contains(&key) {
            continue;
        }
        flags[pos] = !seen.insert(key);
    }
    RArray::create(Arc::new(BooleanArray::from(flags)))
}

fn keys(x: &RArray) -> Result<HashSet<ValueKey>, DatarError> {
    Ok(x.values()?.iter().map(Value::key).collect())
}

fn unique_positions(values: &[Value], keep: impl Fn(&ValueKey) -> bool) -> Vec<usize> {
    let mut seen = HashSet::new();
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| {
            let key = v.key();
            keep(&key) && seen.insert(key)
        })
        .map(|(pos, _)| pos)
        .collect()
}

/// Distinct elements in order of first appearance.
pub fn unique(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?.decoded();
    let positions = unique_positions(&x.values()?, |_| true);
    x.take(&positions)
}

/// Distinct elements of `x` that are also in `y`, in `x`'s order.
pub fn intersect(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?.decoded();
    let table = keys(&make_array(y, None)?)?;
    let positions = unique_positions(&x.values()?, |key| table.contains(key));
    x.take(&positions)
}

/// Distinct elements of `x` that are not in `y`.
pub fn setdiff(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?.decoded();
    let table = keys(&make_array(y, None)?)?;
    let positions = unique_positions(&x.values()?, |key| !table.contains(key));
    x.take(&positions)
}

pub fn union(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    unique(crate::seq::c_(vec![x.into(), y.into()])?)
}

/// Whether `x` and `y` hold the same distinct elements.
pub fn setequal(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    Ok(keys(&make_array(x, None)?)? == keys(&make_array(y, None)?)?)
}

/// The first `n` elements; a negative `n` drops that many from the end.
pub fn head(x: impl Into<ArrayLike>, n: i64) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let len = x.len() as i64;
    let stop = if n < 0 { (len + n).max(0) } else { n.min(len) };
    slice(&x, 0, stop)
}

/// The last `n` elements; a negative `n` drops that many from the front.
pub fn tail(x: impl Into<ArrayLike>, n: i64) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let len = x.len() as i64;
    let start = if n < 0 { (-n).min(len) } else { len - n.min(len) };
    slice(&x, start, len)
}

fn slice(x: &RArray, start: i64, stop: i64) -> Result<RArray, DatarError> {
    x.at(Index::Slice {
        start: Some(start as isize),
        stop: Some(stop as isize),
        step: None,
    })?
    .into_array()
}

#[cfg(test)]
mod tests {
    use da_columnar::DatarError;
    use da_types::Value;

    use super::{
        all_, any_, any_na, append, diff, duplicated, head, intersect, outer, setdiff, setequal,
        tail, union, unique,
    };

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    fn bools(values: &[bool]) -> Vec<Value> {
        values.iter().copied().map(Value::Bool).collect()
    }

    #[test]
    fn all_and_any_are_three_valued() {
        assert_eq!(all_(vec![true, true]).expect("all"), Value::Bool(true));
        assert_eq!(all_(vec![Some(true), None]).expect("all"), Value::Null);
        assert_eq!(all_(Vec::<bool>::new()).expect("all"), Value::Bool(true));
        assert_eq!(any_(vec![Some(false), None, Some(true)]).expect("any"), Value::Bool(true));
        assert_eq!(any_(vec![Some(false), None]).expect("any"), Value::Null);
        assert_eq!(any_(vec![false]).expect("any"), Value::Bool(false));
        assert!(any_na(vec![Some(1.0), None]).expect("any_na"));
    }

    #[test]
    fn append_positions() {
        let x = vec![1i64, 2, 3];
        assert_eq!(
            append(x.clone(), 9i64, Some(-1)).expect("append").values().expect("values"),
            ints(&[1, 2, 3, 9])
        );
        assert_eq!(
            append(x.clone(), 9i64, None).expect("append").values().expect("values"),
            ints(&[9, 1, 2, 3])
        );
        assert_eq!(
            append(x, vec![8i64, 9], Some(0)).expect("append").values().expect("values"),
            ints(&[1, 8, 9, 2, 3])
        );
    }

    #[test]
    fn outer_builds_rows() {
        let rows = outer(vec![1i64, 2], vec![3i64, 4]).expect("outer");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].values().expect("values"), ints(&[6, 8]));
    }

    #[test]
    fn diff_repeats() {
        let x = vec![1i64, 4, 9, 16];
        assert_eq!(
            diff(x.clone(), 1, 1).expect("diff").values().expect("values"),
            ints(&[3, 5, 7])
        );
        assert_eq!(diff(x.clone(), 1, 2).expect("diff").values().expect("values"), ints(&[2, 2]));
        assert!(matches!(diff(x, 2, 1), Err(DatarError::InvalidArgument { .. })));
    }

    #[test]
    fn duplicated_from_both_ends() {
        let x = vec![1i64, 2, 1, 3, 2];
        assert_eq!(
            duplicated(x.clone(), &[], false).expect("dup").values().expect("values"),
            bools(&[false, false, true, false, true])
        );
        assert_eq!(
            duplicated(x.clone(), &[], true).expect("dup").values().expect("values"),
            bools(&[true, true, false, false, false])
        );
        assert_eq!(
            duplicated(x, &[Value::Int(1)], false).expect("dup").values().expect("values"),
            bools(&[false, false, false, false, true])
        );
    }

    #[test]
    fn set_operations_keep_x_order() {
        let x = vec![3i64, 1, 3, 2];
        let y = vec![2i64, 3, 5];
        assert_eq!(unique(x.clone()).expect("unique").values().expect("values"), ints(&[3, 1, 2]));
        assert_eq!(
            intersect(x.clone(), y.clone()).expect("intersect").values().expect("values"),
            ints(&[3, 2])
        );
        assert_eq!(
            setdiff(x.clone(), y.clone()).expect("setdiff").values().expect("values"),
            ints(&[1])
        );
        assert_eq!(
            union(x.clone(), y).expect("union").values().expect("values"),
            ints(&[3, 1, 2, 5])
        );
        assert!(setequal(x, vec![1i64, 2, 3]).expect("setequal"));
    }

    #[test]
    fn head_and_tail_follow_r() {
        let x = vec![1i64, 2, 3, 4, 5];
        assert_eq!(head(x.clone(), 2).expect("head").values().expect("values"), ints(&[1, 2]));
        assert_eq!(head(x.clone(), -2).expect("head").values().expect("values"), ints(&[1, 2, 3]));
        assert_eq!(tail(x.clone(), 2).expect("tail").values().expect("values"), ints(&[4, 5]));
        assert_eq!(tail(x.clone(), -2).expect("tail").values().expect("values"), ints(&[3, 4, 5]));
        assert!(tail(x.clone(), 0).expect("tail").is_empty());
        assert_eq!(head(x, 10).expect("head").len(), 5);
    }
}
