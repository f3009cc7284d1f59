//! Sequences, repetition, concatenation, ordering and matching.
//!
//! Positions returned by [`order`], [`match_`] and friends are 0-based.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::Float64Array;
use da_columnar::{ArrayLike, DatarError, RArray, RObject, flatten_slice, is_scalar, make_array};
use da_types::{Value, ValueKey};

use crate::{first_arg, from_positions};

/// Repeat `x`.
///
/// A scalar `times` repeats the whole vector (each element `each` times in a
/// row); a vector `times` gives a count per element. `length` truncates or
/// recycles the result to that many elements.
pub fn rep(
    x: impl Into<ArrayLike>,
    times: impl Into<ArrayLike>,
    length: Option<ArrayLike>,
    each: usize,
) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let n = x.len();
    let counts = make_array(times, None)?
        .values()?
        .iter()
        .map(|v| {
            v.to_i64()
                .ok()
                .and_then(|t| usize::try_from(t).ok())
                .ok_or_else(|| DatarError::invalid("rep", "invalid 'times' argument"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut positions = Vec::new();
    match counts.as_slice() {
        [] => return Err(DatarError::invalid("rep", "invalid 'times' argument")),
        [times] => {
            for _ in 0..*times {
                for pos in 0..n {
                    positions.extend(std::iter::repeat_n(pos, each));
                }
            }
        }
        counts => {
            if counts.len() != n {
                return Err(DatarError::invalid(
                    "rep",
                    format!("invalid 'times' argument: expect length {n}, got {}", counts.len()),
                ));
            }
            if each != 1 {
                return Err(DatarError::invalid(
                    "rep",
                    "unexpected 'each' argument when 'times' is a vector",
                ));
            }
            for (pos, count) in counts.iter().enumerate() {
                positions.extend(std::iter::repeat_n(pos, *count));
            }
        }
    }

    if let Some(length) = length {
        let length = first_arg(length, "rep", "length")?.to_i64()?;
        let length = usize::try_from(length)
            .map_err(|_| DatarError::invalid("rep", "invalid 'length' argument"))?;
        positions = positions.iter().copied().cycle().take(length).collect();
    }
    x.take(&positions)
}

/// Concatenate values, coercing to their common class.
pub fn c_(args: Vec<ArrayLike>) -> Result<RArray, DatarError> {
    let mut values = Vec::new();
    for arg in args {
        values.extend(make_array(arg, None)?.values()?);
    }
    RArray::from_values(&values)
}

/// One element of `c[...]` indexing.
#[derive(Debug)]
pub enum CItem {
    /// `start:stop:step`, expanded with [`flatten_slice`].
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    Items(ArrayLike),
}

impl From<ArrayLike> for CItem {
    fn from(value: ArrayLike) -> Self {
        Self::Items(value)
    }
}

/// `c[1:3, 7]`: expand slices and concatenate.
pub fn c_getitem(items: Vec<CItem>) -> Result<RArray, DatarError> {
    let parts = items
        .into_iter()
        .map(|item| match item {
            CItem::Slice { start, stop, step } => {
                flatten_slice(start, stop, step).map(ArrayLike::from)
            }
            CItem::Items(items) => Ok(items),
        })
        .collect::<Result<Vec<_>, _>>()?;
    c_(parts)
}

pub fn length(x: impl Into<ArrayLike>) -> Result<usize, DatarError> {
    Ok(make_array(x, None)?.len())
}

/// Length of every element; for an atomic vector each element has length 1.
pub fn lengths(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let n = length(x)?;
    from_positions(std::iter::repeat_n(1, n))
}

/// Lengths of the items of a list result such as `strsplit`'s.
pub fn list_lengths(items: &[RObject]) -> Result<RArray, DatarError> {
    from_positions(items.iter().map(|item| match item {
        RObject::Array(arr) => arr.len(),
        RObject::Value(_) => 1,
        RObject::List(inner) => inner.len(),
    }))
}

fn ordering(values: &[Value], decreasing: bool, na_last: bool) -> Vec<usize> {
    let (mut present, missing): (Vec<usize>, Vec<usize>) =
        (0..values.len()).partition(|pos| !values[*pos].is_missing());
    present.sort_by(|a, b| {
        let ord = values[*a].compare(&values[*b]).unwrap_or(Ordering::Equal);
        if decreasing { ord.reverse() } else { ord }
    });
    if na_last {
        present.extend(missing);
        present
    } else {
        missing.into_iter().chain(present).collect()
    }
}

/// Positions that sort `x`; ties keep their original order.
pub fn order(
    x: impl Into<ArrayLike>,
    decreasing: bool,
    na_last: bool,
) -> Result<RArray, DatarError> {
    let values = make_array(x, None)?.values()?;
    from_positions(ordering(&values, decreasing, na_last))
}

pub fn sort(
    x: impl Into<ArrayLike>,
    decreasing: bool,
    na_last: bool,
) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let positions = ordering(&x.values()?, decreasing, na_last);
    x.take(&positions)
}

pub fn rev(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let positions: Vec<usize> = (0..x.len()).rev().collect();
    x.take(&positions)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiesMethod {
    #[default]
    Average,
    Min,
    Max,
    Dense,
    First,
}

impl FromStr for TiesMethod {
    type Err = DatarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average" => Ok(Self::Average),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "dense" => Ok(Self::Dense),
            "first" => Ok(Self::First),
            other => Err(DatarError::invalid("rank", format!("unknown ties method {other:?}"))),
        }
    }
}

/// 1-based ranks; missing values rank after everything else.
pub fn rank(
    x: impl Into<ArrayLike>,
    na_last: bool,
    ties: TiesMethod,
) -> Result<RArray, DatarError> {
    if !na_last {
        return Err(DatarError::unsupported("rank", "`na_last = false`"));
    }
    let values = make_array(x, None)?.values()?;
    let sorted = ordering(&values, false, true);
    let mut ranks = vec![0.0; values.len()];

    let mut start = 0;
    let mut dense = 0.0;
    while start < sorted.len() {
        let first = &values[sorted[start]];
        if first.is_missing() {
            ranks[sorted[start]] = (start + 1) as f64;
            start += 1;
            continue;
        }
        let mut end = start + 1;
        while end < sorted.len() && first.compare(&values[sorted[end]]) == Some(Ordering::Equal) {
            end += 1;
        }
        dense += 1.0;
        for (offset, pos) in sorted[start..end].iter().enumerate() {
            ranks[*pos] = match ties {
                TiesMethod::Average => (start + 1 + end) as f64 / 2.0,
                TiesMethod::Min => (start + 1) as f64,
                TiesMethod::Max => end as f64,
                TiesMethod::Dense => dense,
                TiesMethod::First => (start + offset + 1) as f64,
            };
        }
        start = end;
    }
    RArray::create(Arc::new(Float64Array::from(ranks)))
}

/// Arguments of [`seq`]. Unset fields follow R's defaults.
#[derive(Debug, Default)]
pub struct SeqArgs {
    /// A scalar start, or a vector to count along.
    pub from: Option<ArrayLike>,
    pub to: Option<Value>,
    pub by: Option<Value>,
    pub length_out: Option<usize>,
    pub along_with: Option<ArrayLike>,
}

fn number(value: &Value, name: &str) -> Result<f64, DatarError> {
    let v = value.to_f64()?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DatarError::invalid("seq", format!("'{name}' must be a finite number")))
    }
}

/// R's `seq`.
pub fn seq(args: SeqArgs) -> Result<RArray, DatarError> {
    if let Some(along) = args.along_with {
        return seq_along(along);
    }
    let from = match args.from {
        Some(from) if !is_scalar(&from) => return seq_along(from),
        Some(from) => Some(make_array(from, None)?.first()?),
        None => None,
    };
    let (from, to) = match (from, args.to) {
        (None, None) => match args.length_out {
            Some(n) if args.by.is_none() => return seq_len(n as i64),
            _ => (Value::Int(1), None),
        },
        (None, Some(to)) => (Value::Int(1), Some(to)),
        (Some(from), None) if args.by.is_none() && args.length_out.is_none() => {
            (Value::Int(1), Some(from))
        }
        (Some(from), to) => (from, to),
    };

    let start = number(&from, "from")?;
    let all_ints = matches!(from, Value::Int(_))
        && to.as_ref().is_none_or(|v| matches!(v, Value::Int(_)))
        && args.by.as_ref().is_none_or(|v| matches!(v, Value::Int(_)));

    let (by, count, integral) = match (to.as_ref(), args.by.as_ref(), args.length_out) {
        (Some(to), None, Some(len)) => {
            let end = number(to, "to")?;
            let by = if len > 1 { (end - start) / (len - 1) as f64 } else { 0.0 };
            (by, len, false)
        }
        (Some(to), Some(by), _) => {
            let end = number(to, "to")?;
            let by = number(by, "by")?;
            let span = end - start;
            if by == 0.0 {
                if span == 0.0 {
                    return RArray::from_values(&[from]);
                }
                return Err(DatarError::invalid("seq", "invalid '(to - from)/by'"));
            }
            if span / by < 0.0 {
                return Err(DatarError::invalid("seq", "wrong sign in 'by' argument"));
            }
            (by, (span / by + 1e-10).floor() as usize + 1, all_ints)
        }
        (Some(to), None, None) => {
            let span = number(to, "to")? - start;
            let by = if span < 0.0 { -1.0 } else { 1.0 };
            let integral = matches!(from, Value::Int(_)) || start.fract() == 0.0;
            (by, (span.abs() + 1e-10).floor() as usize + 1, integral)
        }
        (None, Some(by), Some(len)) => (number(by, "by")?, len, all_ints),
        (None, None, Some(len)) => (1.0, len, all_ints),
        (None, _, None) => return Err(DatarError::invalid("seq", "too few arguments")),
    };

    let values: Vec<Value> = (0..count)
        .map(|i| {
            let v = start + i as f64 * by;
            if integral { Value::Int(v as i64) } else { Value::Float(v) }
        })
        .collect();
    RArray::from_values(&values)
}

/// `1..=length(x)`.
pub fn seq_along(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let n = length(x)?;
    from_positions(1..=n)
}

/// `1..=n`; a vector uses its first element.
pub fn seq_len(length_out: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let n = first_arg(length_out, "seq_len", "length_out")?.to_i64()?;
    let n = usize::try_from(n)
        .map_err(|_| DatarError::invalid("seq_len", "argument of length 0 or negative"))?;
    from_positions(1..=n)
}

/// Position of the first match of each element of `x` in `table`, or
/// `nomatch`.
pub fn match_(
    x: impl Into<ArrayLike>,
    table: impl Into<ArrayLike>,
    nomatch: i64,
) -> Result<RArray, DatarError> {
    let mut first: HashMap<ValueKey, i64> = HashMap::new();
    for (pos, value) in make_array(table, None)?.values()?.iter().enumerate() {
        first.entry(value.key()).or_insert(pos as i64);
    }
    let out = make_array(x, None)?
        .values()?
        .iter()
        .map(|v| Some(first.get(&v.key()).copied().unwrap_or(nomatch)))
        .collect();
    crate::from_ints(out)
}

#[cfg(test)]
mod tests {
    use da_columnar::{ArrayLike, DatarError, RArray, RObject};
    use da_types::Value;

    use super::{
        CItem, SeqArgs, TiesMethod, c_, c_getitem, length, lengths, list_lengths, match_, order,
        rank, rep, rev, seq, seq_along, seq_len, sort,
    };

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    fn floats(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::Float).collect()
    }

    #[test]
    fn rep_times_each_and_length() {
        let out = rep(vec![1i64, 2], 2i64, None, 1).expect("rep");
        assert_eq!(out.values().expect("values"), ints(&[1, 2, 1, 2]));
        let out = rep(vec![1i64, 2], 2i64, None, 2).expect("rep");
        assert_eq!(out.values().expect("values"), ints(&[1, 1, 2, 2, 1, 1, 2, 2]));
        let out = rep(vec![1i64, 2], vec![1i64, 3], None, 1).expect("rep");
        assert_eq!(out.values().expect("values"), ints(&[1, 2, 2, 2]));
        let out = rep(vec![1i64, 2, 3], 1i64, Some(vec![5i64, 9].into()), 1).expect("rep");
        assert_eq!(out.values().expect("values"), ints(&[1, 2, 3, 1, 2]));
    }

    #[test]
    fn rep_rejects_bad_times() {
        assert!(matches!(
            rep(vec![1i64, 2], vec![1i64, 2, 3], None, 1),
            Err(DatarError::InvalidArgument { .. })
        ));
        assert!(rep(vec![1i64, 2], vec![1i64, 2], None, 2).is_err());
        assert!(rep(vec![1i64], -1i64, None, 1).is_err());
    }

    #[test]
    fn rep_keeps_factor_levels() {
        let fct = RArray::from_values(&[Value::from("a"), Value::from("b")])
            .expect("build")
            .dictionary_encode()
            .expect("encode");
        let out = rep(fct, 2i64, None, 1).expect("rep");
        assert!(out.is_factor());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn concatenation_and_getitem() {
        let out = c_(vec![1i64.into(), vec![2.5].into()]).expect("c");
        assert_eq!(out.values().expect("values"), floats(&[1.0, 2.5]));
        let out = c_getitem(vec![
            CItem::Slice {
                start: Some(1),
                stop: Some(3),
                step: Some(1),
            },
            CItem::from(ArrayLike::from(7i64)),
        ])
        .expect("c[]");
        assert_eq!(out.values().expect("values"), ints(&[1, 2, 3, 7]));
    }

    #[test]
    fn lengths_of_vectors_and_lists() {
        assert_eq!(length(vec![1i64, 2, 3]).expect("length"), 3);
        assert_eq!(length(5i64).expect("length"), 1);
        assert_eq!(
            lengths(vec!["a", "b"]).expect("lengths").values().expect("values"),
            ints(&[1, 1])
        );
        let list = vec![
            RObject::Array(RArray::from_values(&ints(&[1, 2])).expect("build")),
            RObject::Value(Value::Int(3)),
        ];
        assert_eq!(list_lengths(&list).expect("lengths").values().expect("values"), ints(&[2, 1]));
    }

    #[test]
    fn order_and_sort_place_missing() {
        let x = vec![Some(3i64), None, Some(1), Some(2)];
        assert_eq!(
            order(x.clone(), false, true).expect("order").values().expect("values"),
            ints(&[2, 3, 0, 1])
        );
        assert_eq!(
            order(x.clone(), true, false).expect("order").values().expect("values"),
            ints(&[1, 0, 3, 2])
        );
        assert_eq!(
            sort(x, false, true).expect("sort").values().expect("values"),
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Null]
        );
        assert_eq!(rev(vec![1i64, 2, 3]).expect("rev").values().expect("values"), ints(&[3, 2, 1]));
    }

    #[test]
    fn rank_tie_methods() {
        let x = vec![10i64, 20, 10, 30];
        let rank_with = |ties: TiesMethod| {
            rank(x.clone(), true, ties)
                .expect("rank")
                .values()
                .expect("values")
        };
        assert_eq!(rank_with(TiesMethod::Average), floats(&[1.5, 3.0, 1.5, 4.0]));
        assert_eq!(rank_with(TiesMethod::Min), floats(&[1.0, 3.0, 1.0, 4.0]));
        assert_eq!(rank_with(TiesMethod::Max), floats(&[2.0, 3.0, 2.0, 4.0]));
        assert_eq!(rank_with(TiesMethod::Dense), floats(&[1.0, 2.0, 1.0, 3.0]));
        assert_eq!(rank_with(TiesMethod::First), floats(&[1.0, 3.0, 2.0, 4.0]));
        assert!(matches!(rank(x, false, TiesMethod::Average), Err(DatarError::Unsupported { .. })));
        assert!("bogus".parse::<TiesMethod>().is_err());
    }

    #[test]
    fn seq_follows_r_defaults() {
        let ten = seq(SeqArgs {
            from: Some(3i64.into()),
            ..SeqArgs::default()
        })
        .expect("seq");
        assert_eq!(ten.values().expect("values"), ints(&[1, 2, 3]));

        let by = seq(SeqArgs {
            from: Some(1i64.into()),
            to: Some(Value::Int(10)),
            by: Some(Value::Int(3)),
            ..SeqArgs::default()
        })
        .expect("seq");
        assert_eq!(by.values().expect("values"), ints(&[1, 4, 7, 10]));

        let down = seq(SeqArgs {
            from: Some(3i64.into()),
            to: Some(Value::Int(1)),
            ..SeqArgs::default()
        })
        .expect("seq");
        assert_eq!(down.values().expect("values"), ints(&[3, 2, 1]));

        let spaced = seq(SeqArgs {
            from: Some(0.0.into()),
            to: Some(Value::Float(1.0)),
            length_out: Some(5),
            ..SeqArgs::default()
        })
        .expect("seq");
        assert_eq!(spaced.values().expect("values"), floats(&[0.0, 0.25, 0.5, 0.75, 1.0]));

        let along = seq(SeqArgs {
            from: Some(vec!["a", "b"].into()),
            ..SeqArgs::default()
        })
        .expect("seq");
        assert_eq!(along.values().expect("values"), ints(&[1, 2]));

        assert!(seq(SeqArgs {
            from: Some(1i64.into()),
            to: Some(Value::Int(5)),
            by: Some(Value::Int(-1)),
            ..SeqArgs::default()
        })
        .is_err());
    }

    #[test]
    fn seq_along_and_len() {
        assert_eq!(
            seq_along(vec![9i64, 9]).expect("along").values().expect("values"),
            ints(&[1, 2])
        );
        assert_eq!(seq_len(3i64).expect("len").values().expect("values"), ints(&[1, 2, 3]));
        assert_eq!(seq_len(vec![2i64, 5]).expect("len").values().expect("values"), ints(&[1, 2]));
        assert!(seq_len(-1i64).is_err());
    }

    #[test]
    fn match_finds_first_positions() {
        let out = match_(vec!["b", "z", "a"], vec!["a", "b", "b"], -1).expect("match");
        assert_eq!(out.values().expect("values"), ints(&[1, -1, 0]));
    }
}
