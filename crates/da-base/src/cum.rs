//! Cumulative sums, products and extremes. Once an element is missing every
//! later position is missing too.

use da_columnar::{ArrayLike, DatarError, RObject};
use da_types::DType;

use crate::{
    doubles, finite_or_missing, from_doubles, from_ints, prepare, require_numeric, scalar_aware,
};

fn accumulate<T: Copy>(values: Vec<Option<T>>, step: impl Fn(T, T) -> Option<T>) -> Vec<Option<T>> {
    let mut acc: Option<T> = None;
    let mut poisoned = false;
    values
        .into_iter()
        .map(|v| {
            if poisoned {
                return None;
            }
            let next = match (acc, v) {
                (_, None) => None,
                (None, Some(v)) => Some(v),
                (Some(a), Some(v)) => step(a, v),
            };
            poisoned = next.is_none();
            acc = next;
            next
        })
        .collect()
}

fn cumulate(
    x: impl Into<ArrayLike>,
    func: &str,
    int_step: Option<fn(i64, i64) -> Option<i64>>,
    float_step: fn(f64, f64) -> f64,
) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    require_numeric(&x, func)?;
    if let (Some(int_step), Some(DType::Int64 | DType::Bool)) = (int_step, x.dtype()) {
        let ints: Vec<Option<i64>> = x.values()?.into_iter().map(|v| v.to_i64().ok()).collect();
        return scalar_aware(scalar, from_ints(accumulate(ints, int_step))?);
    }
    let vals = finite_or_missing(doubles(&x, func)?);
    let out = accumulate(vals, |a, b| Some(float_step(a, b)));
    scalar_aware(scalar, from_doubles(out)?)
}

/// Running sum; integers overflow to `NA`.
pub fn cumsum(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    cumulate(x, "cumsum", Some(i64::checked_add), |a, b| a + b)
}

/// Running product, always double.
pub fn cumprod(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    cumulate(x, "cumprod", None, |a, b| a * b)
}

pub fn cummax(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    cumulate(x, "cummax", Some(|a: i64, b: i64| Some(a.max(b))), f64::max)
}

pub fn cummin(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    cumulate(x, "cummin", Some(|a: i64, b: i64| Some(a.min(b))), f64::min)
}
