#![forbid(unsafe_code)]

//! R base functions over wrapped arrow arrays.
//!
//! Every function accepts anything convertible into [`ArrayLike`] and returns
//! either a host [`Value`] or an [`RArray`] (through [`RObject`] when the
//! result shape depends on whether the input was scalar).

pub mod arithm;
pub mod asis;
pub mod bessel;
pub mod constants;
pub mod cum;
pub mod date;
pub mod factor;
pub mod options;
pub mod random;
pub mod seq;
pub mod sets;
pub mod special;
pub mod string;
pub mod trig;
pub mod which;

use std::sync::Arc;

use arrow::array::{AsArray, Float64Array, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
pub use da_columnar::{ArrayLike, DatarError, RArray, RObject, is_scalar, make_array};
use da_types::{DType, Value};

/// Build the input array and remember whether it was a scalar.
pub(crate) fn prepare(x: impl Into<ArrayLike>) -> Result<(RArray, bool), DatarError> {
    let x = x.into();
    let scalar = is_scalar(&x);
    Ok((make_array(x, None)?, scalar))
}

/// Collapse to the first element when the input was a scalar.
pub(crate) fn scalar_aware(scalar: bool, out: RArray) -> Result<RObject, DatarError> {
    if scalar {
        Ok(RObject::Value(out.first()?))
    } else {
        Ok(RObject::Array(out))
    }
}

pub(crate) fn require_numeric(x: &RArray, func: &str) -> Result<(), DatarError> {
    match x.dtype() {
        Some(DType::Null | DType::Bool | DType::Int64 | DType::Float64) => Ok(()),
        _ => Err(DatarError::unsupported(
            func,
            format!("non-numeric argument of type {}", x.data_type()),
        )),
    }
}

/// Elements as doubles, `None` where missing.
pub(crate) fn doubles(x: &RArray, func: &str) -> Result<Vec<Option<f64>>, DatarError> {
    require_numeric(x, func)?;
    let data = cast(x.storage().as_ref(), &DataType::Float64)?;
    Ok(data.as_primitive::<Float64Type>().iter().collect())
}

pub(crate) fn from_doubles(values: Vec<Option<f64>>) -> Result<RArray, DatarError> {
    RArray::create(Arc::new(Float64Array::from(values)))
}

pub(crate) fn from_ints(values: Vec<Option<i64>>) -> Result<RArray, DatarError> {
    RArray::create(Arc::new(Int64Array::from(values)))
}

pub(crate) fn from_positions(
    positions: impl IntoIterator<Item = usize>,
) -> Result<RArray, DatarError> {
    RArray::create(Arc::new(Int64Array::from_iter_values(
        positions.into_iter().map(|p| p as i64),
    )))
}

/// Apply `f` to every present element as a double, keeping missing slots.
pub(crate) fn map_doubles(
    x: impl Into<ArrayLike>,
    func: &str,
    f: impl Fn(f64) -> f64,
) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let out = doubles(&x, func)?
        .into_iter()
        .map(|v| v.map(&f))
        .collect();
    scalar_aware(scalar, from_doubles(out)?)
}

/// Broadcast two inputs and apply `f` pairwise on doubles. The result is a
/// value only when both inputs were scalars.
pub(crate) fn zip_doubles(
    x: impl Into<ArrayLike>,
    y: impl Into<ArrayLike>,
    func: &str,
    f: impl Fn(f64, f64) -> Result<f64, DatarError>,
) -> Result<RObject, DatarError> {
    let (x, y) = (x.into(), y.into());
    let scalar = is_scalar(&x) && is_scalar(&y);
    let arrays = da_columnar::broadcast_arrays(vec![x, y])?;
    let (lhs, rhs) = (doubles(&arrays[0], func)?, doubles(&arrays[1], func)?);
    let out = lhs
        .into_iter()
        .zip(rhs)
        .map(|pair| match pair {
            (Some(a), Some(b)) => f(a, b).map(Some),
            _ => Ok(None),
        })
        .collect::<Result<Vec<_>, _>>()?;
    scalar_aware(scalar, from_doubles(out)?)
}

/// Present values, or `None` when a missing value is present and must
/// propagate.
pub(crate) fn present<T>(values: Vec<Option<T>>, na_rm: bool) -> Option<Vec<T>> {
    if !na_rm && values.iter().any(Option::is_none) {
        return None;
    }
    Some(values.into_iter().flatten().collect())
}

/// Doubles with NaN counted as missing.
pub(crate) fn finite_or_missing(values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect()
}

/// The first element of a vector-valued argument where R uses only one.
pub(crate) fn first_arg(
    arg: impl Into<ArrayLike>,
    func: &str,
    name: &str,
) -> Result<Value, DatarError> {
    let arg = arg.into();
    if is_scalar(&arg) {
        return make_array(arg, None)?.first();
    }
    let arr = make_array(arg, None)?;
    if arr.len() > 1 {
        log::warn!(
            "[da-base] In {func}(...): argument `{name}` has length > 1 and only the first \
             element will be used"
        );
    }
    if arr.is_empty() {
        return Err(DatarError::invalid(func, format!("`{name}` is empty")));
    }
    arr.get(0)
}
