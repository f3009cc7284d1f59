//! Type predicates and conversions (`is_*`, `as_*`).

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, BooleanArray, Datum};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use da_columnar::{ArrayLike, DatarError, RArray, RObject, make_array, value_at};
use da_types::{DType, TypeError, Value, ValueKey, cast_value};

use crate::{prepare, scalar_aware};

/// Whether `x` would be treated as a scalar.
#[must_use]
pub fn is_atomic(x: impl Into<ArrayLike>) -> bool {
    da_columnar::is_scalar(&x.into())
}

fn engine_type(x: impl Into<ArrayLike>) -> Result<DataType, DatarError> {
    Ok(make_array(x, None)?.data_type().clone())
}

pub fn is_character(x: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    Ok(matches!(engine_type(x)?, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View))
}

pub fn is_double(x: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    Ok(matches!(engine_type(x)?, DataType::Float64))
}

pub fn is_integer(x: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    Ok(engine_type(x)?.is_integer())
}

pub fn is_logical(x: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    Ok(matches!(engine_type(x)?, DataType::Boolean))
}

pub fn is_numeric(x: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    let dt = engine_type(x)?;
    Ok(dt.is_integer() || dt.is_floating())
}

pub fn is_complex(_x: impl Into<ArrayLike>) -> Result<bool, DatarError> {
    Ok(false)
}

fn scalar_bool(x: ArrayLike) -> Option<bool> {
    match x {
        ArrayLike::Value(Value::Bool(b)) => Some(b),
        ArrayLike::EngineScalar(scalar) => {
            let (array, _) = scalar.get();
            match value_at(array, 0) {
                Ok(Value::Bool(b)) => Some(b),
                _ => None,
            }
        }
        _ => None,
    }
}

/// `TRUE` only for a scalar logical `TRUE`.
#[must_use]
pub fn is_true(x: impl Into<ArrayLike>) -> bool {
    scalar_bool(x.into()) == Some(true)
}

/// `TRUE` only for a scalar logical `FALSE`.
#[must_use]
pub fn is_false(x: impl Into<ArrayLike>) -> bool {
    scalar_bool(x.into()) == Some(false)
}

/// Whether `x` is the missing scalar itself.
#[must_use]
pub fn is_null(x: impl Into<ArrayLike>) -> bool {
    match x.into() {
        ArrayLike::Value(v) => v.is_null(),
        ArrayLike::EngineScalar(scalar) => {
            let (array, _) = scalar.get();
            array.data_type() == &DataType::Null
        }
        _ => false,
    }
}

/// Membership of each element of `x` in `y`. `NA` matches `NA`.
pub fn is_element(x: impl Into<ArrayLike>, y: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let table: HashSet<ValueKey> = make_array(y, None)?
        .values()?
        .iter()
        .map(Value::key)
        .collect();
    let out: BooleanArray = x
        .values()?
        .iter()
        .map(|v| Some(table.contains(&v.key())))
        .collect();
    scalar_aware(scalar, RArray::create(Arc::new(out))?)
}

fn elementwise_test(
    x: impl Into<ArrayLike>,
    test: impl Fn(&Value) -> bool,
) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let out: BooleanArray = x.values()?.iter().map(|v| Some(test(v))).collect();
    scalar_aware(scalar, RArray::create(Arc::new(out))?)
}

pub fn is_finite(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    elementwise_test(x, |v| match v {
        Value::Float(f) => f.is_finite(),
        Value::Int(_) | Value::Bool(_) => true,
        _ => false,
    })
}

pub fn is_infinite(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    elementwise_test(x, |v| matches!(v, Value::Float(f) if f.is_infinite()))
}

/// `NA` or `NaN`.
pub fn is_na(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    elementwise_test(x, Value::is_missing)
}

fn convert(x: &RArray, scalar: bool, target: DType) -> Result<RObject, DatarError> {
    let values = x
        .values()?
        .into_iter()
        .map(|v| cast_value(v, target))
        .collect::<Result<Vec<_>, _>>()?;
    scalar_aware(scalar, RArray::from_values_typed(&values, &target.canonical())?)
}

/// Format elements as strings; missing values stay missing.
pub fn as_character(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    convert(&x, scalar, DType::Utf8)
}

pub fn as_double(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    convert(&x, scalar, DType::Float64)
}

/// Integers. Doubles are floored; factors give their 0-based codes.
pub fn as_integer(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    if let Some(indices) = x.indices() {
        return Ok(RObject::Array(RArray::create(Arc::clone(indices))?));
    }
    if matches!(x.dtype(), Some(DType::Float64)) {
        let floored = crate::doubles(&x, "as_integer")?
            .into_iter()
            .map(|v| v.map(f64::floor).filter(|f| f.abs() < i64::MAX as f64))
            .collect();
        let floored = crate::from_doubles(floored)?.cast(&DataType::Int64)?;
        return scalar_aware(scalar, floored);
    }
    convert(&x, scalar, DType::Int64)
}

/// Logicals. Strings are `TRUE` when non-empty.
pub fn as_logical(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    if matches!(x.dtype(), Some(DType::Utf8)) {
        let out: BooleanArray = x
            .values()?
            .iter()
            .map(|v| v.as_str().map(|s| !s.is_empty()))
            .collect();
        return scalar_aware(scalar, RArray::create(Arc::new(out))?);
    }
    let out = cast(x.storage().as_ref(), &DataType::Boolean)?;
    scalar_aware(scalar, RArray::create(out)?)
}

/// Integers when every element converts losslessly, doubles otherwise.
pub fn as_numeric(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let values = x.values()?;
    let attempt = |target: DType| -> Result<Vec<Value>, TypeError> {
        values.iter().cloned().map(|v| cast_value(v, target)).collect()
    };
    let (converted, target) = match attempt(DType::Int64) {
        Ok(ints) => (ints, DType::Int64),
        Err(_) => match attempt(DType::Float64) {
            Ok(doubles) => (doubles, DType::Float64),
            Err(_) => {
                return Err(TypeError::Conversion {
                    value: x.to_string(),
                    target: "numeric".to_owned(),
                }
                .into());
            }
        },
    };
    scalar_aware(scalar, RArray::from_values_typed(&converted, &target.canonical())?)
}

#[must_use]
pub fn as_null(_x: impl Into<ArrayLike>) -> Value {
    Value::Null
}

pub fn as_complex(_x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    Err(DatarError::unsupported(
        "as_complex",
        "complex numbers are not available on the arrow backend",
    ))
}
