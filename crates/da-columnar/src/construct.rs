use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Datum, Float32Array, Float64Array, Int64Array, Scalar,
};
use arrow::compute::is_null as engine_is_null;
use arrow::datatypes::{DataType, Float32Type, Float64Type};
use chrono::{NaiveDate, NaiveDateTime};
use da_types::{DtypeSpec, HostType, TypeError, Value, get_dtype};
use ndarray::{Array1, ArrayD};

use crate::{DatarError, RArray, RObject, array_from_values, cast_strict, value_at};

/// A dense numeric buffer of any dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericBuffer {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
}

impl NumericBuffer {
    #[must_use]
    pub fn ndim(&self) -> usize {
        match self {
            Self::Float(buf) => buf.ndim(),
            Self::Int(buf) => buf.ndim(),
        }
    }

    fn to_engine(&self) -> ArrayRef {
        match self {
            Self::Float(buf) => Arc::new(
                buf.iter()
                    .map(|v| (!v.is_nan()).then_some(*v))
                    .collect::<Float64Array>(),
            ),
            Self::Int(buf) => Arc::new(buf.iter().copied().collect::<Int64Array>()),
        }
    }

    fn first(&self) -> Value {
        match self {
            Self::Float(buf) => buf.iter().next().map_or(Value::Null, |v| Value::Float(*v)),
            Self::Int(buf) => buf.iter().next().map_or(Value::Null, |v| Value::Int(*v)),
        }
    }
}

/// Every kind of input the constructor accepts.
pub enum ArrayLike {
    Wrapped(RArray),
    Buffer(NumericBuffer),
    Arrow(ArrayRef),
    Lazy(Box<dyn Iterator<Item = Value>>),
    EngineScalar(Scalar<ArrayRef>),
    Value(Value),
    Seq(Vec<Value>),
    /// A mapping. It is a collection, and materializes as its keys.
    Record(Vec<(String, Value)>),
    Type(HostType),
}

impl ArrayLike {
    /// Wrap an iterator so it is consumed only when an array is built.
    pub fn lazy<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::Lazy(Box::new(iter.into_iter()))
    }
}

impl fmt::Debug for ArrayLike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wrapped(array) => f.debug_tuple("Wrapped").field(array).finish(),
            Self::Buffer(buf) => f.debug_tuple("Buffer").field(buf).finish(),
            Self::Arrow(array) => f.debug_tuple("Arrow").field(array.data_type()).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
            Self::EngineScalar(scalar) => f
                .debug_tuple("EngineScalar")
                .field(scalar.get().0.data_type())
                .finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Seq(values) => f.debug_tuple("Seq").field(values).finish(),
            Self::Record(entries) => f.debug_tuple("Record").field(entries).finish(),
            Self::Type(host) => f.debug_tuple("Type").field(host).finish(),
        }
    }
}

impl From<RArray> for ArrayLike {
    fn from(value: RArray) -> Self {
        Self::Wrapped(value)
    }
}

impl From<&RArray> for ArrayLike {
    fn from(value: &RArray) -> Self {
        Self::Wrapped(value.clone())
    }
}

impl From<ArrayRef> for ArrayLike {
    fn from(value: ArrayRef) -> Self {
        Self::Arrow(value)
    }
}

impl From<Scalar<ArrayRef>> for ArrayLike {
    fn from(value: Scalar<ArrayRef>) -> Self {
        Self::EngineScalar(value)
    }
}

impl From<NumericBuffer> for ArrayLike {
    fn from(value: NumericBuffer) -> Self {
        Self::Buffer(value)
    }
}

impl From<ArrayD<f64>> for ArrayLike {
    fn from(value: ArrayD<f64>) -> Self {
        Self::Buffer(NumericBuffer::Float(value))
    }
}

impl From<Array1<f64>> for ArrayLike {
    fn from(value: Array1<f64>) -> Self {
        Self::Buffer(NumericBuffer::Float(value.into_dyn()))
    }
}

impl From<ArrayD<i64>> for ArrayLike {
    fn from(value: ArrayD<i64>) -> Self {
        Self::Buffer(NumericBuffer::Int(value))
    }
}

impl From<Array1<i64>> for ArrayLike {
    fn from(value: Array1<i64>) -> Self {
        Self::Buffer(NumericBuffer::Int(value.into_dyn()))
    }
}

impl From<HostType> for ArrayLike {
    fn from(value: HostType) -> Self {
        Self::Type(value)
    }
}

impl From<RObject> for ArrayLike {
    fn from(value: RObject) -> Self {
        match value {
            RObject::Array(array) => Self::Wrapped(array),
            RObject::Value(value) => Self::Value(value),
            RObject::List(items) => Self::Seq(
                items
                    .into_iter()
                    .map(|item| item.into_value().unwrap_or(Value::Null))
                    .collect(),
            ),
        }
    }
}

impl From<Vec<(String, Value)>> for ArrayLike {
    fn from(value: Vec<(String, Value)>) -> Self {
        Self::Record(value)
    }
}

impl From<&[Value]> for ArrayLike {
    fn from(value: &[Value]) -> Self {
        Self::Seq(value.to_vec())
    }
}

macro_rules! scalar_inputs {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ArrayLike {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }

            impl From<Vec<$ty>> for ArrayLike {
                fn from(values: Vec<$ty>) -> Self {
                    Self::Seq(values.into_iter().map(Value::from).collect())
                }
            }

            impl From<Vec<Option<$ty>>> for ArrayLike {
                fn from(values: Vec<Option<$ty>>) -> Self {
                    Self::Seq(values.into_iter().map(Value::from).collect())
                }
            }
        )*
    };
}

scalar_inputs!(Value, bool, i64, i32, f64, String, NaiveDate, NaiveDateTime);

impl From<&str> for ArrayLike {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<Vec<&str>> for ArrayLike {
    fn from(values: Vec<&str>) -> Self {
        Self::Seq(values.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<Option<&str>>> for ArrayLike {
    fn from(values: Vec<Option<&str>>) -> Self {
        Self::Seq(values.into_iter().map(Value::from).collect())
    }
}

// ── Classifier ─────────────────────────────────────────────────────────

/// R's "vector of length one used as a scalar". Collections and arrays are
/// never scalar, whatever their length; host types always are.
#[must_use]
pub fn is_scalar(x: &ArrayLike) -> bool {
    match x {
        ArrayLike::Wrapped(_)
        | ArrayLike::Arrow(_)
        | ArrayLike::Lazy(_)
        | ArrayLike::Seq(_)
        | ArrayLike::Record(_) => false,
        ArrayLike::Value(_) | ArrayLike::EngineScalar(_) | ArrayLike::Type(_) => true,
        ArrayLike::Buffer(buf) => buf.ndim() == 0,
    }
}

/// Missingness with NaN counted as missing, tested on decoded storage.
pub fn null_mask(storage: &dyn Array) -> Result<BooleanArray, DatarError> {
    let out: BooleanArray = match storage.data_type() {
        DataType::Float64 => {
            let floats = storage.as_primitive::<Float64Type>();
            floats
                .iter()
                .map(|v| Some(v.is_none_or(f64::is_nan)))
                .collect()
        }
        DataType::Float32 => {
            let floats = storage.as_primitive::<Float32Type>();
            floats
                .iter()
                .map(|v| Some(v.is_none_or(f32::is_nan)))
                .collect()
        }
        _ => engine_is_null(storage)?,
    };
    Ok(out)
}

/// Scalar input gives a logical value; anything else a logical array.
pub fn is_null(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let x = x.into();
    let scalar = match &x {
        ArrayLike::Value(value) => Some(value.is_missing()),
        ArrayLike::EngineScalar(scalar) => {
            Some(value_at(scalar.get().0, 0)?.is_missing())
        }
        ArrayLike::Type(_) => Some(false),
        ArrayLike::Buffer(buf) if buf.ndim() == 0 => Some(buf.first().is_missing()),
        _ => None,
    };
    if let Some(missing) = scalar {
        return Ok(RObject::Value(Value::Bool(missing)));
    }
    let array = make_array(x, None)?;
    let mask = null_mask(array.storage().as_ref())?;
    Ok(RObject::Array(RArray::create(Arc::new(mask))?))
}

// ── Constructor ────────────────────────────────────────────────────────

pub(crate) fn fold_nan(array: ArrayRef) -> ArrayRef {
    match array.data_type() {
        DataType::Float64 => {
            let floats = array.as_primitive::<Float64Type>();
            if !floats.values().iter().any(|v| v.is_nan()) {
                return array;
            }
            Arc::new(
                floats
                    .iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect::<Float64Array>(),
            )
        }
        DataType::Float32 => {
            let floats = array.as_primitive::<Float32Type>();
            if !floats.values().iter().any(|v| v.is_nan()) {
                return array;
            }
            Arc::new(
                floats
                    .iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect::<Float32Array>(),
            )
        }
        _ => array,
    }
}

fn cast_to(array: ArrayRef, target: Option<&DataType>) -> Result<ArrayRef, DatarError> {
    match target {
        Some(dt) if dt != array.data_type() => cast_strict(array.as_ref(), dt),
        _ => Ok(array),
    }
}

/// Build a wrapped array from any accepted input.
///
/// Already wrapped arrays are returned unchanged and the requested type is
/// ignored for them. Missing floats (NaN) always become nulls.
pub fn make_array(
    x: impl Into<ArrayLike>,
    dtype: Option<&DtypeSpec>,
) -> Result<RArray, DatarError> {
    let x = match x.into() {
        ArrayLike::Wrapped(array) => return Ok(array),
        other => other,
    };
    let target = get_dtype(dtype)?;
    log::debug!("make_array from {x:?} with target {target:?}");

    let engine = match x {
        ArrayLike::Wrapped(array) => return Ok(array),
        ArrayLike::Buffer(buf) => cast_to(buf.to_engine(), target.as_ref())?,
        ArrayLike::Arrow(array) => cast_to(fold_nan(array), target.as_ref())?,
        ArrayLike::Lazy(iter) => {
            let values: Vec<Value> = iter.collect();
            array_from_values(&values, target.as_ref())?
        }
        ArrayLike::EngineScalar(scalar) => {
            let value = value_at(scalar.get().0, 0)?;
            array_from_values(&[value], target.as_ref())?
        }
        ArrayLike::Value(value) => array_from_values(&[value], target.as_ref())?,
        ArrayLike::Type(host) => {
            return Err(TypeError::Conversion {
                value: host.name().to_owned(),
                target: target.map_or_else(|| "array".to_owned(), |dt| dt.to_string()),
            }
            .into());
        }
        ArrayLike::Seq(values) => array_from_values(&values, target.as_ref())?,
        ArrayLike::Record(entries) => {
            let keys: Vec<Value> = entries.into_iter().map(|(k, _)| Value::Str(k)).collect();
            array_from_values(&keys, target.as_ref())?
        }
    };
    RArray::create(engine)
}

// ── Broadcasting ───────────────────────────────────────────────────────

/// Recycle length-1 arrays to the common length.
///
/// Only one other length may occur besides 1; anything else is a length
/// mismatch. All inputs are built with [`make_array`] first.
pub fn broadcast_arrays(arrays: Vec<ArrayLike>) -> Result<Vec<RArray>, DatarError> {
    let arrays = arrays
        .into_iter()
        .map(|x| make_array(x, None))
        .collect::<Result<Vec<_>, _>>()?;
    let mut lengths: Vec<usize> = arrays.iter().map(RArray::len).collect();
    lengths.sort_unstable();
    lengths.dedup();

    match lengths.as_slice() {
        [] | [_] => Ok(arrays),
        [1, max] => arrays
            .into_iter()
            .map(|array| {
                if array.len() == 1 {
                    array.recycle(*max)
                } else {
                    Ok(array)
                }
            })
            .collect(),
        _ => Err(DatarError::LengthMismatch { lengths }),
    }
}

/// Broadcast, then regroup position `i` of every input into array `i`.
pub fn transpose_arrays(arrays: Vec<ArrayLike>) -> Result<Vec<RArray>, DatarError> {
    let arrays = broadcast_arrays(arrays)?;
    let columns = arrays
        .iter()
        .map(RArray::values)
        .collect::<Result<Vec<_>, _>>()?;
    let len = columns.first().map_or(0, Vec::len);
    (0..len)
        .map(|pos| {
            let row: Vec<Value> = columns.iter().map(|col| col[pos].clone()).collect();
            make_array(row, None)
        })
        .collect()
}

/// Integer positions of a `start:stop:step` slice. Missing bounds default to
/// 0 and a step of exactly 1 makes `stop` inclusive.
pub fn flatten_slice(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<RArray, DatarError> {
    let start = start.unwrap_or(0);
    let mut stop = stop.unwrap_or(0);
    if step == Some(1) {
        stop += 1;
    }
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(DatarError::invalid("flatten_slice", "step cannot be zero"));
    }
    let mut out = Vec::new();
    let mut pos = start;
    while (step > 0 && pos < stop) || (step < 0 && pos > stop) {
        out.push(pos);
        pos += step;
    }
    RArray::create(Arc::new(Int64Array::from(out)))
}
