#![forbid(unsafe_code)]

mod construct;
pub mod ops;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array, Datum, DictionaryArray,
    DurationNanosecondArray, Float64Array, Int32Array, Int64Array, Scalar, StringArray,
    Time64NanosecondArray, TimestampNanosecondArray, UInt64Array, make_array as array_from_data,
    new_null_array,
};
use arrow::compute::{CastOptions, cast, cast_with_options, filter, take};
use arrow::datatypes::{
    DataType, Date32Type, DurationNanosecondType, Float64Type, Int32Type, Int64Type,
    Time64NanosecondType, TimestampNanosecondType,
};
use arrow::error::ArrowError;
use da_types::{
    DType, TypeError, Value, ValueKey, cast_value, date_from_epoch_days, datetime_from_nanos,
    datetime_to_nanos, days_since_epoch, infer_dtype, time_from_nanos, time_to_nanos,
};
use thiserror::Error;

pub use construct::{
    ArrayLike, NumericBuffer, broadcast_arrays, flatten_slice, is_null, is_scalar, make_array,
    null_mask, transpose_arrays,
};
pub use ops::{BinaryOp, Operand, UnaryOp, binop, unop};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatarError {
    #[error("arrays must be of length 1 or the max length, got lengths {lengths:?}")]
    LengthMismatch { lengths: Vec<usize> },
    #[error("{op} is not supported: {detail}")]
    Unsupported { op: String, detail: String },
    #[error("`{feature}` is required for this function, install it with `{install}`")]
    MissingDependency { feature: String, install: String },
    #[error("invalid argument to {func}: {detail}")]
    InvalidArgument { func: String, detail: String },
    #[error("engine error: {0}")]
    Engine(String),
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl DatarError {
    pub fn unsupported(op: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Unsupported {
            op: op.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid(func: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            func: func.into(),
            detail: detail.into(),
        }
    }
}

impl From<ArrowError> for DatarError {
    fn from(err: ArrowError) -> Self {
        Self::Engine(err.to_string())
    }
}

/// Cast that fails where arrow's default cast would null out or truncate a
/// value the target cannot hold.
pub(crate) fn cast_strict(array: &dyn Array, target: &DataType) -> Result<ArrayRef, DatarError> {
    if target.is_integer() && array.data_type().is_floating() {
        let doubles = cast(array, &DataType::Float64)?;
        let lossy = doubles
            .as_primitive::<Float64Type>()
            .iter()
            .flatten()
            .find(|v| v.fract() != 0.0);
        if let Some(value) = lossy {
            return Err(TypeError::LossyFloatToInt { value }.into());
        }
    }
    let options = CastOptions {
        safe: false,
        ..CastOptions::default()
    };
    cast_with_options(array, target, &options).map_err(|err| match err {
        ArrowError::CastError(value) | ArrowError::ParseError(value) => TypeError::Conversion {
            value,
            target: target.to_string(),
        }
        .into(),
        other => other.into(),
    })
}

// ── Host values <-> engine arrays ──────────────────────────────────────

/// Build an engine array from host values.
///
/// Without a requested type the class is inferred with the R coercion
/// lattice. Values are first coerced to the class, assembled into the class's
/// canonical engine type and finally cast to the requested width. NaN becomes
/// null on this path.
pub fn array_from_values(
    values: &[Value],
    data_type: Option<&DataType>,
) -> Result<ArrayRef, DatarError> {
    let class = match data_type {
        Some(dt) => DType::of(dt)
            .ok_or_else(|| DatarError::unsupported("array construction", format!("type {dt}")))?,
        None => infer_dtype(values)?,
    };
    let coerced = values
        .iter()
        .cloned()
        .map(|value| cast_value(value, class))
        .collect::<Result<Vec<_>, _>>()?;
    let canonical = build_canonical(&coerced, class);
    match data_type {
        Some(dt) if dt != canonical.data_type() => cast_strict(canonical.as_ref(), dt),
        _ => Ok(canonical),
    }
}

fn build_canonical(values: &[Value], class: DType) -> ArrayRef {
    match class {
        DType::Null => new_null_array(&DataType::Null, values.len()),
        DType::Bool => Arc::new(
            values
                .iter()
                .map(|v| v.as_bool())
                .collect::<BooleanArray>(),
        ),
        DType::Int64 => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Int(x) => Some(*x),
                    _ => None,
                })
                .collect::<Int64Array>(),
        ),
        DType::Float64 => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Float(x) if !x.is_nan() => Some(*x),
                    _ => None,
                })
                .collect::<Float64Array>(),
        ),
        DType::Utf8 => Arc::new(values.iter().map(Value::as_str).collect::<StringArray>()),
        DType::Binary => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Bytes(b) => Some(b.as_slice()),
                    _ => None,
                })
                .collect::<BinaryArray>(),
        ),
        DType::Date => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => i32::try_from(days_since_epoch(*d)).ok(),
                    _ => None,
                })
                .collect::<Date32Array>(),
        ),
        DType::Timestamp => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::DateTime(dt) => datetime_to_nanos(*dt),
                    _ => None,
                })
                .collect::<TimestampNanosecondArray>(),
        ),
        DType::Time => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Time(t) => Some(time_to_nanos(*t)),
                    _ => None,
                })
                .collect::<Time64NanosecondArray>(),
        ),
        DType::Duration => Arc::new(
            values
                .iter()
                .map(|v| match v {
                    Value::Duration(n) => Some(*n),
                    _ => None,
                })
                .collect::<DurationNanosecondArray>(),
        ),
    }
}

/// Materialize an engine array into host values, in order.
pub fn values_from_array(array: &dyn Array) -> Result<Vec<Value>, DatarError> {
    let class = DType::of(array.data_type()).ok_or_else(|| {
        DatarError::unsupported(
            "materialization",
            format!("type {} has no host representation", array.data_type()),
        )
    })?;
    let canonical_type = class.canonical();
    let owned;
    let array: &dyn Array = if array.data_type() == &canonical_type {
        array
    } else {
        owned = cast(array, &canonical_type)?;
        owned.as_ref()
    };

    let values = match class {
        DType::Null => vec![Value::Null; array.len()],
        DType::Bool => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        DType::Int64 => array
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Int))
            .collect(),
        DType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Float))
            .collect(),
        DType::Utf8 => array
            .as_string::<i32>()
            .iter()
            .map(|v| v.map_or(Value::Null, |s| Value::Str(s.to_owned())))
            .collect(),
        DType::Binary => array
            .as_binary::<i32>()
            .iter()
            .map(|v| v.map_or(Value::Null, |b| Value::Bytes(b.to_vec())))
            .collect(),
        DType::Date => array
            .as_primitive::<Date32Type>()
            .iter()
            .map(|v| {
                v.and_then(|days| date_from_epoch_days(i64::from(days)))
                    .map_or(Value::Null, Value::Date)
            })
            .collect(),
        DType::Timestamp => array
            .as_primitive::<TimestampNanosecondType>()
            .iter()
            .map(|v| {
                v.and_then(datetime_from_nanos)
                    .map_or(Value::Null, Value::DateTime)
            })
            .collect(),
        DType::Time => array
            .as_primitive::<Time64NanosecondType>()
            .iter()
            .map(|v| v.and_then(time_from_nanos).map_or(Value::Null, Value::Time))
            .collect(),
        DType::Duration => array
            .as_primitive::<DurationNanosecondType>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Duration))
            .collect(),
    };
    Ok(values)
}

/// The host value at `idx`.
pub fn value_at(array: &dyn Array, idx: usize) -> Result<Value, DatarError> {
    if idx >= array.len() {
        return Err(DatarError::invalid(
            "[",
            format!("index {idx} out of bounds for length {}", array.len()),
        ));
    }
    let single = array.slice(idx, 1);
    Ok(values_from_array(single.as_ref())?
        .into_iter()
        .next()
        .unwrap_or(Value::Null))
}

// ── Wrapped array ──────────────────────────────────────────────────────

/// Dictionary metadata of a factor, derived once from the encoded array.
#[derive(Debug, Clone)]
pub struct Factor {
    encoded: ArrayRef,
    dictionary: ArrayRef,
    indices: ArrayRef,
}

impl Factor {
    #[must_use]
    pub fn encoded(&self) -> &ArrayRef {
        &self.encoded
    }

    /// Distinct values (the levels).
    #[must_use]
    pub fn dictionary(&self) -> &ArrayRef {
        &self.dictionary
    }

    /// 0-based codes into the dictionary, null where the element is missing.
    #[must_use]
    pub fn indices(&self) -> &ArrayRef {
        &self.indices
    }
}

/// An engine array with R operator semantics and optional factor metadata.
///
/// Storage always holds decoded values; when the source was dictionary
/// encoded the dictionary and indices stay available through [`Factor`].
#[derive(Debug, Clone)]
pub struct RArray {
    storage: ArrayRef,
    factor: Option<Factor>,
}

/// Indexer accepted by [`RArray::at`]. Negative positions count from the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    Position(isize),
    Positions(Vec<isize>),
    Mask(Vec<bool>),
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    },
}

impl RArray {
    /// Wrap an engine array. Dictionary arrays are decoded into storage and
    /// keep their dictionary and indices as factor metadata.
    pub fn create(array: ArrayRef) -> Result<Self, DatarError> {
        let Some(dict) = array.as_any_dictionary_opt() else {
            return Ok(Self {
                storage: array,
                factor: None,
            });
        };
        let dictionary = Arc::clone(dict.values());
        let indices = array_from_data(dict.keys().to_data());
        let storage = take(dictionary.as_ref(), indices.as_ref(), None)?;
        Ok(Self {
            storage,
            factor: Some(Factor {
                encoded: array,
                dictionary,
                indices,
            }),
        })
    }

    pub fn from_values(values: &[Value]) -> Result<Self, DatarError> {
        Self::create(array_from_values(values, None)?)
    }

    pub fn from_values_typed(values: &[Value], data_type: &DataType) -> Result<Self, DatarError> {
        Self::create(array_from_values(values, Some(data_type))?)
    }

    /// A factor from 0-based codes and its levels.
    pub fn from_codes(codes: Vec<Option<i32>>, levels: ArrayRef) -> Result<Self, DatarError> {
        let keys = Int32Array::from(codes);
        let dict = DictionaryArray::<Int32Type>::try_new(keys, levels)?;
        Self::create(Arc::new(dict))
    }

    #[must_use]
    pub fn storage(&self) -> &ArrayRef {
        &self.storage
    }

    #[must_use]
    pub fn into_storage(self) -> ArrayRef {
        self.storage
    }

    #[must_use]
    pub fn data_type(&self) -> &DataType {
        self.storage.data_type()
    }

    #[must_use]
    pub fn dtype(&self) -> Option<DType> {
        DType::of(self.storage.data_type())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[must_use]
    pub fn null_count(&self) -> usize {
        self.storage
            .logical_nulls()
            .map_or(0, |nulls| nulls.null_count())
    }

    pub fn get(&self, idx: usize) -> Result<Value, DatarError> {
        value_at(self.storage.as_ref(), idx)
    }

    /// The first element, or NA for an empty array.
    pub fn first(&self) -> Result<Value, DatarError> {
        if self.is_empty() {
            return Ok(Value::Null);
        }
        self.get(0)
    }

    pub fn values(&self) -> Result<Vec<Value>, DatarError> {
        values_from_array(self.storage.as_ref())
    }

    /// Iterate the materialized values. Each call starts over from storage.
    pub fn iter(&self) -> Result<std::vec::IntoIter<Value>, DatarError> {
        Ok(self.values()?.into_iter())
    }

    /// Positional selection. A single position yields a value; everything
    /// else yields an array.
    pub fn at(&self, index: Index) -> Result<RObject, DatarError> {
        let len = self.len();
        match index {
            Index::Position(pos) => {
                let idx = resolve_position(pos, len)?;
                Ok(RObject::Value(self.get(idx)?))
            }
            Index::Positions(positions) => {
                let resolved = positions
                    .into_iter()
                    .map(|pos| resolve_position(pos, len))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RObject::Array(self.take(&resolved)?))
            }
            Index::Mask(mask) => {
                if mask.len() != len {
                    return Err(DatarError::LengthMismatch {
                        lengths: vec![len, mask.len()],
                    });
                }
                let predicate = BooleanArray::from(mask);
                let source = self.source();
                Ok(RObject::Array(Self::create(filter(
                    source.as_ref(),
                    &predicate,
                )?)?))
            }
            Index::Slice { start, stop, step } => {
                let positions = slice_positions(len, start, stop, step)?;
                Ok(RObject::Array(self.take(&positions)?))
            }
        }
    }

    /// Select positions. Factors keep their levels.
    pub fn take(&self, positions: &[usize]) -> Result<Self, DatarError> {
        let indices = UInt64Array::from_iter_values(positions.iter().map(|p| *p as u64));
        self.take_indices(&indices)
    }

    pub fn take_indices(&self, indices: &dyn Array) -> Result<Self, DatarError> {
        let source = self.source();
        Self::create(take(source.as_ref(), indices, None)?)
    }

    /// Repeat the first element `n` times.
    pub fn recycle(&self, n: usize) -> Result<Self, DatarError> {
        self.take(&vec![0; n])
    }

    pub fn cast(&self, data_type: &DataType) -> Result<Self, DatarError> {
        let source = match data_type {
            DataType::Dictionary(_, _) => self.source(),
            _ => &self.storage,
        };
        Self::create(cast_strict(source.as_ref(), data_type)?)
    }

    /// Encode as a factor whose levels are the distinct non-missing values in
    /// order of first appearance.
    pub fn dictionary_encode(&self) -> Result<Self, DatarError> {
        let values = self.values()?;
        let mut seen: HashMap<ValueKey, i32> = HashMap::new();
        let mut first_positions: Vec<u64> = Vec::new();
        let mut codes = Vec::with_capacity(values.len());
        for (pos, value) in values.iter().enumerate() {
            if value.is_missing() {
                codes.push(None);
                continue;
            }
            let next = i32::try_from(first_positions.len())
                .map_err(|_| DatarError::unsupported("dictionary_encode", "too many levels"))?;
            let code = *seen.entry(value.key()).or_insert_with(|| {
                first_positions.push(pos as u64);
                next
            });
            codes.push(Some(code));
        }
        let level_positions = UInt64Array::from(first_positions);
        let levels = take(self.storage.as_ref(), &level_positions, None)?;
        Self::from_codes(codes, levels)
    }

    #[must_use]
    pub fn is_factor(&self) -> bool {
        self.factor.is_some()
    }

    #[must_use]
    pub fn factor(&self) -> Option<&Factor> {
        self.factor.as_ref()
    }

    #[must_use]
    pub fn dictionary(&self) -> Option<&ArrayRef> {
        self.factor.as_ref().map(Factor::dictionary)
    }

    #[must_use]
    pub fn indices(&self) -> Option<&ArrayRef> {
        self.factor.as_ref().map(Factor::indices)
    }

    /// Drop factor metadata, keeping decoded storage.
    #[must_use]
    pub fn decoded(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            factor: None,
        }
    }

    /// The array positional kernels run on: encoded for factors so levels
    /// survive, storage otherwise.
    fn source(&self) -> &ArrayRef {
        self.factor.as_ref().map_or(&self.storage, Factor::encoded)
    }
}

impl PartialEq for RArray {
    fn eq(&self, other: &Self) -> bool {
        if self.storage.to_data() != other.storage.to_data() {
            return false;
        }
        match (&self.factor, &other.factor) {
            (None, None) => true,
            (Some(a), Some(b)) => a.dictionary.to_data() == b.dictionary.to_data(),
            _ => false,
        }
    }
}

impl fmt::Display for RArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values().map_err(|_| fmt::Error)?;
        f.write_str("[")?;
        for (pos, value) in values.iter().enumerate() {
            if pos > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

fn resolve_position(pos: isize, len: usize) -> Result<usize, DatarError> {
    let resolved = if pos < 0 {
        len.checked_sub(pos.unsigned_abs())
    } else {
        Some(pos.unsigned_abs()).filter(|p| *p < len)
    };
    resolved.ok_or_else(|| {
        DatarError::invalid("[", format!("index {pos} out of bounds for length {len}"))
    })
}

/// Positions selected by a slice; bounds clamp and negatives count from the end.
fn slice_positions(
    len: usize,
    start: Option<isize>,
    stop: Option<isize>,
    step: Option<isize>,
) -> Result<Vec<usize>, DatarError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(DatarError::invalid("[", "slice step cannot be zero"));
    }
    let len = len as isize;
    let clamp = |bound: isize, lower: isize, upper: isize| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(lower, upper)
    };
    let mut positions = Vec::new();
    if step > 0 {
        let mut pos = start.map_or(0, |s| clamp(s, 0, len));
        let stop = stop.map_or(len, |s| clamp(s, 0, len));
        while pos < stop {
            positions.push(pos as usize);
            pos += step;
        }
    } else {
        let mut pos = start.map_or(len - 1, |s| clamp(s, -1, len - 1));
        let stop = stop.map_or(-1, |s| clamp(s, -1, len - 1));
        while pos > stop {
            positions.push(pos as usize);
            pos += step;
        }
    }
    Ok(positions)
}

// ── Result normalization ───────────────────────────────────────────────

/// A normalized operation result: a wrapped array, a host value or a list of
/// results (as produced by `strsplit`).
#[derive(Debug, Clone, PartialEq)]
pub enum RObject {
    Array(RArray),
    Value(Value),
    List(Vec<RObject>),
}

impl RObject {
    #[must_use]
    pub fn as_array(&self) -> Option<&RArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Arrays pass through, values become length-1 arrays.
    pub fn into_array(self) -> Result<RArray, DatarError> {
        match self {
            Self::Array(array) => Ok(array),
            Self::Value(value) => RArray::from_values(&[value]),
            Self::List(_) => Err(DatarError::unsupported(
                "into_array",
                "a list cannot be flattened into one array",
            )),
        }
    }

    /// Values pass through, length-1 arrays collapse to their element.
    pub fn into_value(self) -> Result<Value, DatarError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Array(array) if array.len() == 1 => array.get(0),
            Self::Array(array) => Err(DatarError::invalid(
                "into_value",
                format!("expected a single value, got {} elements", array.len()),
            )),
            Self::List(_) => Err(DatarError::invalid("into_value", "got a list")),
        }
    }

    pub fn values(&self) -> Result<Vec<Value>, DatarError> {
        match self {
            Self::Array(array) => array.values(),
            Self::Value(value) => Ok(vec![value.clone()]),
            Self::List(items) => Err(DatarError::invalid(
                "values",
                format!("got a list of {} items", items.len()),
            )),
        }
    }
}

impl From<RArray> for RObject {
    fn from(value: RArray) -> Self {
        Self::Array(value)
    }
}

impl From<Value> for RObject {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Anything an operation may produce before normalization.
#[derive(Debug, Clone)]
pub enum EngineValue {
    Wrapped(RArray),
    Array(ArrayRef),
    Scalar(Scalar<ArrayRef>),
    Other(RObject),
}

impl From<RArray> for EngineValue {
    fn from(value: RArray) -> Self {
        Self::Wrapped(value)
    }
}

impl From<ArrayRef> for EngineValue {
    fn from(value: ArrayRef) -> Self {
        Self::Array(value)
    }
}

impl From<Scalar<ArrayRef>> for EngineValue {
    fn from(value: Scalar<ArrayRef>) -> Self {
        Self::Scalar(value)
    }
}

impl From<RObject> for EngineValue {
    fn from(value: RObject) -> Self {
        Self::Other(value)
    }
}

impl From<Value> for EngineValue {
    fn from(value: Value) -> Self {
        Self::Other(RObject::Value(value))
    }
}

/// Canonicalize an operation result: engine arrays are wrapped, engine
/// scalars collapse to host values, everything else passes through.
pub fn wrap_arrow_value(x: impl Into<EngineValue>) -> Result<RObject, DatarError> {
    match x.into() {
        EngineValue::Wrapped(array) => Ok(RObject::Array(array)),
        EngineValue::Array(array) => {
            Ok(RObject::Array(RArray::create(construct::fold_nan(array))?))
        }
        EngineValue::Scalar(scalar) => Ok(RObject::Value(value_at(scalar.get().0, 0)?)),
        EngineValue::Other(other) => Ok(other),
    }
}

/// Lift `f` so its result goes through [`wrap_arrow_value`].
pub fn wrap_arrow_result<A, R, F>(f: F) -> impl Fn(A) -> Result<RObject, DatarError>
where
    F: Fn(A) -> Result<R, DatarError>,
    R: Into<EngineValue>,
{
    move |args| wrap_arrow_value(f(args)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{
        Array, ArrayRef, AsArray, DictionaryArray, Float64Array, Int64Array, Scalar, StringArray,
    };
    use arrow::datatypes::{DataType, Int32Type};
    use da_types::{TypeError, Value};

    use super::{
        DatarError, EngineValue, Index, RArray, RObject, wrap_arrow_result, wrap_arrow_value,
    };

    fn ints(values: &[i64]) -> RArray {
        RArray::create(Arc::new(Int64Array::from(values.to_vec()))).expect("wrap")
    }

    #[test]
    fn create_decodes_dictionary_and_keeps_metadata() {
        let dict: DictionaryArray<Int32Type> = vec!["a", "b", "a"].into_iter().collect();
        let arr = RArray::create(Arc::new(dict)).expect("create");
        assert!(arr.is_factor());
        assert_eq!(arr.data_type(), &DataType::Utf8);
        assert_eq!(
            arr.values().expect("values"),
            vec![Value::from("a"), Value::from("b"), Value::from("a")]
        );
        let dictionary = arr.dictionary().expect("dictionary");
        assert_eq!(dictionary.len(), 2);
        let indices = arr.indices().expect("indices");
        assert_eq!(indices.as_primitive::<Int32Type>().values().to_vec(), vec![0, 1, 0]);
    }

    #[test]
    fn plain_arrays_have_no_factor_metadata() {
        let arr = ints(&[1, 2]);
        assert!(!arr.is_factor());
        assert!(arr.dictionary().is_none());
        assert!(arr.indices().is_none());
    }

    #[test]
    fn dictionary_encode_orders_levels_by_appearance() {
        let arr = RArray::from_values(&[
            Value::from("b"),
            Value::Null,
            Value::from("a"),
            Value::from("b"),
        ])
        .expect("build");
        let encoded = arr.dictionary_encode().expect("encode");
        let levels = super::values_from_array(encoded.dictionary().expect("dict").as_ref())
            .expect("levels");
        assert_eq!(levels, vec![Value::from("b"), Value::from("a")]);
        assert_eq!(encoded.values().expect("values"), arr.values().expect("values"));
        assert_eq!(encoded.null_count(), 1);
    }

    #[test]
    fn position_index_returns_value_and_supports_negatives() {
        let arr = ints(&[10, 20, 30]);
        assert_eq!(
            arr.at(Index::Position(-1)).expect("last"),
            RObject::Value(Value::Int(30))
        );
        assert!(matches!(
            arr.at(Index::Position(3)),
            Err(DatarError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn non_integer_indexers_take() {
        let arr = ints(&[10, 20, 30, 40]);
        let picked = arr.at(Index::Positions(vec![2, 0])).expect("take");
        assert_eq!(picked, RObject::Array(ints(&[30, 10])));

        let masked = arr
            .at(Index::Mask(vec![true, false, false, true]))
            .expect("mask");
        assert_eq!(masked, RObject::Array(ints(&[10, 40])));

        let sliced = arr
            .at(Index::Slice {
                start: Some(1),
                stop: None,
                step: Some(2),
            })
            .expect("slice");
        assert_eq!(sliced, RObject::Array(ints(&[20, 40])));

        let reversed = arr
            .at(Index::Slice {
                start: None,
                stop: None,
                step: Some(-1),
            })
            .expect("reverse");
        assert_eq!(reversed, RObject::Array(ints(&[40, 30, 20, 10])));
    }

    #[test]
    fn take_on_factor_keeps_levels() {
        let arr = RArray::from_values(&[Value::from("x"), Value::from("y")])
            .expect("build")
            .dictionary_encode()
            .expect("encode");
        let taken = arr.take(&[1, 1]).expect("take");
        assert!(taken.is_factor());
        assert_eq!(taken.dictionary().expect("levels").len(), 2);
    }

    #[test]
    fn iteration_restarts_from_storage() {
        let arr = ints(&[1, 2]);
        let first: Vec<Value> = arr.iter().expect("iter").collect();
        let second: Vec<Value> = arr.iter().expect("iter").collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn normalizer_wraps_arrays_and_unwraps_scalars() {
        let raw: ArrayRef = Arc::new(StringArray::from(vec!["a"]));
        let wrapped = wrap_arrow_value(raw.clone()).expect("wrap");
        assert!(matches!(wrapped, RObject::Array(_)));

        let scalar = Scalar::new(raw);
        assert_eq!(
            wrap_arrow_value(scalar).expect("unwrap"),
            RObject::Value(Value::from("a"))
        );

        let passthrough = wrap_arrow_value(EngineValue::from(Value::Int(3))).expect("other");
        assert_eq!(passthrough, RObject::Value(Value::Int(3)));
    }

    #[test]
    fn wrap_arrow_result_normalizes_return_values() {
        let doubled = wrap_arrow_result(|x: i64| -> Result<ArrayRef, DatarError> {
            Ok(Arc::new(Int64Array::from(vec![x * 2])))
        });
        let out = doubled(4).expect("call");
        assert_eq!(out, RObject::Array(ints(&[8])));
    }

    #[test]
    fn nan_values_build_as_nulls() {
        let arr = RArray::from_values(&[Value::Float(1.0), Value::Float(f64::NAN)]).expect("build");
        assert_eq!(arr.null_count(), 1);
        assert_eq!(arr.get(1).expect("get"), Value::Null);
    }

    #[test]
    fn typed_construction_reports_conversion_errors() {
        let err = RArray::from_values_typed(&[Value::from("a")], &DataType::Float64)
            .expect_err("must fail");
        assert!(matches!(err, DatarError::Type(_)));
        let ok = RArray::from_values_typed(&[Value::Int(1)], &DataType::Int8).expect("int8");
        assert_eq!(ok.data_type(), &DataType::Int8);
    }

    #[test]
    fn narrowing_and_lossy_casts_fail_instead_of_nulling() {
        let err = RArray::from_values_typed(&[Value::Int(300)], &DataType::Int8)
            .expect_err("out of range");
        assert!(matches!(err, DatarError::Type(TypeError::Conversion { .. })));

        let doubles = RArray::from_values(&[Value::Float(2.0), Value::Float(2.5)]).expect("build");
        let err = doubles.cast(&DataType::Int64).expect_err("fractional");
        assert_eq!(err, DatarError::Type(TypeError::LossyFloatToInt { value: 2.5 }));

        let strings = RArray::from_values(&[Value::from("7"), Value::from("seven")])
            .expect("build");
        let err = strings.cast(&DataType::Int64).expect_err("unparseable");
        assert!(matches!(err, DatarError::Type(TypeError::Conversion { .. })));

        let whole = RArray::from_values(&[Value::Float(2.0), Value::Null]).expect("build");
        let cast = whole.cast(&DataType::Int64).expect("whole doubles");
        assert_eq!(cast.values().expect("values"), vec![Value::Int(2), Value::Null]);
    }

    #[test]
    fn normalizer_folds_nan_into_null() {
        let raw: ArrayRef = Arc::new(Float64Array::from(vec![Some(1.0), Some(f64::NAN), None]));
        let RObject::Array(arr) = wrap_arrow_value(raw).expect("wrap") else {
            panic!("an engine array wraps to an array");
        };
        assert_eq!(
            arr.values().expect("values"),
            vec![Value::Float(1.0), Value::Null, Value::Null]
        );
        assert_eq!(arr.null_count(), 2);
    }

    #[test]
    fn display_uses_r_formatting() {
        let arr = RArray::from_values(&[Value::Int(1), Value::Null]).expect("build");
        assert_eq!(arr.to_string(), "[1, NA]");
    }
}
