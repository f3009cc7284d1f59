#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use arrow::datatypes::{DataType, TimeUnit};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Formats tried, in order, when a string is coerced to a date.
pub const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
/// Formats tried, in order, when a string is coerced to a timestamp.
pub const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Storage class of a value or array, coarser than the engine's `DataType`.
///
/// Every engine type with a host representation maps onto exactly one class,
/// and every class has one canonical engine type used when arrays are built
/// from host values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Bool,
    Int64,
    Float64,
    Utf8,
    Binary,
    Date,
    Timestamp,
    Time,
    Duration,
}

impl DType {
    /// Classify an engine type. Dictionary types classify as their value type.
    #[must_use]
    pub fn of(data_type: &DataType) -> Option<Self> {
        let out = match data_type {
            DataType::Null => Self::Null,
            DataType::Boolean => Self::Bool,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => Self::Int64,
            DataType::Float16 | DataType::Float32 | DataType::Float64 => Self::Float64,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Self::Utf8,
            DataType::Binary | DataType::LargeBinary | DataType::BinaryView => Self::Binary,
            DataType::Date32 | DataType::Date64 => Self::Date,
            DataType::Timestamp(_, _) => Self::Timestamp,
            DataType::Time32(_) | DataType::Time64(_) => Self::Time,
            DataType::Duration(_) => Self::Duration,
            DataType::Dictionary(_, value_type) => return Self::of(value_type),
            _ => return None,
        };
        Some(out)
    }

    /// The engine type arrays of this class are built with.
    #[must_use]
    pub fn canonical(self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Bool => DataType::Boolean,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
            Self::Binary => DataType::Binary,
            Self::Date => DataType::Date32,
            Self::Timestamp => DataType::Timestamp(TimeUnit::Nanosecond, None),
            Self::Time => DataType::Time64(TimeUnit::Nanosecond),
            Self::Duration => DataType::Duration(TimeUnit::Nanosecond),
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "logical",
            Self::Int64 => "integer",
            Self::Float64 => "double",
            Self::Utf8 => "character",
            Self::Binary => "raw",
            Self::Date => "Date",
            Self::Timestamp => "POSIXct",
            Self::Time => "time",
            Self::Duration => "difftime",
        };
        f.write_str(name)
    }
}

/// A single host-language value.
///
/// `Null` is the one missing-value marker (R's `NA`/`NULL`). Floating NaN is a
/// distinct value here but is folded into `Null` whenever an array is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    /// Nanoseconds.
    Duration(i64),
}

impl Value {
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null => DType::Null,
            Self::Bool(_) => DType::Bool,
            Self::Int(_) => DType::Int64,
            Self::Float(_) => DType::Float64,
            Self::Str(_) => DType::Utf8,
            Self::Bytes(_) => DType::Binary,
            Self::Date(_) => DType::Date,
            Self::DateTime(_) => DType::Timestamp,
            Self::Time(_) => DType::Time,
            Self::Duration(_) => DType::Duration,
        }
    }

    /// `NA` or `NaN`.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        matches!(self, Self::Float(v) if v.is_nan())
    }

    /// The missing marker itself, not NaN.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => *a as f64 == *b,
            _ => self == other,
        }
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Null => Err(TypeError::ValueIsMissing),
            other => Err(TypeError::NonNumericValue {
                value: other.to_string(),
                dtype: other.dtype(),
            }),
        }
    }

    pub fn to_i64(&self) -> Result<i64, TypeError> {
        match cast_value(self.clone(), DType::Int64)? {
            Self::Int(v) => Ok(v),
            _ => Err(TypeError::ValueIsMissing),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn key(&self) -> ValueKey {
        ValueKey::from(self)
    }

    /// Order two values the way R's relational operators do. Missing values and
    /// incomparable classes have no order.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::DateTime(b)) => Some(a.and_time(NaiveTime::MIN).cmp(b)),
            (Self::DateTime(a), Self::Date(b)) => Some(a.cmp(&b.and_time(NaiveTime::MIN))),
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            (Self::Duration(a), Self::Duration(b)) => Some(a.cmp(b)),
            (a, b) if a.dtype().is_numeric() || b.dtype().is_numeric() => {
                let lhs = a.to_f64().ok()?;
                let rhs = b.to_f64().ok()?;
                lhs.partial_cmp(&rhs)
            }
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NA"),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => fmt_double(*v, f),
            Self::Str(v) => f.write_str(v),
            Self::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Self::Time(v) => write!(f, "{}", v.format("%H:%M:%S")),
            Self::Duration(v) => fmt_double(*v as f64 / NANOS_PER_SECOND as f64, f)
                .and_then(|()| f.write_str(" secs")),
        }
    }
}

fn fmt_double(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "Inf" } else { "-Inf" })
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        write!(f, "{v:.0}")
    } else {
        write!(f, "{v}")
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Hashable identity of a value for set operations, `match` and factor
/// encoding. Integral doubles share the key of the equal integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Duration(i64),
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(*v),
            Value::Int(v) => Self::Int(*v),
            Value::Float(v) if v.is_nan() => Self::Null,
            Value::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 =>
            {
                Self::Int(*v as i64)
            }
            Value::Float(v) => Self::Float(v.to_bits()),
            Value::Str(v) => Self::Str(v.clone()),
            Value::Bytes(v) => Self::Bytes(v.clone()),
            Value::Date(v) => Self::Date(*v),
            Value::DateTime(v) => Self::DateTime(*v),
            Value::Time(v) => Self::Time(*v),
            Value::Duration(v) => Self::Duration(*v),
        }
    }
}

// ── Type resolution ────────────────────────────────────────────────────

/// Host-language types that may stand in for a type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
    Date,
    DateTime,
    Time,
    TimeDelta,
    Object,
}

impl HostType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::TimeDelta => "timedelta",
            Self::Object => "object",
        }
    }
}

/// Anything accepted where a target type may be requested.
#[derive(Debug, Clone, PartialEq)]
pub enum DtypeSpec {
    Arrow(DataType),
    Name(String),
    Host(HostType),
}

impl From<DataType> for DtypeSpec {
    fn from(value: DataType) -> Self {
        Self::Arrow(value)
    }
}

impl From<&str> for DtypeSpec {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for DtypeSpec {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<HostType> for DtypeSpec {
    fn from(value: HostType) -> Self {
        Self::Host(value)
    }
}

impl From<DType> for DtypeSpec {
    fn from(value: DType) -> Self {
        Self::Arrow(value.canonical())
    }
}

/// Zero-argument type constructors exposed by the engine, by name.
fn constructor_type(name: &str) -> Option<DataType> {
    let out = match name {
        "null" => DataType::Null,
        "bool_" => DataType::Boolean,
        "int8" => DataType::Int8,
        "int16" => DataType::Int16,
        "int32" => DataType::Int32,
        "int64" => DataType::Int64,
        "uint8" => DataType::UInt8,
        "uint16" => DataType::UInt16,
        "uint32" => DataType::UInt32,
        "uint64" => DataType::UInt64,
        "float16" => DataType::Float16,
        "float32" => DataType::Float32,
        "float64" => DataType::Float64,
        "string" | "utf8" => DataType::Utf8,
        "large_string" | "large_utf8" => DataType::LargeUtf8,
        "binary" => DataType::Binary,
        "large_binary" => DataType::LargeBinary,
        "date32" => DataType::Date32,
        "date64" => DataType::Date64,
        _ => return None,
    };
    Some(out)
}

/// Semantic aliases.
fn alias_type(name: &str) -> Option<DataType> {
    let out = match name {
        "int" => DataType::Int64,
        "float" | "double" => DataType::Float64,
        "bool" => DataType::Boolean,
        "str" => DataType::Utf8,
        "datetime" => DataType::Timestamp(TimeUnit::Nanosecond, None),
        "date" => DataType::Date32,
        "time" => DataType::Time32(TimeUnit::Second),
        "timedelta" | "duration" => DataType::Duration(TimeUnit::Nanosecond),
        "bytes" => DataType::Binary,
        _ => return None,
    };
    Some(out)
}

/// Resolve a type tag to a concrete engine type. `None` means "infer from data".
pub fn get_dtype(spec: Option<&DtypeSpec>) -> Result<Option<DataType>, TypeError> {
    let Some(spec) = spec else {
        return Ok(None);
    };
    match spec {
        DtypeSpec::Arrow(data_type) => Ok(Some(data_type.clone())),
        DtypeSpec::Name(name) => constructor_type(name)
            .or_else(|| alias_type(name))
            .map(Some)
            .ok_or_else(|| TypeError::Unresolvable {
                input: name.clone(),
            }),
        DtypeSpec::Host(host) => {
            alias_type(host.name())
                .map(Some)
                .ok_or_else(|| TypeError::Unresolvable {
                    input: host.name().to_owned(),
                })
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("invalid type: {input}")]
    Unresolvable { input: String },
    #[error("type coercion from {left} to {right} has no compatible common type")]
    IncompatibleTypes { left: DType, right: DType },
    #[error("cannot cast value of type {from} to {to}")]
    InvalidCast { from: DType, to: DType },
    #[error("cannot convert {value:?} to {target}")]
    Conversion { value: String, target: String },
    #[error("cannot cast double {value} to integer without loss")]
    LossyFloatToInt { value: f64 },
    #[error("value {value:?} has non-numeric type {dtype}")]
    NonNumericValue { value: String, dtype: DType },
    #[error("value is missing")]
    ValueIsMissing,
}

// ── Coercion lattice ───────────────────────────────────────────────────

/// Common class of two classes when values are combined into one vector.
pub fn common_dtype(left: DType, right: DType) -> Result<DType, TypeError> {
    use DType::{Bool, Date, Float64, Int64, Null, Timestamp};

    let out = match (left, right) {
        (a, b) if a == b => a,
        (Null, other) | (other, Null) => other,
        (Bool, Int64) | (Int64, Bool) => Int64,
        (Bool, Float64) | (Float64, Bool) => Float64,
        (Int64, Float64) | (Float64, Int64) => Float64,
        (Date, Timestamp) | (Timestamp, Date) => Timestamp,
        _ => return Err(TypeError::IncompatibleTypes { left, right }),
    };

    Ok(out)
}

pub fn infer_dtype(values: &[Value]) -> Result<DType, TypeError> {
    let mut current = DType::Null;
    for value in values {
        current = common_dtype(current, value.dtype())?;
    }
    Ok(current)
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Days between the Unix epoch and `date`.
#[must_use]
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    date.signed_duration_since(unix_epoch()).num_days()
}

#[must_use]
pub fn date_from_epoch_days(days: i64) -> Option<NaiveDate> {
    unix_epoch().checked_add_signed(TimeDelta::try_days(days)?)
}

#[must_use]
pub fn datetime_to_nanos(value: NaiveDateTime) -> Option<i64> {
    value.and_utc().timestamp_nanos_opt()
}

#[must_use]
pub fn datetime_from_nanos(nanos: i64) -> Option<NaiveDateTime> {
    let secs = nanos.div_euclid(NANOS_PER_SECOND);
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok()?;
    chrono::DateTime::from_timestamp(secs, subsec).map(|dt| dt.naive_utc())
}

#[must_use]
pub fn time_to_nanos(value: NaiveTime) -> i64 {
    i64::from(value.num_seconds_from_midnight()) * NANOS_PER_SECOND + i64::from(value.nanosecond())
}

#[must_use]
pub fn time_from_nanos(nanos: i64) -> Option<NaiveTime> {
    let secs = u32::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, subsec)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "TRUE" | "true" | "True" | "T" => Some(true),
        "FALSE" | "false" | "False" | "F" => Some(false),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date(text).map(|d| d.and_time(NaiveTime::MIN)))
}

fn conversion(value: &Value, target: DType) -> TypeError {
    TypeError::Conversion {
        value: value.to_string(),
        target: target.to_string(),
    }
}

/// Cast a value to a target class, taking ownership to avoid redundant clones
/// when the value already has the correct class. NaN becomes `Null`.
pub fn cast_value(value: Value, target: DType) -> Result<Value, TypeError> {
    if value.is_missing() {
        return Ok(Value::Null);
    }
    let from = value.dtype();
    if from == target {
        return Ok(value);
    }

    match target {
        DType::Null => Ok(Value::Null),
        DType::Bool => match &value {
            Value::Int(v) => Ok(Value::Bool(*v != 0)),
            Value::Float(v) => Ok(Value::Bool(*v != 0.0)),
            Value::Str(v) => parse_bool(v)
                .map(Value::Bool)
                .ok_or_else(|| conversion(&value, target)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Int64 => match &value {
            Value::Bool(v) => Ok(Value::Int(i64::from(*v))),
            Value::Float(v) => {
                if !v.is_finite() || *v != v.trunc() {
                    return Err(TypeError::LossyFloatToInt { value: *v });
                }
                if *v < i64::MIN as f64 || *v > i64::MAX as f64 {
                    return Err(TypeError::LossyFloatToInt { value: *v });
                }
                Ok(Value::Int(*v as i64))
            }
            Value::Str(v) => v
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| conversion(&value, target)),
            Value::Date(v) => Ok(Value::Int(days_since_epoch(*v))),
            Value::Duration(v) => Ok(Value::Int(*v)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Float64 => match &value {
            Value::Bool(v) => Ok(Value::Float(if *v { 1.0 } else { 0.0 })),
            Value::Int(v) => Ok(Value::Float(*v as f64)),
            Value::Str(v) => v
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| conversion(&value, target)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Utf8 => match value {
            Value::Bytes(bytes) => String::from_utf8(bytes)
                .map(Value::Str)
                .map_err(|err| TypeError::Conversion {
                    value: String::from_utf8_lossy(err.as_bytes()).into_owned(),
                    target: target.to_string(),
                }),
            other => Ok(Value::Str(other.to_string())),
        },
        DType::Binary => match value {
            Value::Str(v) => Ok(Value::Bytes(v.into_bytes())),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Date => match &value {
            Value::DateTime(v) => Ok(Value::Date(v.date())),
            Value::Str(v) => parse_date(v)
                .map(Value::Date)
                .ok_or_else(|| conversion(&value, target)),
            Value::Int(v) => date_from_epoch_days(*v)
                .map(Value::Date)
                .ok_or_else(|| conversion(&value, target)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Timestamp => match &value {
            Value::Date(v) => Ok(Value::DateTime(v.and_time(NaiveTime::MIN))),
            Value::Str(v) => parse_datetime(v)
                .map(Value::DateTime)
                .ok_or_else(|| conversion(&value, target)),
            Value::Int(v) => datetime_from_nanos(*v)
                .map(Value::DateTime)
                .ok_or_else(|| conversion(&value, target)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Time => match &value {
            Value::DateTime(v) => Ok(Value::Time(v.time())),
            Value::Str(v) => NaiveTime::parse_from_str(v, "%H:%M:%S")
                .map(Value::Time)
                .map_err(|_| conversion(&value, target)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
        DType::Duration => match &value {
            Value::Int(v) => Ok(Value::Duration(*v)),
            _ => Err(TypeError::InvalidCast { from, to: target }),
        },
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::{DataType, TimeUnit};
    use chrono::NaiveDate;

    use super::{
        DType, DtypeSpec, HostType, TypeError, Value, ValueKey, cast_value, common_dtype,
        get_dtype, infer_dtype,
    };

    #[test]
    fn dtype_inference_coerces_numeric_values() {
        let values = vec![Value::Bool(true), Value::Int(7), Value::Float(3.5)];
        assert_eq!(
            infer_dtype(&values).expect("dtype should infer"),
            DType::Float64
        );
    }

    #[test]
    fn dtype_inference_skips_missing() {
        let values = vec![Value::Null, Value::Str("a".into())];
        assert_eq!(infer_dtype(&values).expect("infer"), DType::Utf8);
        assert_eq!(infer_dtype(&[]).expect("infer"), DType::Null);
    }

    #[test]
    fn common_dtype_rejects_string_numeric_mix() {
        let err = common_dtype(DType::Utf8, DType::Int64).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "type coercion from character to integer has no compatible common type"
        );
    }

    #[test]
    fn nan_casts_to_null() {
        let cast = cast_value(Value::Float(f64::NAN), DType::Float64).expect("cast");
        assert_eq!(cast, Value::Null);
    }

    #[test]
    fn numeric_strings_convert_and_others_fail() {
        assert_eq!(
            cast_value(Value::from("12"), DType::Int64).expect("int"),
            Value::Int(12)
        );
        assert_eq!(
            cast_value(Value::from("1.5"), DType::Float64).expect("double"),
            Value::Float(1.5)
        );
        let err = cast_value(Value::from("a"), DType::Float64).expect_err("must fail");
        assert_eq!(
            err,
            TypeError::Conversion {
                value: "a".into(),
                target: "double".into()
            }
        );
    }

    #[test]
    fn lossy_double_to_integer_is_rejected() {
        let err = cast_value(Value::Float(1.5), DType::Int64).expect_err("lossy");
        assert_eq!(err, TypeError::LossyFloatToInt { value: 1.5 });
        assert_eq!(
            cast_value(Value::Float(2.0), DType::Int64).expect("lossless"),
            Value::Int(2)
        );
    }

    #[test]
    fn display_follows_r_as_character() {
        assert_eq!(Value::Float(1.0).to_string(), "1");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "Inf");
        assert_eq!(Value::Bool(true).to_string(), "TRUE");
        assert_eq!(Value::Null.to_string(), "NA");
    }

    #[test]
    fn integral_doubles_share_integer_keys() {
        assert_eq!(Value::Float(3.0).key(), ValueKey::Int(3));
        assert_eq!(Value::Float(f64::NAN).key(), ValueKey::Null);
        assert_ne!(Value::Float(3.5).key(), Value::Int(3).key());
    }

    #[test]
    fn compare_orders_across_numeric_classes() {
        use std::cmp::Ordering;
        assert_eq!(
            Value::Int(1).compare(&Value::Float(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn get_dtype_resolves_constructor_names_aliases_and_hosts() {
        let cases = [
            ("int8", DataType::Int8),
            ("uint64", DataType::UInt64),
            ("float32", DataType::Float32),
            ("bool_", DataType::Boolean),
            ("str", DataType::Utf8),
            ("int", DataType::Int64),
            ("double", DataType::Float64),
            ("datetime", DataType::Timestamp(TimeUnit::Nanosecond, None)),
            ("time", DataType::Time32(TimeUnit::Second)),
        ];
        for (name, expected) in cases {
            let spec = DtypeSpec::from(name);
            assert_eq!(
                get_dtype(Some(&spec)).expect("resolves"),
                Some(expected),
                "{name}"
            );
        }
        assert_eq!(
            get_dtype(Some(&DtypeSpec::from(HostType::Int))).expect("host"),
            Some(DataType::Int64)
        );
        assert_eq!(
            get_dtype(Some(&DtypeSpec::from(DataType::Int8))).expect("identity"),
            Some(DataType::Int8)
        );
        assert_eq!(get_dtype(None).expect("none"), None);
    }

    #[test]
    fn get_dtype_rejects_unknown_inputs() {
        let err = get_dtype(Some(&DtypeSpec::from(HostType::Object))).expect_err("object");
        assert_eq!(
            err,
            TypeError::Unresolvable {
                input: "object".into()
            }
        );
        assert!(get_dtype(Some(&DtypeSpec::from("nope"))).is_err());
    }

    #[test]
    fn dates_round_trip_through_epoch_days() {
        let date = NaiveDate::from_ymd_opt(2010, 8, 23).expect("date");
        let days = super::days_since_epoch(date);
        assert_eq!(days, 14844);
        assert_eq!(super::date_from_epoch_days(days), Some(date));
    }

    #[test]
    fn value_serde_round_trip() {
        let value = Value::Str("x".into());
        let json = serde_json::to_string(&value).expect("serialize");
        let back: Value = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(value, back);
    }
}
