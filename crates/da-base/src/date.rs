//! `as_date`: conversion of dates, datetimes, strings and day counts to dates.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use da_columnar::{ArrayLike, DatarError, RArray, RObject};
use da_types::{DATE_FORMATS, DATETIME_FORMATS, DType, TypeError, Value, date_from_epoch_days};

use crate::{prepare, scalar_aware};

/// Options of [`as_date`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsDateOptions {
    /// The only format tried for strings.
    pub format: Option<String>,
    /// Formats tried in turn when `format` is unset. Defaults to ISO-like
    /// datetime and date formats.
    pub try_formats: Option<Vec<String>>,
    /// Unparseable strings become `NA` instead of failing.
    pub optional: bool,
    /// Offset in hours added before the date is taken.
    pub tz: i64,
    /// Day zero for integer input. Defaults to 1970-01-01.
    pub origin: Option<Value>,
}

fn default_formats() -> Vec<String> {
    DATETIME_FORMATS
        .iter()
        .chain(DATE_FORMATS.iter())
        .map(|fmt| (*fmt).to_owned())
        .collect()
}

fn parse_with(text: &str, fmt: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, fmt)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(text, fmt).ok().map(|d| d.and_time(NaiveTime::MIN)))
}

fn shift_hours(dt: NaiveDateTime, tz: i64) -> Result<NaiveDate, DatarError> {
    TimeDelta::try_hours(tz)
        .and_then(|delta| dt.checked_add_signed(delta))
        .map(|dt| dt.date())
        .ok_or_else(|| DatarError::invalid("as_date", format!("tz offset {tz} out of range")))
}

fn parse_string(text: &str, opts: &AsDateOptions) -> Result<Option<NaiveDate>, DatarError> {
    let formats = match (&opts.format, &opts.try_formats) {
        (Some(fmt), _) => vec![fmt.clone()],
        (None, Some(formats)) => formats.clone(),
        (None, None) => default_formats(),
    };
    match formats.iter().find_map(|fmt| parse_with(text, fmt)) {
        Some(dt) => shift_hours(dt, opts.tz).map(Some),
        None if opts.optional => Ok(None),
        None => Err(TypeError::Conversion {
            value: text.to_owned(),
            target: "Date: character string is not in a standard unambiguous format".to_owned(),
        }
        .into()),
    }
}

fn origin_date(opts: &AsDateOptions) -> Result<NaiveDate, DatarError> {
    let origin = match &opts.origin {
        None => {
            return date_from_epoch_days(0).ok_or_else(|| DatarError::invalid("as_date", "epoch"));
        }
        Some(origin) => origin,
    };
    match origin {
        Value::Date(d) => Ok(*d),
        Value::DateTime(dt) => Ok(dt.date()),
        Value::Str(text) => {
            let plain = AsDateOptions::default();
            parse_string(text, &plain)?
                .ok_or_else(|| DatarError::invalid("as_date", format!("invalid origin {text}")))
        }
        other => Err(DatarError::invalid(
            "as_date",
            format!("origin must be a date or a string, got {}", other.dtype()),
        )),
    }
}

fn convert(value: Value, opts: &AsDateOptions) -> Result<Option<NaiveDate>, DatarError> {
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);
    match value {
        Value::Null => Ok(None),
        Value::Date(d) => shift_hours(midnight(d), opts.tz).map(Some),
        Value::DateTime(dt) => shift_hours(dt, opts.tz).map(Some),
        Value::Str(text) => parse_string(&text, opts),
        Value::Int(days) => {
            let origin = origin_date(opts)?;
            let day = TimeDelta::try_days(days)
                .and_then(|delta| origin.checked_add_signed(delta))
                .ok_or_else(|| {
                    DatarError::invalid("as_date", format!("{days} days out of range"))
                })?;
            shift_hours(midnight(day), opts.tz).map(Some)
        }
        other => Err(DatarError::unsupported(
            "as_date",
            format!("no conversion from {}", other.dtype()),
        )),
    }
}

/// Convert to dates. Scalars give a scalar, everything else a date array.
pub fn as_date(x: impl Into<ArrayLike>, opts: &AsDateOptions) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let dates = x
        .values()?
        .into_iter()
        .map(|v| convert(v, opts).map(Value::from))
        .collect::<Result<Vec<_>, _>>()?;
    scalar_aware(scalar, RArray::from_values_typed(&dates, &DType::Date.canonical())?)
}
