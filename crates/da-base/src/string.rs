//! Character functions: matching, substitution, splitting, pasting,
//! formatting and measuring strings.
//!
//! Elements are converted to strings with R's formatting first, so
//! `nchar(123)` is 3. Missing elements stay missing unless noted.

use std::sync::Arc;

use arrow::array::{BooleanArray, Int64Array, StringArray};
use da_columnar::{ArrayLike, DatarError, RArray, RObject, broadcast_arrays, make_array};
use da_types::Value;
use regex::{Regex, RegexBuilder};

use crate::{first_arg, from_positions, prepare, scalar_aware};

fn strings(x: &RArray) -> Result<Vec<Option<String>>, DatarError> {
    Ok(x
        .values()?
        .into_iter()
        .map(|v| match v {
            Value::Null => None,
            Value::Str(s) => Some(s),
            other if other.is_missing() => None,
            other => Some(other.to_string()),
        })
        .collect())
}

fn string_array(values: Vec<Option<String>>) -> Result<RArray, DatarError> {
    RArray::create(Arc::new(StringArray::from(values)))
}

fn bool_array(values: Vec<Option<bool>>) -> Result<RArray, DatarError> {
    RArray::create(Arc::new(BooleanArray::from(values)))
}

fn map_strings(
    x: impl Into<ArrayLike>,
    f: impl Fn(&str) -> Result<String, DatarError>,
) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let out = strings(&x)?
        .into_iter()
        .map(|s| s.map(|s| f(&s)).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    scalar_aware(scalar, string_array(out)?)
}

fn text_arg(arg: impl Into<ArrayLike>, func: &str, name: &str) -> Result<String, DatarError> {
    match first_arg(arg, func, name)? {
        Value::Str(s) => Ok(s),
        Value::Null => Err(DatarError::invalid(func, format!("`{name}` is missing"))),
        other => Ok(other.to_string()),
    }
}

/// A compiled pattern, literal or regular expression.
enum Matcher {
    Fixed(String),
    Regex(Regex),
}

impl Matcher {
    fn new(pattern: &str, fixed: bool, ignore_case: bool, func: &str) -> Result<Self, DatarError> {
        if fixed && !ignore_case {
            return Ok(Self::Fixed(pattern.to_owned()));
        }
        let source = if fixed { regex::escape(pattern) } else { pattern.to_owned() };
        RegexBuilder::new(&source)
            .case_insensitive(ignore_case)
            .build()
            .map(Self::Regex)
            .map_err(|err| DatarError::invalid(func, err.to_string()))
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Fixed(pattern) => text.contains(pattern.as_str()),
            Self::Regex(re) => re.is_match(text),
        }
    }
}

/// Options shared by [`grep`] and [`grepl`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrepOptions {
    pub ignore_case: bool,
    /// `grep` returns matching elements instead of their positions.
    pub value: bool,
    pub fixed: bool,
    pub invert: bool,
}

fn matches(
    pattern: impl Into<ArrayLike>,
    x: &RArray,
    opts: GrepOptions,
    func: &str,
) -> Result<Vec<bool>, DatarError> {
    let pattern = text_arg(pattern, func, "pattern")?;
    let matcher = Matcher::new(&pattern, opts.fixed, opts.ignore_case, func)?;
    Ok(strings(x)?
        .iter()
        .map(|s| s.as_deref().is_some_and(|s| matcher.is_match(s)) != opts.invert)
        .collect())
}

/// 0-based positions of matching elements, or the elements themselves with
/// `value`.
pub fn grep(
    pattern: impl Into<ArrayLike>,
    x: impl Into<ArrayLike>,
    opts: GrepOptions,
) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let hits = matches(pattern, &x, opts, "grep")?;
    let positions: Vec<usize> = hits
        .iter()
        .enumerate()
        .filter(|(_, hit)| **hit)
        .map(|(pos, _)| pos)
        .collect();
    let out = if opts.value {
        x.take(&positions)?
    } else {
        from_positions(positions)?
    };
    if scalar && !out.is_empty() {
        return Ok(RObject::Value(out.first()?));
    }
    Ok(RObject::Array(out))
}

/// Whether each element matches. Missing elements never match.
pub fn grepl(
    pattern: impl Into<ArrayLike>,
    x: impl Into<ArrayLike>,
    opts: GrepOptions,
) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let hits = matches(pattern, &x, opts, "grepl")?;
    scalar_aware(scalar, bool_array(hits.into_iter().map(Some).collect())?)
}

/// `\1` style back-references in R replacements become `${1}`.
fn regex_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek() {
                Some(d) if d.is_ascii_digit() => {
                    out.push_str(&format!("${{{d}}}"));
                    chars.next();
                }
                Some(_) => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

fn substitute(
    pattern: impl Into<ArrayLike>,
    replacement: impl Into<ArrayLike>,
    x: impl Into<ArrayLike>,
    ignore_case: bool,
    fixed: bool,
    all: bool,
) -> Result<RObject, DatarError> {
    let func = if all { "gsub" } else { "sub" };
    if ignore_case {
        return Err(DatarError::unsupported(func, "`ignore_case = true`"));
    }
    let pattern = text_arg(pattern, func, "pattern")?;
    let replacement = text_arg(replacement, func, "replacement")?;
    let limit = if all { 0 } else { 1 };
    match Matcher::new(&pattern, fixed, false, func)? {
        Matcher::Fixed(pattern) => map_strings(x, |s| {
            Ok(if all {
                s.replace(pattern.as_str(), &replacement)
            } else {
                s.replacen(pattern.as_str(), &replacement, 1)
            })
        }),
        Matcher::Regex(re) => {
            let replacement = regex_replacement(&replacement);
            map_strings(x, |s| Ok(re.replacen(s, limit, replacement.as_str()).into_owned()))
        }
    }
}

/// Replace the first match in every element.
pub fn sub(
    pattern: impl Into<ArrayLike>,
    replacement: impl Into<ArrayLike>,
    x: impl Into<ArrayLike>,
    ignore_case: bool,
    fixed: bool,
) -> Result<RObject, DatarError> {
    substitute(pattern, replacement, x, ignore_case, fixed, false)
}

/// Replace every match in every element.
pub fn gsub(
    pattern: impl Into<ArrayLike>,
    replacement: impl Into<ArrayLike>,
    x: impl Into<ArrayLike>,
    ignore_case: bool,
    fixed: bool,
) -> Result<RObject, DatarError> {
    substitute(pattern, replacement, x, ignore_case, fixed, true)
}

/// Split every element; the result is a list with one array per element.
pub fn strsplit(x: impl Into<ArrayLike>, split: &str, fixed: bool) -> Result<RObject, DatarError> {
    let x = make_array(x, None)?;
    let matcher = Matcher::new(split, fixed, false, "strsplit")?;
    let items = strings(&x)?
        .into_iter()
        .map(|s| {
            let parts: Vec<Option<String>> = match s {
                None => vec![None],
                Some(s) if split.is_empty() => s.chars().map(|c| Some(c.to_string())).collect(),
                Some(s) => match &matcher {
                    Matcher::Fixed(sep) => {
                        s.split(sep.as_str()).map(|p| Some(p.to_owned())).collect()
                    }
                    Matcher::Regex(re) => re.split(&s).map(|p| Some(p.to_owned())).collect(),
                },
            };
            string_array(parts).map(RObject::Array)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RObject::List(items))
}

/// Concatenate broadcast inputs element by element with `sep`, skipping
/// missing pieces; `collapse` then joins the rows into one string.
pub fn paste(
    args: Vec<ArrayLike>,
    sep: &str,
    collapse: Option<&str>,
) -> Result<RObject, DatarError> {
    let columns = broadcast_arrays(args)?
        .iter()
        .map(strings)
        .collect::<Result<Vec<_>, _>>()?;
    let rows = columns.first().map_or(0, Vec::len);
    let pasted: Vec<String> = (0..rows)
        .map(|row| {
            columns
                .iter()
                .filter_map(|col| col[row].as_deref())
                .collect::<Vec<_>>()
                .join(sep)
        })
        .collect();
    match collapse {
        Some(collapse) => Ok(RObject::Value(Value::Str(pasted.join(collapse)))),
        None => Ok(RObject::Array(string_array(pasted.into_iter().map(Some).collect())?)),
    }
}

pub fn paste0(args: Vec<ArrayLike>, collapse: Option<&str>) -> Result<RObject, DatarError> {
    paste(args, "", collapse)
}

// ── sprintf ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

fn pad(body: String, spec: &Spec, numeric: bool) -> String {
    let Some(width) = spec.width else {
        return body;
    };
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;
    if spec.left {
        return format!("{body}{}", " ".repeat(fill));
    }
    if spec.zero && numeric {
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), body[1..].to_owned()),
            _ => (String::new(), body),
        };
        return format!("{sign}{}{digits}", "0".repeat(fill));
    }
    format!("{}{body}", " ".repeat(fill))
}

fn signed(body: String, negative: bool, spec: &Spec) -> String {
    if negative {
        format!("-{body}")
    } else if spec.plus {
        format!("+{body}")
    } else if spec.space {
        format!(" {body}")
    } else {
        body
    }
}

fn exponent_form(v: f64, precision: usize, upper: bool) -> String {
    let formatted = format!("{v:.precision$e}");
    let (mantissa, exp) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

fn general_form(v: f64, precision: usize, spec: &Spec, upper: bool) -> String {
    let precision = precision.max(1);
    if v == 0.0 {
        return if spec.alt {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            "0".to_owned()
        };
    }
    let exp_text = exponent_form(v, precision - 1, upper);
    let exp: i32 = exp_text
        .rsplit_once(if upper { 'E' } else { 'e' })
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let body = if exp < -4 || exp >= precision as i32 {
        exp_text
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        format!("{v:.decimals$}")
    };
    if spec.alt {
        return body;
    }
    let e = if upper { 'E' } else { 'e' };
    let (mantissa, exp) = match body.split_once(e) {
        Some((mantissa, exp)) => (mantissa.to_owned(), format!("{e}{exp}")),
        None => (body.clone(), String::new()),
    };
    if mantissa.contains('.') {
        format!("{}{exp}", mantissa.trim_end_matches('0').trim_end_matches('.'))
    } else {
        format!("{mantissa}{exp}")
    }
}

fn format_one(spec: &Spec, conv: char, value: &Value) -> Result<String, DatarError> {
    if value.is_missing() && conv != 's' {
        return Ok(pad("NA".to_owned(), spec, false));
    }
    let number = |value: &Value| value.to_f64().map_err(DatarError::from);
    let body = match conv {
        'd' | 'i' => {
            let v = match value {
                Value::Int(v) => *v,
                Value::Bool(b) => i64::from(*b),
                other => {
                    let f = number(other)?;
                    if f.fract() != 0.0 {
                        return Err(DatarError::invalid(
                            "sprintf",
                            "invalid format '%d'; use format %f, %e, %g or %a for numeric objects",
                        ));
                    }
                    f as i64
                }
            };
            let mut digits = v.unsigned_abs().to_string();
            if let Some(p) = spec.precision {
                if digits.len() < p {
                    digits = format!("{}{digits}", "0".repeat(p - digits.len()));
                }
            }
            signed(digits, v < 0, spec)
        }
        'f' | 'F' => {
            let v = number(value)?;
            let p = spec.precision.unwrap_or(6);
            signed(format!("{:.p$}", v.abs()), v.is_sign_negative() && v != 0.0, spec)
        }
        'e' | 'E' => {
            let v = number(value)?;
            let p = spec.precision.unwrap_or(6);
            signed(exponent_form(v.abs(), p, conv == 'E'), v.is_sign_negative() && v != 0.0, spec)
        }
        'g' | 'G' => {
            let v = number(value)?;
            let p = spec.precision.unwrap_or(6);
            let negative = v.is_sign_negative() && v != 0.0;
            signed(general_form(v.abs(), p, spec, conv == 'G'), negative, spec)
        }
        'x' | 'X' | 'o' => {
            let v = value.to_i64()?;
            let body = match conv {
                'x' => format!("{v:x}"),
                'X' => format!("{v:X}"),
                _ => format!("{v:o}"),
            };
            if spec.alt && v != 0 {
                match conv {
                    'x' => format!("0x{body}"),
                    'X' => format!("0X{body}"),
                    _ => format!("0{body}"),
                }
            } else {
                body
            }
        }
        's' => {
            let text = value.to_string();
            match spec.precision {
                Some(p) => text.chars().take(p).collect(),
                None => text,
            }
        }
        other => {
            return Err(DatarError::invalid(
                "sprintf",
                format!("unrecognised format specification '%{other}'"),
            ));
        }
    };
    Ok(pad(body, spec, conv != 's'))
}

fn format_row(fmt: &str, args: &[Value]) -> Result<String, DatarError> {
    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars().peekable();
    let mut next_arg = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut spec = Spec::default();
        while let Some(flag) = chars.peek().copied() {
            match flag {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '0' => spec.zero = true,
                '#' => spec.alt = true,
                _ => break,
            }
            chars.next();
        }
        let mut width = String::new();
        while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
            width.push(d);
            chars.next();
        }
        spec.width = width.parse().ok();
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                precision.push(d);
                chars.next();
            }
            spec.precision = Some(precision.parse().unwrap_or(0));
        }
        let Some(conv) = chars.next() else {
            return Err(DatarError::invalid("sprintf", "unrecognised format specification '%'"));
        };
        let Some(value) = args.get(next_arg) else {
            return Err(DatarError::invalid("sprintf", "too few arguments"));
        };
        next_arg += 1;
        out.push_str(&format_one(&spec, conv, value)?);
    }
    Ok(out)
}

/// C-style formatting, vectorized over `fmt` and every argument.
pub fn sprintf(fmt: impl Into<ArrayLike>, args: Vec<ArrayLike>) -> Result<RArray, DatarError> {
    let mut inputs = Vec::with_capacity(args.len() + 1);
    inputs.push(fmt.into());
    inputs.extend(args);
    let columns = broadcast_arrays(inputs)?
        .iter()
        .map(RArray::values)
        .collect::<Result<Vec<_>, _>>()?;
    let rows = columns.first().map_or(0, Vec::len);
    let out = (0..rows)
        .map(|row| {
            let Value::Str(fmt) = &columns[0][row] else {
                return Ok(None);
            };
            let args: Vec<Value> = columns[1..].iter().map(|col| col[row].clone()).collect();
            format_row(fmt, &args).map(Some)
        })
        .collect::<Result<Vec<_>, DatarError>>()?;
    string_array(out)
}

// ── Substrings and affixes ─────────────────────────────────────────────

fn char_slice(text: &str, start: i64, stop: i64) -> String {
    let len = text.chars().count() as i64;
    let resolve = |pos: i64| if pos < 0 { (pos + len).max(0) } else { pos.min(len) };
    let (start, stop) = (resolve(start), resolve(stop));
    if stop <= start {
        return String::new();
    }
    text.chars()
        .skip(start as usize)
        .take((stop - start) as usize)
        .collect()
}

/// Characters `start..stop` (0-based, `stop` exclusive, negatives count
/// from the end).
pub fn substr(x: impl Into<ArrayLike>, start: i64, stop: i64) -> Result<RObject, DatarError> {
    map_strings(x, |s| Ok(char_slice(s, start, stop)))
}

/// Like [`substr`] with an open-ended default `last`.
pub fn substring(
    x: impl Into<ArrayLike>,
    first: i64,
    last: Option<i64>,
) -> Result<RObject, DatarError> {
    substr(x, first, last.unwrap_or(i64::MAX))
}

fn test_strings(
    x: impl Into<ArrayLike>,
    test: impl Fn(&str) -> bool,
) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let out = strings(&x)?
        .into_iter()
        .map(|s| s.map(|s| test(&s)))
        .collect();
    scalar_aware(scalar, bool_array(out)?)
}

pub fn startswith(x: impl Into<ArrayLike>, prefix: &str) -> Result<RObject, DatarError> {
    test_strings(x, |s| s.starts_with(prefix))
}

pub fn endswith(x: impl Into<ArrayLike>, suffix: &str) -> Result<RObject, DatarError> {
    test_strings(x, |s| s.ends_with(suffix))
}

/// Parse decimal integers; anything that is not all digits becomes `NA`.
pub fn strtoi(x: impl Into<ArrayLike>, base: u32) -> Result<RObject, DatarError> {
    if base != 0 && base != 10 {
        return Err(DatarError::invalid("strtoi", format!("base {base} is not supported, use 10")));
    }
    let (x, scalar) = prepare(x)?;
    let out: Int64Array = strings(&x)?
        .iter()
        .map(|s| {
            s.as_deref()
                .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
                .and_then(|s| s.parse::<i64>().ok())
        })
        .collect();
    scalar_aware(scalar, RArray::create(Arc::new(out))?)
}

/// Which side [`trimws`] strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimSide {
    #[default]
    Both,
    Left,
    Right,
}

impl std::str::FromStr for TrimSide {
    type Err = DatarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(Self::Both),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(DatarError::invalid(
                "trimws",
                format!("`which` must be one of \"both\", \"left\" or \"right\", got {other:?}"),
            )),
        }
    }
}

/// Strip `whitespace` characters (the backend default when `None`).
pub fn trimws(
    x: impl Into<ArrayLike>,
    which: TrimSide,
    whitespace: Option<&str>,
) -> Result<RObject, DatarError> {
    let chars: Vec<char> = match whitespace {
        Some(ws) => ws.chars().collect(),
        None => crate::options::current().trim_whitespace.chars().collect(),
    };
    let strip = chars.as_slice();
    map_strings(x, |s| {
        Ok(match which {
            TrimSide::Both => s.trim_matches(strip),
            TrimSide::Left => s.trim_start_matches(strip),
            TrimSide::Right => s.trim_end_matches(strip),
        }
        .to_owned())
    })
}

pub fn toupper(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_strings(x, |s| Ok(s.to_uppercase()))
}

pub fn tolower(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_strings(x, |s| Ok(s.to_lowercase()))
}

/// Translate characters of `old` to the matching ones of `new`, all at once.
pub fn chartr(old: &str, new: &str, x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    if old.len() > new.len() {
        return Err(DatarError::invalid("chartr", "'old' is longer than 'new'"));
    }
    map_strings(x, |s| {
        Ok(s.chars()
            .map(|c| old.iter().rposition(|o| *o == c).map_or(c, |pos| new[pos]))
            .collect())
    })
}

// ── Measuring ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NcharType {
    #[default]
    Chars,
    Bytes,
    Width,
}

impl std::str::FromStr for NcharType {
    type Err = DatarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chars" => Ok(Self::Chars),
            "bytes" => Ok(Self::Bytes),
            "width" => Ok(Self::Width),
            other => Err(DatarError::invalid(
                "nchar",
                format!("invalid 'type' argument {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NcharOptions {
    pub type_: NcharType,
    /// Keep `NA` for missing elements. `None` keeps it unless measuring width.
    pub keep_na: Option<bool>,
}

#[cfg(feature = "width")]
fn display_width(text: &str) -> Result<i64, DatarError> {
    Ok(unicode_width::UnicodeWidthStr::width(text) as i64)
}

#[cfg(not(feature = "width"))]
fn display_width(_text: &str) -> Result<i64, DatarError> {
    Err(DatarError::MissingDependency {
        feature: "nchar(type = \"width\")".to_owned(),
        install: "cargo build --features da-base/width".to_owned(),
    })
}

/// Length of each element. Missing elements count as the backend's `na_len`
/// unless `NA` is kept.
pub fn nchar(x: impl Into<ArrayLike>, opts: NcharOptions) -> Result<RObject, DatarError> {
    let keep_na = opts.keep_na.unwrap_or(opts.type_ != NcharType::Width);
    let na_len = crate::options::current().na_len as i64;
    let (x, scalar) = prepare(x)?;
    let out = strings(&x)?
        .iter()
        .map(|s| match s {
            None if keep_na => Ok(None),
            None => Ok(Some(na_len)),
            Some(s) => match opts.type_ {
                NcharType::Chars => Ok(Some(s.chars().count() as i64)),
                NcharType::Bytes => Ok(Some(s.len() as i64)),
                NcharType::Width => display_width(s).map(Some),
            },
        })
        .collect::<Result<Vec<_>, DatarError>>()?;
    scalar_aware(scalar, crate::from_ints(out)?)
}

/// Whether each element is non-empty. Missing elements are `TRUE` unless
/// `keep_na`.
pub fn nzchar(x: impl Into<ArrayLike>, keep_na: bool) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    let out = strings(&x)?
        .iter()
        .map(|s| match s {
            None if keep_na => None,
            None => Some(true),
            Some(s) => Some(!s.is_empty()),
        })
        .collect();
    scalar_aware(scalar, bool_array(out)?)
}

#[cfg(test)]
mod tests {
    use da_columnar::{DatarError, RObject};
    use da_types::Value;

    use super::{
        GrepOptions, NcharOptions, NcharType, TrimSide, chartr, endswith, grep, grepl, gsub, nchar,
        nzchar, paste, paste0, sprintf, startswith, strsplit, strtoi, sub, substr, substring,
        tolower, toupper, trimws,
    };

    fn strs(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn grep_positions_values_and_inversion() {
        let x = vec!["apple", "banana", "cherry"];
        let out = grep("an", x.clone(), GrepOptions::default()).expect("grep");
        assert_eq!(out.values().expect("values"), vec![Value::Int(1)]);
        let opts = GrepOptions {
            value: true,
            invert: true,
            ..GrepOptions::default()
        };
        assert_eq!(
            grep("an", x.clone(), opts).expect("grep").values().expect("values"),
            strs(&["apple", "cherry"])
        );
        let opts = GrepOptions {
            ignore_case: true,
            ..GrepOptions::default()
        };
        assert_eq!(
            grep("^A", x, opts).expect("grep").values().expect("values"),
            vec![Value::Int(0)]
        );
    }

    #[test]
    fn grepl_fixed_and_missing() {
        let opts = GrepOptions {
            fixed: true,
            ..GrepOptions::default()
        };
        let out = grepl("a.", vec![Some("a.b"), Some("ab"), None], opts).expect("grepl");
        assert_eq!(
            out.values().expect("values"),
            vec![Value::Bool(true), Value::Bool(false), Value::Bool(false)]
        );
        assert_eq!(
            grepl("b", "abc", GrepOptions::default()).expect("grepl"),
            RObject::Value(Value::Bool(true))
        );
    }

    #[test]
    fn sub_and_gsub() {
        assert_eq!(
            sub("a", "o", "banana", false, false).expect("sub"),
            RObject::Value(Value::from("bonana"))
        );
        assert_eq!(
            gsub("a", "o", "banana", false, false).expect("gsub"),
            RObject::Value(Value::from("bonono"))
        );
        assert_eq!(
            gsub("(\\w+)@(\\w+)", "\\2 at \\1", "me@host", false, false).expect("gsub"),
            RObject::Value(Value::from("host at me"))
        );
        assert_eq!(
            gsub(".", "$", "a.b", false, true).expect("gsub"),
            RObject::Value(Value::from("a$b"))
        );
        assert!(matches!(sub("a", "b", "a", true, false), Err(DatarError::Unsupported { .. })));
        let out = sub(vec!["a", "b"], "x", "ab", false, false).expect("first pattern");
        assert_eq!(out, RObject::Value(Value::from("xb")));
    }

    #[test]
    fn strsplit_returns_a_list() {
        let split = strsplit(vec![Some("a,b"), None, Some("c")], ",", true).expect("split");
        let RObject::List(items) = split else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].values().expect("values"), strs(&["a", "b"]));
        assert_eq!(items[1].values().expect("values"), vec![Value::Null]);
        let RObject::List(chars) = strsplit("abc", "", false).expect("split") else {
            panic!("expected a list");
        };
        assert_eq!(chars[0].values().expect("values"), strs(&["a", "b", "c"]));
    }

    #[test]
    fn paste_skips_missing_and_collapses() {
        let out = paste(vec![vec!["a", "b"].into(), 1i64.into()], "-", None).expect("paste");
        assert_eq!(out.values().expect("values"), strs(&["a-1", "b-1"]));
        let out = paste(vec![vec![Some("a"), None].into(), "z".into()], " ", None).expect("paste");
        assert_eq!(out.values().expect("values"), strs(&["a z", "z"]));
        let out = paste0(vec![vec!["x", "y"].into()], Some("+")).expect("paste0");
        assert_eq!(out, RObject::Value(Value::from("x+y")));
    }

    #[test]
    fn sprintf_formats_like_c() {
        let out = sprintf("%5.2f|%-4d|%s", vec![2.5.into(), 42i64.into(), "ok".into()])
            .expect("sprintf");
        assert_eq!(out.values().expect("values"), strs(&[" 2.50|42  |ok"]));
        let out = sprintf("%03d", vec![vec![1i64, 22].into()]).expect("sprintf");
        assert_eq!(out.values().expect("values"), strs(&["001", "022"]));
        let out = sprintf("%e|%g|%g", vec![12345.678.into(), 0.0001.into(), 1e10.into()])
            .expect("sprintf");
        assert_eq!(out.values().expect("values"), strs(&["1.234568e+04|0.0001|1e+10"]));
        let out = sprintf("%d%%", vec![Value::Null.into()]).expect("sprintf");
        assert_eq!(out.values().expect("values"), strs(&["NA%"]));
        assert!(sprintf("%d", vec![1.5.into()]).is_err());
    }

    #[test]
    fn substrings_are_zero_based() {
        assert_eq!(substr("abcdef", 1, 3).expect("substr"), RObject::Value(Value::from("bc")));
        assert_eq!(substr("abcdef", -2, 6).expect("substr"), RObject::Value(Value::from("ef")));
        assert_eq!(
            substring("abcdef", 2, None).expect("substring"),
            RObject::Value(Value::from("cdef"))
        );
    }

    #[test]
    fn open_ended_substring_keeps_long_tails() {
        let long = "x".repeat(1_000_005);
        let out = substring(long.as_str(), 1, None).expect("substring");
        let RObject::Value(Value::Str(tail)) = out else {
            panic!("a scalar string gives a scalar string");
        };
        assert_eq!(tail.chars().count(), 1_000_004);
    }

    #[test]
    fn affixes_and_integers() {
        let out = startswith(vec![Some("abc"), None], "ab").expect("starts");
        assert_eq!(out.values().expect("values"), vec![Value::Bool(true), Value::Null]);
        assert_eq!(endswith("abc", "bc").expect("ends"), RObject::Value(Value::Bool(true)));
        let out = strtoi(vec!["12", "x1", ""], 10).expect("strtoi");
        assert_eq!(out.values().expect("values"), vec![Value::Int(12), Value::Null, Value::Null]);
        assert!(strtoi("12", 16).is_err());
    }

    #[test]
    fn trimming_and_case() {
        assert_eq!(
            trimws(" \ta b\t ", TrimSide::Both, None).expect("trim"),
            RObject::Value(Value::from("a b"))
        );
        assert_eq!(
            trimws("  a  ", TrimSide::Left, None).expect("trim"),
            RObject::Value(Value::from("a  "))
        );
        assert_eq!(
            trimws("xxaxx", TrimSide::Right, Some("x")).expect("trim"),
            RObject::Value(Value::from("xxa"))
        );
        assert!("middle".parse::<TrimSide>().is_err());
        assert_eq!(toupper("abc").expect("upper"), RObject::Value(Value::from("ABC")));
        assert_eq!(tolower("ABC").expect("lower"), RObject::Value(Value::from("abc")));
    }

    #[test]
    fn chartr_maps_simultaneously() {
        assert_eq!(
            chartr("ab", "ba", "abba").expect("chartr"),
            RObject::Value(Value::from("baab"))
        );
        assert!(chartr("abc", "x", "a").is_err());
    }

    #[test]
    fn nchar_and_nzchar() {
        let x = vec![Some("héllo"), None];
        let out = nchar(x.clone(), NcharOptions::default()).expect("nchar");
        assert_eq!(out.values().expect("values"), vec![Value::Int(5), Value::Null]);
        let opts = NcharOptions {
            type_: NcharType::Bytes,
            keep_na: Some(false),
        };
        assert_eq!(
            nchar(x.clone(), opts).expect("nchar").values().expect("values"),
            vec![Value::Int(6), Value::Int(2)]
        );
        assert_eq!(
            nchar(123i64, NcharOptions::default()).expect("nchar"),
            RObject::Value(Value::Int(3))
        );
        assert!("lines".parse::<NcharType>().is_err());
        assert_eq!(
            nzchar(vec![Some(""), Some("a"), None], false)
                .expect("nzchar")
                .values()
                .expect("values"),
            vec![Value::Bool(false), Value::Bool(true), Value::Bool(true)]
        );
        assert_eq!(
            nzchar(x, true).expect("nzchar").values().expect("values"),
            vec![Value::Bool(true), Value::Null]
        );
    }

    #[cfg(not(feature = "width"))]
    #[test]
    fn width_needs_the_feature() {
        let opts = NcharOptions {
            type_: NcharType::Width,
            keep_na: None,
        };
        assert!(matches!(nchar("a", opts), Err(DatarError::MissingDependency { .. })));
    }
}
