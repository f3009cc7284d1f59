//! Arithmetic, rounding and summary statistics.
//!
//! Elementwise functions keep the input's shape: a scalar in, a scalar out.
//! Reductions return a host [`Value`]; `NA` propagates unless `na_rm` is set.

use std::cmp::Ordering;

use da_columnar::{
    ArrayLike, DatarError, RArray, RObject, UnaryOp, make_array, transpose_arrays, unop,
};
use da_types::{DType, Value};

use crate::{
    doubles, finite_or_missing, from_doubles, map_doubles, prepare, present, require_numeric,
    scalar_aware,
};

pub fn ceiling(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "ceiling", f64::ceil)
}

pub fn floor(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "floor", f64::floor)
}

pub fn trunc(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "trunc", f64::trunc)
}

pub fn sqrt(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "sqrt", f64::sqrt)
}

pub fn exp(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "exp", f64::exp)
}

/// Logarithm in `base`; `None` is the natural logarithm.
pub fn log(x: impl Into<ArrayLike>, base: Option<f64>) -> Result<RObject, DatarError> {
    match base {
        None => map_doubles(x, "log", f64::ln),
        Some(base) => map_doubles(x, "log", move |v| v.log10() / base.log10()),
    }
}

pub fn log2(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "log2", f64::log2)
}

pub fn log10(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "log10", f64::log10)
}

pub fn log1p(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "log1p", f64::ln_1p)
}

pub fn sign(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "sign", |v| {
        if v.is_nan() || v == 0.0 { v } else { v.signum() }
    })
}

/// Absolute value, keeping integers integral.
pub fn abs(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    scalar_aware(scalar, unop(UnaryOp::Abs, &x)?)
}

fn round_half_even(v: f64, digits: i32) -> f64 {
    if !v.is_finite() {
        return v;
    }
    if digits < 0 {
        let scale = 10f64.powi(-digits);
        return (v / scale).round_ties_even() * scale;
    }
    let scale = 10f64.powi(digits);
    let scaled = v * scale;
    if !scaled.is_finite() {
        return v;
    }
    scaled.round_ties_even() / scale
}

/// Round to `digits` decimal places, halves to even. Integers are returned
/// unchanged when `digits` is not negative.
pub fn round(x: impl Into<ArrayLike>, digits: i32) -> Result<RObject, DatarError> {
    let (x, scalar) = prepare(x)?;
    if digits >= 0 && matches!(x.dtype(), Some(DType::Int64)) {
        return scalar_aware(scalar, x);
    }
    let out = doubles(&x, "round")?
        .into_iter()
        .map(|v| v.map(|v| round_half_even(v, digits)))
        .collect();
    scalar_aware(scalar, from_doubles(out)?)
}

/// Round to `digits` significant digits.
pub fn signif(x: impl Into<ArrayLike>, digits: i32) -> Result<RObject, DatarError> {
    let digits = digits.max(1);
    map_doubles(x, "signif", move |v| {
        if v == 0.0 || !v.is_finite() {
            return v;
        }
        let magnitude = v.abs().log10().ceil() as i32;
        round_half_even(v, digits - magnitude)
    })
}

// ── Reductions ─────────────────────────────────────────────────────────

fn collect_doubles(
    x: impl Into<ArrayLike>,
    func: &str,
    na_rm: bool,
) -> Result<Option<Vec<f64>>, DatarError> {
    let x = make_array(x, None)?;
    Ok(present(finite_or_missing(doubles(&x, func)?), na_rm))
}

pub fn sum(x: impl Into<ArrayLike>, na_rm: bool) -> Result<Value, DatarError> {
    let x = make_array(x, None)?;
    require_numeric(&x, "sum")?;
    if matches!(x.dtype(), Some(DType::Float64)) {
        return Ok(present(finite_or_missing(doubles(&x, "sum")?), na_rm)
            .map_or(Value::Null, |vals| Value::Float(vals.iter().sum())));
    }
    let ints: Vec<Option<i64>> = x
        .values()?
        .into_iter()
        .map(|v| v.to_i64().ok())
        .collect();
    let Some(ints) = present(ints, na_rm) else {
        return Ok(Value::Null);
    };
    let total = ints.iter().try_fold(0i64, |acc, v| acc.checked_add(*v));
    if total.is_none() {
        log::warn!("[da-base] In sum(...): integer overflow - use sum(as_double(.))");
    }
    Ok(Value::from(total))
}

pub fn prod(x: impl Into<ArrayLike>, na_rm: bool) -> Result<Value, DatarError> {
    Ok(collect_doubles(x, "prod", na_rm)?
        .map_or(Value::Null, |vals| Value::Float(vals.iter().product())))
}

pub fn mean(x: impl Into<ArrayLike>, na_rm: bool) -> Result<Value, DatarError> {
    Ok(collect_doubles(x, "mean", na_rm)?.map_or(Value::Null, |vals| {
        Value::Float(vals.iter().sum::<f64>() / vals.len() as f64)
    }))
}

fn sorted(mut vals: Vec<f64>) -> Vec<f64> {
    vals.sort_by(f64::total_cmp);
    vals
}

pub fn median(x: impl Into<ArrayLike>, na_rm: bool) -> Result<Value, DatarError> {
    let Some(vals) = collect_doubles(x, "median", na_rm)? else {
        return Ok(Value::Null);
    };
    let vals = sorted(vals);
    let n = vals.len();
    Ok(match n {
        0 => Value::Null,
        _ if n % 2 == 1 => Value::Float(vals[n / 2]),
        _ => Value::Float((vals[n / 2 - 1] + vals[n / 2]) / 2.0),
    })
}

fn variance(vals: &[f64], ddof: usize) -> Option<f64> {
    let n = vals.len();
    if n <= ddof {
        return None;
    }
    let mean = vals.iter().sum::<f64>() / n as f64;
    let ss: f64 = vals.iter().map(|v| (v - mean).powi(2)).sum();
    Some(ss / (n - ddof) as f64)
}

pub fn var(x: impl Into<ArrayLike>, na_rm: bool, ddof: usize) -> Result<Value, DatarError> {
    Ok(collect_doubles(x, "var", na_rm)?
        .and_then(|vals| variance(&vals, ddof))
        .map_or(Value::Null, Value::Float))
}

pub fn sd(x: impl Into<ArrayLike>, na_rm: bool, ddof: usize) -> Result<Value, DatarError> {
    Ok(collect_doubles(x, "sd", na_rm)?
        .and_then(|vals| variance(&vals, ddof))
        .map_or(Value::Null, |v| Value::Float(v.sqrt())))
}

fn extreme(
    x: impl Into<ArrayLike>,
    na_rm: bool,
    func: &str,
    keep: Ordering,
) -> Result<Value, DatarError> {
    let x = make_array(x, None)?;
    let values: Vec<Option<Value>> = x
        .values()?
        .into_iter()
        .map(|v| Some(v).filter(|v| !v.is_missing()))
        .collect();
    let Some(values) = present(values, na_rm) else {
        return Ok(Value::Null);
    };
    let mut best: Option<Value> = None;
    for value in values {
        best = match best {
            Some(current) => match value.compare(&current) {
                Some(ord) if ord == keep => Some(value),
                Some(_) => Some(current),
                None => {
                    return Err(DatarError::unsupported(
                        func,
                        format!("cannot compare {} with {}", value.dtype(), current.dtype()),
                    ));
                }
            },
            None => Some(value),
        };
    }
    Ok(best.unwrap_or_else(|| {
        log::warn!("[da-base] In {func}(...): no non-missing arguments; returning Inf");
        Value::Float(if keep == Ordering::Less {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        })
    }))
}

pub fn min(x: impl Into<ArrayLike>, na_rm: bool) -> Result<Value, DatarError> {
    extreme(x, na_rm, "min", Ordering::Less)
}

pub fn max(x: impl Into<ArrayLike>, na_rm: bool) -> Result<Value, DatarError> {
    extreme(x, na_rm, "max", Ordering::Greater)
}

fn parallel(
    args: Vec<ArrayLike>,
    na_rm: bool,
    func: &str,
    keep: Ordering,
) -> Result<RArray, DatarError> {
    let rows = transpose_arrays(args)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if row.null_count() == row.len() {
            out.push(Value::Null);
        } else {
            out.push(extreme(row, na_rm, func, keep)?);
        }
    }
    RArray::from_values(&out)
}

/// Elementwise maxima across broadcast inputs.
pub fn pmax(args: Vec<ArrayLike>, na_rm: bool) -> Result<RArray, DatarError> {
    parallel(args, na_rm, "pmax", Ordering::Greater)
}

/// Elementwise minima across broadcast inputs.
pub fn pmin(args: Vec<ArrayLike>, na_rm: bool) -> Result<RArray, DatarError> {
    parallel(args, na_rm, "pmin", Ordering::Less)
}

/// Covariance of two equally long vectors over complete pairs.
pub fn cov(
    x: impl Into<ArrayLike>,
    y: Option<ArrayLike>,
    na_rm: bool,
    ddof: usize,
) -> Result<Value, DatarError> {
    let Some(y) = y else {
        return Err(DatarError::invalid(
            "cov",
            "`y` must be provided if `x` is a vector",
        ));
    };
    let x = finite_or_missing(doubles(&make_array(x, None)?, "cov")?);
    let y = finite_or_missing(doubles(&make_array(y, None)?, "cov")?);
    if x.len() != y.len() {
        return Err(DatarError::invalid("cov", "incompatible dimensions"));
    }
    let pairs: Vec<Option<(f64, f64)>> = x.into_iter().zip(y).map(|(a, b)| a.zip(b)).collect();
    let Some(pairs) = present(pairs, na_rm) else {
        return Ok(Value::Null);
    };
    let n = pairs.len();
    if n <= ddof {
        return Ok(Value::Null);
    }
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n as f64;
    let cross: f64 = pairs.iter().map(|(a, b)| (a - mean_x) * (b - mean_y)).sum();
    Ok(Value::Float(cross / (n - ddof) as f64))
}

/// How `scale` centers or scales a vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleArg {
    /// Use the mean (centering) or the standard deviation (scaling).
    Auto,
    Off,
    By(f64),
}

/// Center and scale a numeric vector.
///
/// Without centering, automatic scaling divides by the root mean square,
/// `sqrt(sum(x^2) / (n - 1))`.
pub fn scale(
    x: impl Into<ArrayLike>,
    center: ScaleArg,
    scale: ScaleArg,
) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let mut vals = finite_or_missing(doubles(&x, "scale")?);
    let complete: Vec<f64> = vals.iter().flatten().copied().collect();
    let n = complete.len() as f64;

    let shift = match center {
        ScaleArg::Auto => Some(complete.iter().sum::<f64>() / n),
        ScaleArg::Off => None,
        ScaleArg::By(v) => Some(v),
    };
    if let Some(shift) = shift {
        vals.iter_mut().flatten().for_each(|v| *v -= shift);
    }

    let divisor = match scale {
        ScaleArg::Auto => {
            let ss: f64 = vals.iter().flatten().map(|v| v * v).sum();
            Some((ss / (n - 1.0)).sqrt())
        }
        ScaleArg::Off => None,
        ScaleArg::By(v) => Some(v),
    };
    if let Some(divisor) = divisor {
        vals.iter_mut().flatten().for_each(|v| *v /= divisor);
    }
    from_doubles(vals)
}

/// Mean of `x` weighted by `w`. All-missing or zero-sum weights give NA.
pub fn weighted_mean(
    x: impl Into<ArrayLike>,
    w: Option<ArrayLike>,
    na_rm: bool,
) -> Result<Value, DatarError> {
    let Some(w) = w else {
        return mean(x, na_rm);
    };
    let arrays = da_columnar::broadcast_arrays(vec![x.into(), w])?;
    let xs = finite_or_missing(doubles(&arrays[0], "weighted_mean")?);
    let ws = finite_or_missing(doubles(&arrays[1], "weighted_mean")?);
    if ws.iter().all(Option::is_none) {
        return Ok(Value::Null);
    }
    let mut num = 0.0;
    let mut den = 0.0;
    for (xv, wv) in xs.into_iter().zip(ws) {
        match (xv, wv) {
            (Some(xv), Some(wv)) => {
                num += xv * wv;
                den += wv;
            }
            (None, _) if na_rm => {}
            _ => return Ok(Value::Null),
        }
    }
    if den == 0.0 {
        return Ok(Value::Null);
    }
    Ok(Value::Float(num / den))
}

fn quantile_at(sorted: &[f64], p: f64, method: i64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = sorted[h.floor() as usize];
    let hi = sorted[h.ceil() as usize];
    match method {
        10 => lo,
        11 => hi,
        12 => sorted[h.round_ties_even() as usize],
        13 => (lo + hi) / 2.0,
        _ => lo + (h - h.floor()) * (hi - lo),
    }
}

/// Sample quantiles at `probs`.
///
/// `type_` selects the interpolation: 7 linear, 10 lower, 11 higher,
/// 12 nearest (halves to even), 13 midpoint. `None` uses the backend option.
pub fn quantile(
    x: impl Into<ArrayLike>,
    probs: impl Into<ArrayLike>,
    na_rm: bool,
    type_: Option<i64>,
) -> Result<RObject, DatarError> {
    let method = type_.unwrap_or_else(|| crate::options::current().quantile_type);
    if !matches!(method, 7 | 10 | 11 | 12 | 13) {
        return Err(DatarError::unsupported(
            "quantile",
            format!("type {method}, expected one of 7, 10, 11, 12, 13"),
        ));
    }
    let (probs, scalar) = prepare(probs)?;
    let probs = doubles(&probs, "quantile")?;
    if probs.iter().flatten().any(|p| !(0.0..=1.0).contains(p)) {
        return Err(DatarError::invalid("quantile", "'probs' outside [0,1]"));
    }
    let vals = collect_doubles(x, "quantile", na_rm)?.map(sorted);
    let out = probs
        .into_iter()
        .map(|p| match (&vals, p) {
            (Some(vals), Some(p)) if !vals.is_empty() => Some(quantile_at(vals, p, method)),
            _ => None,
        })
        .collect();
    scalar_aware(scalar, from_doubles(out)?)
}

/// Each element as a share of the total.
pub fn proportions(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let vals = finite_or_missing(doubles(&x, "proportions")?);
    let total: f64 = vals.iter().flatten().sum();
    from_doubles(vals.into_iter().map(|v| v.map(|v| v / total)).collect())
}
