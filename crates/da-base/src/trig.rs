//! Trigonometric and hyperbolic functions.

use std::f64::consts::PI;

use da_columnar::{ArrayLike, DatarError, RObject};

use crate::{map_doubles, zip_doubles};

macro_rules! elementwise {
    ($($name:ident => $f:path;)*) => {
        $(
            pub fn $name(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
                map_doubles(x, stringify!($name), $f)
            }
        )*
    };
}

elementwise! {
    sin => f64::sin;
    cos => f64::cos;
    tan => f64::tan;
    asin => f64::asin;
    acos => f64::acos;
    atan => f64::atan;
    sinh => f64::sinh;
    cosh => f64::cosh;
    tanh => f64::tanh;
    asinh => f64::asinh;
    acosh => f64::acosh;
    atanh => f64::atanh;
}

// Exact at multiples of one half.
fn sin_pi(x: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    let r = x.rem_euclid(2.0);
    if r == 0.0 || r == 1.0 {
        0.0
    } else if r == 0.5 {
        1.0
    } else if r == 1.5 {
        -1.0
    } else {
        (PI * r).sin()
    }
}

fn cos_pi(x: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    let r = x.abs().rem_euclid(2.0);
    if r == 0.5 || r == 1.5 {
        0.0
    } else if r == 1.0 {
        -1.0
    } else if r == 0.0 {
        1.0
    } else {
        (PI * r).cos()
    }
}

fn tan_pi(x: f64) -> f64 {
    if !x.is_finite() {
        return f64::NAN;
    }
    let r = x.rem_euclid(1.0);
    if r == 0.0 {
        0.0
    } else if r == 0.5 {
        f64::NAN
    } else {
        (PI * r).tan()
    }
}

/// `sin(pi * x)`.
pub fn sinpi(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "sinpi", sin_pi)
}

/// `cos(pi * x)`.
pub fn cospi(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "cospi", cos_pi)
}

/// `tan(pi * x)`.
pub fn tanpi(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    map_doubles(x, "tanpi", tan_pi)
}

/// Angle of the point `(x, y)`, broadcasting both coordinates.
pub fn atan2(y: impl Into<ArrayLike>, x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    zip_doubles(y, x, "atan2", |y, x| Ok(y.atan2(x)))
}
