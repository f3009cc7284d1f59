//! Bessel functions of the first and second kinds and their modified forms.

use da_columnar::{ArrayLike, DatarError, RObject};

use crate::special::{SpecialProvider, default_provider, try_map};

pub fn bessel_i_with(
    provider: &dyn SpecialProvider,
    x: impl Into<ArrayLike>,
    nu: f64,
    expon_scaled: bool,
) -> Result<RObject, DatarError> {
    try_map(x, "bessel_i", |v| provider.bessel_i(v, nu, expon_scaled))
}

pub fn bessel_i(
    x: impl Into<ArrayLike>,
    nu: f64,
    expon_scaled: bool,
) -> Result<RObject, DatarError> {
    bessel_i_with(default_provider().as_ref(), x, nu, expon_scaled)
}

pub fn bessel_j_with(
    provider: &dyn SpecialProvider,
    x: impl Into<ArrayLike>,
    nu: f64,
) -> Result<RObject, DatarError> {
    try_map(x, "bessel_j", |v| provider.bessel_j(v, nu))
}

pub fn bessel_j(x: impl Into<ArrayLike>, nu: f64) -> Result<RObject, DatarError> {
    bessel_j_with(default_provider().as_ref(), x, nu)
}

pub fn bessel_k_with(
    provider: &dyn SpecialProvider,
    x: impl Into<ArrayLike>,
    nu: f64,
    expon_scaled: bool,
) -> Result<RObject, DatarError> {
    try_map(x, "bessel_k", |v| provider.bessel_k(v, nu, expon_scaled))
}

pub fn bessel_k(
    x: impl Into<ArrayLike>,
    nu: f64,
    expon_scaled: bool,
) -> Result<RObject, DatarError> {
    bessel_k_with(default_provider().as_ref(), x, nu, expon_scaled)
}

pub fn bessel_y_with(
    provider: &dyn SpecialProvider,
    x: impl Into<ArrayLike>,
    nu: f64,
) -> Result<RObject, DatarError> {
    try_map(x, "bessel_y", |v| provider.bessel_y(v, nu))
}

pub fn bessel_y(x: impl Into<ArrayLike>, nu: f64) -> Result<RObject, DatarError> {
    bessel_y_with(default_provider().as_ref(), x, nu)
}
