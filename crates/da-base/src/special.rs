//! Special functions (gamma, beta, binomial coefficients and relatives).
//!
//! The numerics come from a [`SpecialProvider`]. Without the `special` feature
//! no provider is compiled in and every function reports a missing
//! dependency; with it, [`StatrsProvider`] backs the functions `statrs` has.

use da_columnar::{ArrayLike, DatarError, RObject};

use crate::{map_doubles, zip_doubles};

fn missing(function: &str) -> DatarError {
    DatarError::MissingDependency {
        feature: format!("special function `{function}`"),
        install: "cargo build --features da-base/special".to_owned(),
    }
}

/// Source of special-function numerics. Every method defaults to a missing
/// dependency error so providers only implement what they support.
pub trait SpecialProvider {
    fn name(&self) -> &'static str;

    fn gamma(&self, _x: f64) -> Result<f64, DatarError> {
        Err(missing("gamma"))
    }

    fn lgamma(&self, _x: f64) -> Result<f64, DatarError> {
        Err(missing("lgamma"))
    }

    fn digamma(&self, _x: f64) -> Result<f64, DatarError> {
        Err(missing("digamma"))
    }

    fn trigamma(&self, _x: f64) -> Result<f64, DatarError> {
        Err(missing("trigamma"))
    }

    fn psigamma(&self, x: f64, deriv: i64) -> Result<f64, DatarError> {
        match deriv {
            0 => self.digamma(x),
            1 => self.trigamma(x),
            _ => Err(missing("psigamma")),
        }
    }

    fn beta(&self, _a: f64, _b: f64) -> Result<f64, DatarError> {
        Err(missing("beta"))
    }

    fn lbeta(&self, _a: f64, _b: f64) -> Result<f64, DatarError> {
        Err(missing("lbeta"))
    }

    fn bessel_i(&self, _x: f64, _nu: f64, _expon_scaled: bool) -> Result<f64, DatarError> {
        Err(missing("bessel_i"))
    }

    fn bessel_j(&self, _x: f64, _nu: f64) -> Result<f64, DatarError> {
        Err(missing("bessel_j"))
    }

    fn bessel_k(&self, _x: f64, _nu: f64, _expon_scaled: bool) -> Result<f64, DatarError> {
        Err(missing("bessel_k"))
    }

    fn bessel_y(&self, _x: f64, _nu: f64) -> Result<f64, DatarError> {
        Err(missing("bessel_y"))
    }
}

/// The provider compiled in when no numerics library is enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProvider;

impl SpecialProvider for NoProvider {
    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(feature = "special")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StatrsProvider;

#[cfg(feature = "special")]
impl SpecialProvider for StatrsProvider {
    fn name(&self) -> &'static str {
        "statrs"
    }

    fn gamma(&self, x: f64) -> Result<f64, DatarError> {
        Ok(statrs::function::gamma::gamma(x))
    }

    fn lgamma(&self, x: f64) -> Result<f64, DatarError> {
        Ok(statrs::function::gamma::ln_gamma(x))
    }

    fn digamma(&self, x: f64) -> Result<f64, DatarError> {
        Ok(statrs::function::gamma::digamma(x))
    }

    fn beta(&self, a: f64, b: f64) -> Result<f64, DatarError> {
        Ok(statrs::function::beta::checked_beta(a, b).unwrap_or(f64::NAN))
    }

    fn lbeta(&self, a: f64, b: f64) -> Result<f64, DatarError> {
        Ok(statrs::function::beta::checked_ln_beta(a, b).unwrap_or(f64::NAN))
    }
}

/// The provider used by the functions without a `_with` suffix.
#[must_use]
pub fn default_provider() -> Box<dyn SpecialProvider> {
    #[cfg(feature = "special")]
    {
        Box::new(StatrsProvider)
    }
    #[cfg(not(feature = "special"))]
    {
        Box::new(NoProvider)
    }
}

/// Run `f` over every present element, surfacing the first provider error.
pub(crate) fn try_map(
    x: impl Into<ArrayLike>,
    func: &str,
    f: impl Fn(f64) -> Result<f64, DatarError>,
) -> Result<RObject, DatarError> {
    let failure = std::cell::RefCell::new(None);
    let out = map_doubles(x, func, |v| match f(v) {
        Ok(out) => out,
        Err(err) => {
            failure.borrow_mut().get_or_insert(err);
            f64::NAN
        }
    })?;
    match failure.into_inner() {
        Some(err) => Err(err),
        None => Ok(out),
    }
}

macro_rules! unary_special {
    ($($name:ident, $with:ident, $method:ident;)*) => {
        $(
            pub fn $with(
                provider: &dyn SpecialProvider,
                x: impl Into<ArrayLike>,
            ) -> Result<RObject, DatarError> {
                try_map(x, stringify!($name), |v| provider.$method(v))
            }

            pub fn $name(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
                $with(default_provider().as_ref(), x)
            }
        )*
    };
}

unary_special! {
    gamma, gamma_with, gamma;
    lgamma, lgamma_with, lgamma;
    digamma, digamma_with, digamma;
    trigamma, trigamma_with, trigamma;
}

macro_rules! binary_special {
    ($($name:ident, $with:ident, $method:ident;)*) => {
        $(
            pub fn $with(
                provider: &dyn SpecialProvider,
                a: impl Into<ArrayLike>,
                b: impl Into<ArrayLike>,
            ) -> Result<RObject, DatarError> {
                zip_doubles(a, b, stringify!($name), |a, b| provider.$method(a, b))
            }

            pub fn $name(
                a: impl Into<ArrayLike>,
                b: impl Into<ArrayLike>,
            ) -> Result<RObject, DatarError> {
                $with(default_provider().as_ref(), a, b)
            }
        )*
    };
}

binary_special! {
    beta, beta_with, beta;
    lbeta, lbeta_with, lbeta;
}

pub fn psigamma_with(
    provider: &dyn SpecialProvider,
    x: impl Into<ArrayLike>,
    deriv: i64,
) -> Result<RObject, DatarError> {
    try_map(x, "psigamma", |v| provider.psigamma(v, deriv))
}

pub fn psigamma(x: impl Into<ArrayLike>, deriv: i64) -> Result<RObject, DatarError> {
    psigamma_with(default_provider().as_ref(), x, deriv)
}

pub fn factorial_with(
    provider: &dyn SpecialProvider,
    x: impl Into<ArrayLike>,
) -> Result<RObject, DatarError> {
    try_map(x, "factorial", |v| provider.gamma(v + 1.0))
}

pub fn factorial(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    factorial_with(default_provider().as_ref(), x)
}

pub fn lfactorial_with(
    provider: &dyn SpecialProvider,
    x: impl Into<ArrayLike>,
) -> Result<RObject, DatarError> {
    try_map(x, "lfactorial", |v| provider.lgamma(v + 1.0))
}

pub fn lfactorial(x: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    lfactorial_with(default_provider().as_ref(), x)
}

/// Binomial coefficient for real `n` and `k` rounded to an integer.
fn choose_value(n: f64, k: f64) -> f64 {
    let k = k.round();
    if k < 0.0 {
        return 0.0;
    }
    let mut out = 1.0;
    let mut i = 1.0;
    while i <= k {
        out *= (n - k + i) / i;
        i += 1.0;
    }
    if n.fract() == 0.0 { out.round() } else { out }
}

/// `choose` needs no provider; it is a finite product.
pub fn choose(n: impl Into<ArrayLike>, k: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    zip_doubles(n, k, "choose", |n, k| Ok(choose_value(n, k)))
}

pub fn lchoose(n: impl Into<ArrayLike>, k: impl Into<ArrayLike>) -> Result<RObject, DatarError> {
    zip_doubles(n, k, "lchoose", |n, k| Ok(choose_value(n, k).abs().ln()))
}
