//! Random draws with an explicit, seedable generator.
//!
//! Every sampler has a `_with` form taking a [`RandomState`]; the plain form
//! uses a thread-local state that [`set_seed`] resets.

use std::cell::RefCell;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use da_columnar::{ArrayLike, DatarError, RArray, is_scalar, make_array};
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Cauchy, ChiSquared, Distribution, Exp, Normal, Poisson};

#[derive(Debug, Clone)]
pub struct RandomState {
    rng: StdRng,
}

impl RandomState {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

thread_local! {
    static STATE: RefCell<RandomState> = RefCell::new(RandomState::from_entropy());
}

/// Reset this thread's generator.
pub fn set_seed(seed: u64) {
    STATE.with(|state| *state.borrow_mut() = RandomState::seeded(seed));
}

fn with_state<T>(f: impl FnOnce(&mut RandomState) -> T) -> T {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Number of draws: a scalar is the count, a vector contributes its length.
fn draws(n: impl Into<ArrayLike>, func: &str) -> Result<usize, DatarError> {
    let n = n.into();
    if !is_scalar(&n) {
        return Ok(make_array(n, None)?.len());
    }
    let count = make_array(n, None)?.first()?.to_i64()?;
    usize::try_from(count)
        .map_err(|_| DatarError::invalid(func, format!("invalid arguments: n = {count}")))
}

fn sample_doubles<D: Distribution<f64>>(
    state: &mut RandomState,
    count: usize,
    dist: &D,
) -> Result<RArray, DatarError> {
    let values: Float64Array = (0..count).map(|_| dist.sample(&mut state.rng)).collect();
    RArray::create(Arc::new(values))
}

fn sample_ints(values: impl Iterator<Item = i64>) -> Result<RArray, DatarError> {
    RArray::create(Arc::new(values.collect::<Int64Array>()))
}

pub fn rnorm_with(
    state: &mut RandomState,
    n: impl Into<ArrayLike>,
    mean: f64,
    sd: f64,
) -> Result<RArray, DatarError> {
    let count = draws(n, "rnorm")?;
    let dist = Normal::new(mean, sd).map_err(|err| DatarError::invalid("rnorm", err.to_string()))?;
    sample_doubles(state, count, &dist)
}

pub fn rnorm(n: impl Into<ArrayLike>, mean: f64, sd: f64) -> Result<RArray, DatarError> {
    with_state(|state| rnorm_with(state, n, mean, sd))
}

pub fn runif_with(
    state: &mut RandomState,
    n: impl Into<ArrayLike>,
    min: f64,
    max: f64,
) -> Result<RArray, DatarError> {
    let count = draws(n, "runif")?;
    if !(min.is_finite() && max.is_finite()) || max < min {
        return Err(DatarError::invalid("runif", format!("invalid range [{min}, {max}]")));
    }
    let values: Float64Array = (0..count)
        .map(|_| min + (max - min) * state.rng.random::<f64>())
        .collect();
    RArray::create(Arc::new(values))
}

pub fn runif(n: impl Into<ArrayLike>, min: f64, max: f64) -> Result<RArray, DatarError> {
    with_state(|state| runif_with(state, n, min, max))
}

pub fn rpois_with(
    state: &mut RandomState,
    n: impl Into<ArrayLike>,
    lambda: f64,
) -> Result<RArray, DatarError> {
    let count = draws(n, "rpois")?;
    if lambda == 0.0 {
        return sample_ints(std::iter::repeat_n(0, count));
    }
    let dist = Poisson::new(lambda).map_err(|err| DatarError::invalid("rpois", err.to_string()))?;
    sample_ints((0..count).map(|_| dist.sample(&mut state.rng) as i64))
}

pub fn rpois(n: impl Into<ArrayLike>, lambda: f64) -> Result<RArray, DatarError> {
    with_state(|state| rpois_with(state, n, lambda))
}

pub fn rbinom_with(
    state: &mut RandomState,
    n: impl Into<ArrayLike>,
    size: u64,
    prob: f64,
) -> Result<RArray, DatarError> {
    let count = draws(n, "rbinom")?;
    let dist =
        Binomial::new(size, prob).map_err(|err| DatarError::invalid("rbinom", err.to_string()))?;
    sample_ints((0..count).map(|_| dist.sample(&mut state.rng) as i64))
}

pub fn rbinom(n: impl Into<ArrayLike>, size: u64, prob: f64) -> Result<RArray, DatarError> {
    with_state(|state| rbinom_with(state, n, size, prob))
}

pub fn rcauchy_with(
    state: &mut RandomState,
    n: impl Into<ArrayLike>,
    location: f64,
    scale: f64,
) -> Result<RArray, DatarError> {
    let count = draws(n, "rcauchy")?;
    let dist = Cauchy::new(location, scale)
        .map_err(|err| DatarError::invalid("rcauchy", err.to_string()))?;
    sample_doubles(state, count, &dist)
}

pub fn rcauchy(n: impl Into<ArrayLike>, location: f64, scale: f64) -> Result<RArray, DatarError> {
    with_state(|state| rcauchy_with(state, n, location, scale))
}

pub fn rchisq_with(
    state: &mut RandomState,
    n: impl Into<ArrayLike>,
    df: f64,
) -> Result<RArray, DatarError> {
    let count = draws(n, "rchisq")?;
    let dist = ChiSquared::new(df).map_err(|err| DatarError::invalid("rchisq", err.to_string()))?;
    sample_doubles(state, count, &dist)
}

pub fn rchisq(n: impl Into<ArrayLike>, df: f64) -> Result<RArray, DatarError> {
    with_state(|state| rchisq_with(state, n, df))
}

pub fn rexp_with(
    state: &mut RandomState,
    n: impl Into<ArrayLike>,
    rate: f64,
) -> Result<RArray, DatarError> {
    let count = draws(n, "rexp")?;
    let dist = Exp::new(rate).map_err(|err| DatarError::invalid("rexp", err.to_string()))?;
    sample_doubles(state, count, &dist)
}

pub fn rexp(n: impl Into<ArrayLike>, rate: f64) -> Result<RArray, DatarError> {
    with_state(|state| rexp_with(state, n, rate))
}

/// Draw `size` elements of `x` (all of them by default).
pub fn sample_with(
    state: &mut RandomState,
    x: impl Into<ArrayLike>,
    size: Option<usize>,
    replace: bool,
    prob: Option<&[f64]>,
) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let n = x.len();
    let size = size.unwrap_or(n);
    if let Some(prob) = prob {
        if prob.len() != n {
            return Err(DatarError::invalid("sample", "incorrect number of probabilities"));
        }
    }
    if !replace && size > n {
        return Err(DatarError::invalid(
            "sample",
            "cannot take a sample larger than the population when 'replace = FALSE'",
        ));
    }
    if n == 0 && size > 0 {
        return Err(DatarError::invalid("sample", "cannot sample from an empty population"));
    }
    let rng = &mut state.rng;
    let positions: Vec<usize> = match (prob, replace) {
        (None, false) => rand::seq::index::sample(rng, n, size).into_vec(),
        (None, true) => (0..size).map(|_| rng.random_range(0..n)).collect(),
        (Some(prob), true) => {
            let dist = WeightedIndex::new(prob)
                .map_err(|err| DatarError::invalid("sample", err.to_string()))?;
            (0..size).map(|_| dist.sample(rng)).collect()
        }
        (Some(prob), false) => rand::seq::index::sample_weighted(rng, n, |i| prob[i], size)
            .map_err(|err| DatarError::invalid("sample", err.to_string()))?
            .into_vec(),
    };
    x.take(&positions)
}

pub fn sample(
    x: impl Into<ArrayLike>,
    size: Option<usize>,
    replace: bool,
    prob: Option<&[f64]>,
) -> Result<RArray, DatarError> {
    with_state(|state| sample_with(state, x, size, replace, prob))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use da_columnar::DatarError;
    use da_types::Value;

    use super::{
        RandomState, rbinom_with, rexp_with, rnorm, rnorm_with, rpois_with, runif_with, sample_with,
        set_seed,
    };

    #[test]
    fn seeded_states_reproduce() {
        let a = rnorm_with(&mut RandomState::seeded(42), 5i64, 0.0, 1.0).expect("rnorm");
        let b = rnorm_with(&mut RandomState::seeded(42), 5i64, 0.0, 1.0).expect("rnorm");
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);

        set_seed(7);
        let first = rnorm(3i64, 0.0, 1.0).expect("rnorm");
        set_seed(7);
        assert_eq!(first, rnorm(3i64, 0.0, 1.0).expect("rnorm"));
    }

    #[test]
    fn vector_n_counts_its_length() {
        let out = runif_with(&mut RandomState::seeded(1), vec![9i64, 9, 9], 2.0, 3.0)
            .expect("runif");
        assert_eq!(out.len(), 3);
        for value in out.values().expect("values") {
            let Value::Float(v) = value else { panic!("expected double") };
            assert!((2.0..3.0).contains(&v));
        }
    }

    #[test]
    fn invalid_parameters_are_reported() {
        let mut state = RandomState::seeded(3);
        assert!(matches!(
            rnorm_with(&mut state, 1i64, 0.0, -1.0),
            Err(DatarError::InvalidArgument { .. })
        ));
        assert!(rexp_with(&mut state, 1i64, -2.0).is_err());
        assert!(rnorm_with(&mut state, -1i64, 0.0, 1.0).is_err());
    }

    #[test]
    fn discrete_draws_are_integers() {
        let mut state = RandomState::seeded(11);
        let counts = rpois_with(&mut state, 10i64, 3.0).expect("rpois");
        let counts = counts.values().expect("values");
        assert!(counts.iter().all(|v| matches!(v, Value::Int(k) if *k >= 0)));
        let successes = rbinom_with(&mut state, 10i64, 4, 0.5).expect("rbinom");
        let successes = successes.values().expect("values");
        assert!(
            successes
                .iter()
                .all(|v| matches!(v, Value::Int(k) if (0..=4).contains(k)))
        );
    }

    #[test]
    fn sample_without_replacement_is_a_permutation() {
        let mut state = RandomState::seeded(5);
        let out = sample_with(&mut state, vec![1i64, 2, 3, 4], None, false, None).expect("sample");
        let seen: HashSet<String> = out
            .values()
            .expect("values")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(seen.len(), 4);
        assert!(sample_with(&mut state, vec![1i64], Some(2), false, None).is_err());
        let weighted = sample_with(&mut state, vec!["a", "b"], Some(4), true, Some(&[0.0, 1.0][..]))
            .expect("weighted");
        assert!(weighted.values().expect("values").iter().all(|v| *v == Value::from("b")));
    }
}
