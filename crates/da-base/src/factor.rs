//! Factors: dictionary-encoded arrays with explicit levels.

use std::collections::{HashMap, HashSet};

use arrow::array::AsArray;
use da_columnar::{ArrayLike, DatarError, RArray, array_from_values, make_array, values_from_array};
use da_types::{DType, Value, ValueKey};

/// Options of [`factor`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactorOptions {
    /// Allowed levels in order. Defaults to the distinct non-missing values in
    /// order of appearance.
    pub levels: Option<Vec<Value>>,
    /// Values removed from the levels.
    pub exclude: Option<Vec<Value>>,
    pub ordered: bool,
}

/// Encode `x` as a factor. Values outside the levels become missing.
pub fn factor(x: impl Into<ArrayLike>, opts: &FactorOptions) -> Result<RArray, DatarError> {
    if opts.ordered {
        return Err(DatarError::unsupported("factor", "ordered factors"));
    }
    let x = make_array(x, None)?.decoded();
    if opts.levels.is_none() && opts.exclude.is_none() {
        return x.dictionary_encode();
    }

    let values = x.values()?;
    let mut levels = match &opts.levels {
        Some(levels) => levels.clone(),
        None => {
            let mut seen = HashSet::new();
            values
                .iter()
                .filter(|v| !v.is_missing() && seen.insert(v.key()))
                .cloned()
                .collect()
        }
    };
    if let Some(exclude) = &opts.exclude {
        let excluded: HashSet<ValueKey> = exclude.iter().map(Value::key).collect();
        levels.retain(|level| !excluded.contains(&level.key()));
    }

    let mut positions: HashMap<ValueKey, i32> = HashMap::with_capacity(levels.len());
    for (pos, level) in levels.iter().enumerate() {
        let code = i32::try_from(pos)
            .map_err(|_| DatarError::unsupported("factor", "too many levels"))?;
        positions.entry(level.key()).or_insert(code);
    }
    let codes = values.iter().map(|v| positions.get(&v.key()).copied()).collect();

    let level_type = if levels.is_empty() && x.dtype() != Some(DType::Null) {
        Some(x.data_type())
    } else {
        None
    };
    let levels = array_from_values(&levels, level_type)?;
    RArray::from_codes(codes, levels)
}

/// Ordered factors are not available on this backend.
pub fn ordered(_x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    Err(DatarError::unsupported("ordered", "ordered factors"))
}

/// The levels, or `None` when `x` is not a factor.
pub fn levels(x: impl Into<ArrayLike>) -> Result<Option<RArray>, DatarError> {
    let x = make_array(x, None)?;
    x.dictionary().map(|dict| RArray::create(dict.clone())).transpose()
}

/// Number of levels; 0 when `x` is not a factor.
pub fn nlevels(x: impl Into<ArrayLike>) -> Result<usize, DatarError> {
    Ok(make_array(x, None)?.dictionary().map_or(0, |dict| dict.len()))
}

/// Remove levels no element uses, keeping the order of the rest.
pub fn droplevels(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = make_array(x, None)?;
    let Some(dictionary) = x.dictionary() else {
        return Err(DatarError::unsupported("droplevels", "`x` is not a factor"));
    };
    let used: HashSet<ValueKey> = x.values()?.iter().map(Value::key).collect();
    let kept: Vec<Value> = values_from_array(dictionary.as_ref())?
        .into_iter()
        .filter(|level| used.contains(&level.key()))
        .collect();
    factor(
        x.decoded(),
        &FactorOptions {
            levels: Some(kept),
            ..FactorOptions::default()
        },
    )
}

#[must_use]
pub fn is_factor(x: &ArrayLike) -> bool {
    match x {
        ArrayLike::Wrapped(arr) => arr.is_factor(),
        ArrayLike::Arrow(arr) => arr.as_any_dictionary_opt().is_some(),
        _ => false,
    }
}

/// Always `false`; ordered factors are not available.
#[must_use]
pub fn is_ordered(_x: &ArrayLike) -> bool {
    false
}

/// Factors pass through; anything else is encoded with default options.
pub fn as_factor(x: impl Into<ArrayLike>) -> Result<RArray, DatarError> {
    let x = x.into();
    if is_factor(&x) {
        return make_array(x, None);
    }
    factor(x, &FactorOptions::default())
}
