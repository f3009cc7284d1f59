//! Backend options and version reporting.

use std::cell::RefCell;
use std::collections::BTreeMap;

use da_columnar::DatarError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    /// Name under which this backend registers with the host.
    pub backend: String,
    /// Dispatch priority; lower loses against other backends.
    pub priority: i32,
    /// `nchar` result for missing strings when NA is not kept.
    pub na_len: usize,
    /// `quantile` method used when none is given.
    pub quantile_type: i64,
    /// Characters stripped by `trimws` when none are given.
    pub trim_whitespace: String,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            backend: "arrow".to_owned(),
            priority: -1,
            na_len: 2,
            quantile_type: 7,
            trim_whitespace: " \t".to_owned(),
        }
    }
}

impl BackendOptions {
    /// Parse options from JSON. Missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, DatarError> {
        serde_json::from_str(text)
            .map_err(|err| DatarError::invalid("BackendOptions", err.to_string()))
    }
}

thread_local! {
    static CURRENT: RefCell<BackendOptions> = RefCell::new(BackendOptions::default());
}

/// Options in effect on this thread.
#[must_use]
pub fn current() -> BackendOptions {
    CURRENT.with(|opts| opts.borrow().clone())
}

/// Replace the options on this thread, returning the previous ones.
pub fn set(options: BackendOptions) -> BackendOptions {
    CURRENT.with(|opts| opts.replace(options))
}

/// Versions of the backend crates.
#[must_use]
pub fn versions() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("da-base", env!("CARGO_PKG_VERSION")),
        ("backend", "arrow"),
    ])
}
