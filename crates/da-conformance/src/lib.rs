#![forbid(unsafe_code)]

//! Fixture-driven conformance checks for the arrow backend.
//!
//! A fixture names one operation, its inputs as host values and the result R
//! produces for them. [`run_suite`] evaluates every case and reports which
//! ones drift.

use std::fs;
use std::path::Path;

use da_base::{arithm, asis, cum, factor, seq, sets, string};
use da_columnar::{BinaryOp, DatarError, RArray, RObject, UnaryOp, binop, unop};
use da_types::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("fixture io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fixture parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("fixture {case_id} is missing input `{field}`")]
    MissingInput { case_id: String, field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureOperation {
    Binop,
    Unop,
    Sum,
    Mean,
    Median,
    Cumsum,
    Round,
    Rep,
    Order,
    Unique,
    Factor,
    Droplevels,
    AsInteger,
    Paste,
    Nchar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub case_id: String,
    pub operation: FixtureOperation,
    #[serde(default)]
    pub x: Option<Vec<Value>>,
    #[serde(default)]
    pub y: Option<Vec<Value>>,
    #[serde(default)]
    pub binary_op: Option<BinaryOp>,
    #[serde(default)]
    pub unary_op: Option<UnaryOp>,
    /// Explicit factor levels.
    #[serde(default)]
    pub levels: Option<Vec<Value>>,
    #[serde(default)]
    pub na_rm: bool,
    #[serde(default)]
    pub times: Option<i64>,
    #[serde(default)]
    pub digits: Option<i32>,
    #[serde(default)]
    pub sep: Option<String>,
    #[serde(default)]
    pub expected: Option<Vec<Value>>,
    #[serde(default)]
    pub expected_scalar: Option<Value>,
    /// Substring of the expected error message.
    #[serde(default)]
    pub expected_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: String,
    pub operation: FixtureOperation,
    pub status: CaseStatus,
    pub mismatch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub fixture_count: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn is_green(&self) -> bool {
        self.failed == 0
    }
}

pub fn parse_fixtures(json: &str) -> Result<Vec<Fixture>, HarnessError> {
    Ok(serde_json::from_str(json)?)
}

/// Every `*.json` fixture file in `dir`, in file-name order.
pub fn load_fixtures(dir: &Path) -> Result<Vec<Fixture>, HarnessError> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    let mut fixtures = Vec::new();
    for path in paths {
        fixtures.extend(parse_fixtures(&fs::read_to_string(&path)?)?);
    }
    Ok(fixtures)
}

/// NA-aware equality: missing matches missing, `1 == 1.0`, NaN matches NaN.
#[must_use]
pub fn values_match(actual: &[Value], expected: &[Value]) -> bool {
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| (a.is_null() && e.is_null()) || a.semantic_eq(e))
}

fn input<'a>(
    fixture: &'a Fixture,
    value: Option<&'a Vec<Value>>,
    field: &'static str,
) -> Result<&'a [Value], HarnessError> {
    value.map(Vec::as_slice).ok_or_else(|| HarnessError::MissingInput {
        case_id: fixture.case_id.clone(),
        field,
    })
}

fn array(values: &[Value]) -> Result<RArray, DatarError> {
    RArray::from_values(values)
}

/// Evaluate a fixture's operation.
pub fn evaluate(fixture: &Fixture) -> Result<Result<RObject, DatarError>, HarnessError> {
    let x = input(fixture, fixture.x.as_ref(), "x")?;
    let outcome = match fixture.operation {
        FixtureOperation::Binop => {
            let y = input(fixture, fixture.y.as_ref(), "y")?;
            let op = fixture.binary_op.ok_or_else(|| HarnessError::MissingInput {
                case_id: fixture.case_id.clone(),
                field: "binary_op",
            })?;
            array(x).and_then(|x| binop(op, x, array(y)?)).map(RObject::Array)
        }
        FixtureOperation::Unop => {
            let op = fixture.unary_op.ok_or_else(|| HarnessError::MissingInput {
                case_id: fixture.case_id.clone(),
                field: "unary_op",
            })?;
            array(x).and_then(|x| unop(op, &x)).map(RObject::Array)
        }
        FixtureOperation::Sum => arithm::sum(x, fixture.na_rm).map(RObject::Value),
        FixtureOperation::Mean => arithm::mean(x, fixture.na_rm).map(RObject::Value),
        FixtureOperation::Median => arithm::median(x, fixture.na_rm).map(RObject::Value),
        FixtureOperation::Cumsum => array(x).and_then(cum::cumsum),
        FixtureOperation::Round => {
            array(x).and_then(|x| arithm::round(x, fixture.digits.unwrap_or(0)))
        }
        FixtureOperation::Rep => {
            let times = fixture.times.unwrap_or(1);
            array(x)
                .and_then(|x| seq::rep(x, times, None, 1))
                .map(RObject::Array)
        }
        FixtureOperation::Order => seq::order(x, false, true).map(RObject::Array),
        FixtureOperation::Unique => sets::unique(x).map(RObject::Array),
        FixtureOperation::Factor => factor_of(fixture, x).map(RObject::Array),
        FixtureOperation::Droplevels => factor_of(fixture, x)
            .and_then(factor::droplevels)
            .and_then(|fct| {
                let levels = factor::levels(fct)?.ok_or_else(|| {
                    DatarError::invalid("droplevels", "result is not a factor")
                })?;
                Ok(RObject::Array(levels))
            }),
        FixtureOperation::AsInteger => match fixture.levels {
            Some(_) => factor_of(fixture, x).and_then(asis::as_integer),
            None => array(x).and_then(asis::as_integer),
        },
        FixtureOperation::Paste => {
            let y = input(fixture, fixture.y.as_ref(), "y")?;
            let sep = fixture.sep.as_deref().unwrap_or(" ");
            array(x).and_then(|x| string::paste(vec![x.into(), array(y)?.into()], sep, None))
        }
        FixtureOperation::Nchar => {
            array(x).and_then(|x| string::nchar(x, string::NcharOptions::default()))
        }
    };
    Ok(outcome)
}

/// A factor of `x`, with the fixture's levels when it has them.
fn factor_of(fixture: &Fixture, x: &[Value]) -> Result<RArray, DatarError> {
    let opts = factor::FactorOptions {
        levels: fixture.levels.clone(),
        ..factor::FactorOptions::default()
    };
    factor::factor(x, &opts)
}

fn compare(fixture: &Fixture, outcome: Result<RObject, DatarError>) -> Option<String> {
    match (outcome, &fixture.expected_error) {
        (Err(err), Some(needle)) if err.to_string().contains(needle.as_str()) => None,
        (Err(err), _) => Some(format!("unexpected error: {err}")),
        (Ok(_), Some(needle)) => Some(format!("expected an error containing {needle:?}")),
        (Ok(actual), None) => {
            if let Some(expected) = &fixture.expected_scalar {
                return match actual {
                    RObject::Value(value)
                        if values_match(&[value.clone()], &[expected.clone()]) =>
                    {
                        None
                    }
                    other => Some(format!("expected scalar {expected}, got {other:?}")),
                };
            }
            let expected = fixture.expected.as_deref().unwrap_or_default();
            match actual.values() {
                Ok(values) if values_match(&values, expected) => None,
                Ok(values) => Some(format!("expected {expected:?}, got {values:?}")),
                Err(err) => Some(format!("could not read result: {err}")),
            }
        }
    }
}

pub fn run_fixture(fixture: &Fixture) -> Result<CaseResult, HarnessError> {
    let mismatch = compare(fixture, evaluate(fixture)?);
    if let Some(reason) = &mismatch {
        log::warn!("[da-conformance] case {} drifted: {reason}", fixture.case_id);
    }
    Ok(CaseResult {
        case_id: fixture.case_id.clone(),
        operation: fixture.operation,
        status: if mismatch.is_none() { CaseStatus::Pass } else { CaseStatus::Fail },
        mismatch,
    })
}

pub fn run_suite(fixtures: &[Fixture]) -> Result<SuiteReport, HarnessError> {
    let results = fixtures.iter().map(run_fixture).collect::<Result<Vec<_>, _>>()?;
    let passed = results.iter().filter(|r| r.status == CaseStatus::Pass).count();
    Ok(SuiteReport {
        fixture_count: results.len(),
        passed,
        failed: results.len() - passed,
        results,
    })
}

#[cfg(test)]
mod tests {
    use da_types::Value;

    use super::{
        CaseStatus, FixtureOperation, HarnessError, parse_fixtures, run_fixture, run_suite,
        values_match,
    };

    #[test]
    fn values_match_is_na_aware() {
        assert!(values_match(&[Value::Null, Value::Int(1)], &[Value::Null, Value::Float(1.0)]));
        assert!(!values_match(&[Value::Int(1)], &[Value::Int(1), Value::Int(2)]));
        assert!(!values_match(&[Value::Null], &[Value::Int(0)]));
    }

    #[test]
    fn parses_and_runs_a_case() {
        let fixtures = parse_fixtures(
            r#"[{"case_id": "sum_basic", "operation": "sum",
                 "x": [{"kind": "int", "value": 1}, {"kind": "int", "value": 2}],
                 "expected_scalar": {"kind": "int", "value": 3}}]"#,
        )
        .expect("parse");
        assert_eq!(fixtures[0].operation, FixtureOperation::Sum);
        let report = run_suite(&fixtures).expect("suite");
        assert!(report.is_green(), "{report:?}");
    }

    #[test]
    fn drift_is_reported_not_raised() {
        let fixtures = parse_fixtures(
            r#"[{"case_id": "wrong", "operation": "sum",
                 "x": [{"kind": "int", "value": 1}],
                 "expected_scalar": {"kind": "int", "value": 5}}]"#,
        )
        .expect("parse");
        let result = run_fixture(&fixtures[0]).expect("run");
        assert_eq!(result.status, CaseStatus::Fail);
        assert!(result.mismatch.is_some());
    }

    #[test]
    fn missing_inputs_are_harness_errors() {
        let fixtures = parse_fixtures(r#"[{"case_id": "bare", "operation": "unique"}]"#)
            .expect("parse");
        assert!(matches!(
            run_fixture(&fixtures[0]),
            Err(HarnessError::MissingInput { field: "x", .. })
        ));
    }
}
