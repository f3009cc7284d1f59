use std::path::Path;

use da_conformance::{CaseStatus, load_fixtures, run_suite};

#[test]
fn packaged_fixtures_are_green() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let fixtures = load_fixtures(&dir).expect("fixtures load");
    assert!(fixtures.len() >= 20, "expected the packaged suite, got {}", fixtures.len());

    let report = run_suite(&fixtures).expect("suite runs");
    let failures: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.status == CaseStatus::Fail)
        .map(|r| format!("{}: {}", r.case_id, r.mismatch.as_deref().unwrap_or("")))
        .collect();
    assert!(report.is_green(), "drifted cases:\n{}", failures.join("\n"));
    assert_eq!(report.passed, report.fixture_count);
}

#[test]
fn report_serializes_for_artifacts() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let report = run_suite(&load_fixtures(&dir).expect("fixtures load")).expect("suite runs");
    let json = serde_json::to_string(&report).expect("serialize");
    assert!(json.contains("\"status\":\"pass\""));
}
