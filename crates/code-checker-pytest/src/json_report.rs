//! Parsing of the report written by the `pytest-json-report` plugin.
//!
//! Only the fields the reporter needs are modelled; everything else in the
//! report (environment, keywords, warnings, tracebacks) is ignored.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{CheckerError, CheckerResult};
use crate::result::{Outcome, TestOutcome};

#[derive(Debug, Deserialize)]
struct JsonReport {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    summary: Summary,
    #[serde(default)]
    collectors: Vec<Collector>,
    #[serde(default)]
    tests: Vec<TestItem>,
}

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    collected: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Collector {
    #[serde(default)]
    nodeid: String,
    outcome: String,
    #[serde(default)]
    longrepr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TestItem {
    nodeid: String,
    outcome: String,
    #[serde(default)]
    setup: Option<Stage>,
    #[serde(default)]
    call: Option<Stage>,
    #[serde(default)]
    teardown: Option<Stage>,
}

#[derive(Debug, Deserialize)]
struct Stage {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    outcome: Option<String>,
    #[serde(default)]
    longrepr: Option<String>,
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
}

/// The parts of a pytest JSON report the runner keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub collected_count: usize,
    pub duration: Option<Duration>,
    pub outcomes: Vec<TestOutcome>,
    pub collection_errors: Vec<String>,
}

/// Parse the contents of a pytest-json-report file.
pub fn parse_json_report(text: &str) -> CheckerResult<ParsedReport> {
    if text.trim().is_empty() {
        return Err(CheckerError::ReportParse("report file is empty".into()));
    }
    let report: JsonReport = serde_json::from_str(text)?;

    let collection_errors = report
        .collectors
        .iter()
        .filter(|c| c.outcome == "failed")
        .map(collection_error_message)
        .collect();

    let outcomes: Vec<TestOutcome> = report.tests.iter().map(test_outcome).collect();
    let collected_count = report.summary.collected.unwrap_or(outcomes.len());

    Ok(ParsedReport {
        collected_count,
        duration: report.duration.map(secs),
        outcomes,
        collection_errors,
    })
}

fn collection_error_message(collector: &Collector) -> String {
    let target = if collector.nodeid.is_empty() {
        "<session>"
    } else {
        collector.nodeid.as_str()
    };
    match collector.longrepr.as_deref().map(str::trim_end) {
        Some(longrepr) if !longrepr.is_empty() => format!("ERROR collecting {target}\n{longrepr}"),
        _ => format!("ERROR collecting {target}"),
    }
}

fn test_outcome(item: &TestItem) -> TestOutcome {
    let stages: Vec<&Stage> = [&item.setup, &item.call, &item.teardown]
        .into_iter()
        .flatten()
        .collect();

    let duration = stages
        .iter()
        .filter_map(|s| s.duration)
        .map(secs)
        .sum();

    // Prefer the phase that actually failed, fall back to any text we have.
    let longrepr = stages
        .iter()
        .find(|s| s.outcome.as_deref() == Some("failed") && s.longrepr.is_some())
        .or_else(|| stages.iter().find(|s| s.longrepr.is_some()))
        .and_then(|s| s.longrepr.clone());

    TestOutcome {
        node_id: item.nodeid.clone(),
        outcome: Outcome::from_report(&item.outcome),
        duration,
        longrepr,
        stdout: join_captured(stages.iter().map(|s| s.stdout.as_deref())),
        stderr: join_captured(stages.iter().map(|s| s.stderr.as_deref())),
    }
}

fn join_captured<'a>(parts: impl Iterator<Item = Option<&'a str>>) -> Option<String> {
    let joined: String = parts.flatten().filter(|p| !p.is_empty()).collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "created": 1700000000.0,
        "duration": 0.75,
        "exitcode": 1,
        "root": "/project",
        "summary": {"passed": 1, "failed": 1, "skipped": 1, "total": 3, "collected": 3},
        "collectors": [
            {"nodeid": "", "outcome": "passed", "result": []},
            {"nodeid": "tests/test_api.py", "outcome": "passed", "result": []}
        ],
        "tests": [
            {
                "nodeid": "tests/test_api.py::test_ok",
                "lineno": 3,
                "outcome": "passed",
                "setup": {"duration": 0.001, "outcome": "passed"},
                "call": {"duration": 0.002, "outcome": "passed"},
                "teardown": {"duration": 0.001, "outcome": "passed"}
            },
            {
                "nodeid": "tests/test_api.py::test_broken",
                "lineno": 7,
                "outcome": "failed",
                "setup": {"duration": 0.001, "outcome": "passed", "stdout": "setting up\n"},
                "call": {
                    "duration": 0.01,
                    "outcome": "failed",
                    "longrepr": "def test_broken():\n>       assert 1 == 2\nE       assert 1 == 2",
                    "stdout": "value is 1\n",
                    "stderr": "warning!\n"
                },
                "teardown": {"duration": 0.001, "outcome": "passed"}
            },
            {
                "nodeid": "tests/test_api.py::test_skipped",
                "lineno": 12,
                "outcome": "skipped",
                "setup": {"duration": 0.0, "outcome": "skipped", "longrepr": "('tests/test_api.py', 12, 'Skipped: later')"},
                "teardown": {"duration": 0.0, "outcome": "passed"}
            }
        ]
    }"#;

    #[test]
    fn test_parse_tests_in_order() {
        let parsed = parse_json_report(REPORT).unwrap();
        assert_eq!(parsed.collected_count, 3);
        assert_eq!(parsed.duration, Some(Duration::from_millis(750)));
        let ids: Vec<_> = parsed.outcomes.iter().map(|o| o.node_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "tests/test_api.py::test_ok",
                "tests/test_api.py::test_broken",
                "tests/test_api.py::test_skipped"
            ]
        );
        assert!(parsed.collection_errors.is_empty());
    }

    #[test]
    fn test_parse_failure_details() {
        let parsed = parse_json_report(REPORT).unwrap();
        let broken = &parsed.outcomes[1];
        assert_eq!(broken.outcome, Outcome::Failed);
        assert!(broken.longrepr.as_deref().unwrap().contains("assert 1 == 2"));
        assert_eq!(broken.stdout.as_deref(), Some("setting up\nvalue is 1\n"));
        assert_eq!(broken.stderr.as_deref(), Some("warning!\n"));
        assert!(broken.duration >= Duration::from_millis(11));
    }

    #[test]
    fn test_parse_collection_error() {
        let text = r#"{
            "exitcode": 2,
            "duration": 0.1,
            "summary": {"total": 0, "collected": 0},
            "collectors": [
                {
                    "nodeid": "tests/test_syntax.py",
                    "outcome": "failed",
                    "longrepr": "E     def broken(:\nE               ^\nE   SyntaxError: invalid syntax\n",
                    "result": []
                }
            ],
            "tests": []
        }"#;
        let parsed = parse_json_report(text).unwrap();
        assert_eq!(parsed.collected_count, 0);
        assert_eq!(parsed.collection_errors.len(), 1);
        assert!(parsed.collection_errors[0].starts_with("ERROR collecting tests/test_syntax.py\n"));
        assert!(parsed.collection_errors[0].contains("SyntaxError: invalid syntax"));
    }

    #[test]
    fn test_collected_falls_back_to_test_count() {
        let text = r#"{"tests": [{"nodeid": "t::a", "outcome": "passed"}]}"#;
        let parsed = parse_json_report(text).unwrap();
        assert_eq!(parsed.collected_count, 1);
        assert_eq!(parsed.duration, None);
        assert_eq!(parsed.outcomes[0].duration, Duration::ZERO);
    }

    #[test]
    fn test_truncated_report_is_an_error() {
        let err = parse_json_report(r#"{"tests": [{"nodeid": "#).unwrap_err();
        assert!(matches!(err, CheckerError::Json(_)));
        let err = parse_json_report("   ").unwrap_err();
        assert!(matches!(err, CheckerError::ReportParse(_)));
    }
}
