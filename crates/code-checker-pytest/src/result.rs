//! Structured outcome of a single pytest run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CheckerError;

/// Exit code recorded when the run was killed by the timeout.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Outcome of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Error,
    Skipped,
}

impl Outcome {
    /// Map a pytest-json-report outcome string.
    ///
    /// `xfailed` counts as skipped and `xpassed` as passed. Unknown values
    /// are treated as errors so they never disappear from the report.
    pub fn from_report(value: &str) -> Self {
        match value {
            "passed" | "xpassed" => Self::Passed,
            "failed" => Self::Failed,
            "skipped" | "xfailed" | "deselected" => Self::Skipped,
            _ => Self::Error,
        }
    }

    /// Failed and errored tests both count as failing.
    pub fn is_failing(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Skipped => "SKIPPED",
        }
    }
}

/// Result of one test item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// pytest node id, e.g. `tests/test_api.py::test_get`.
    pub node_id: String,
    pub outcome: Outcome,
    /// Setup + call + teardown.
    pub duration: Duration,
    /// Failure text (traceback plus assertion context).
    pub longrepr: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

/// What happened to the JSON report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    /// Report was read and parsed.
    Parsed,
    /// pytest exited without writing a report.
    Missing,
    /// Report exists but could not be interpreted.
    Malformed { reason: String },
    /// Subprocess was killed before it finished.
    TimedOut,
}

/// Raw result of a pytest run. Created once per run, never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTestResult {
    pub exit_code: i32,
    /// Tests collected, 0 when collection failed.
    pub collected_count: usize,
    /// Per-test records in collection order.
    pub outcomes: Vec<TestOutcome>,
    /// Import/syntax errors hit while collecting. Always reported in full.
    pub collection_errors: Vec<String>,
    /// Total run time as reported by pytest (wall clock as fallback).
    pub duration: Duration,
    /// Location of the JSON report (deleted unless kept).
    pub raw_report_path: PathBuf,
    pub report: ReportStatus,
    /// Raw subprocess stdout.
    pub stdout: String,
    /// Raw subprocess stderr.
    pub stderr: String,
}

/// Outcome counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl OutcomeCounts {
    /// Failed plus errored tests.
    pub fn failing(&self) -> usize {
        self.failed + self.errors
    }
}

impl RawTestResult {
    /// Synthesize the result of a run that was killed by the timeout.
    pub fn timed_out(timeout: Duration, report_path: PathBuf, stdout: String, stderr: String) -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            collected_count: 0,
            outcomes: vec![],
            collection_errors: vec![format!(
                "pytest timed out after {} seconds and was terminated",
                format_seconds(timeout)
            )],
            duration: timeout,
            raw_report_path: report_path,
            report: ReportStatus::TimedOut,
            stdout,
            stderr,
        }
    }

    /// Count outcomes by kind.
    pub fn counts(&self) -> OutcomeCounts {
        self.outcomes
            .iter()
            .fold(OutcomeCounts::default(), |mut acc, o| {
                match o.outcome {
                    Outcome::Passed => acc.passed += 1,
                    Outcome::Failed => acc.failed += 1,
                    Outcome::Error => acc.errors += 1,
                    Outcome::Skipped => acc.skipped += 1,
                }
                acc
            })
    }

    /// Failing outcomes in collection order.
    pub fn failing(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_failing())
    }

    /// Whether the run fully succeeded.
    pub fn passed(&self) -> bool {
        self.exit_code == 0
            && self.report == ReportStatus::Parsed
            && self.collection_errors.is_empty()
            && self.counts().failing() == 0
    }

    /// The execution error for a run that left no usable report, if any.
    pub fn execution_error(&self) -> Option<CheckerError> {
        match self.report {
            ReportStatus::Missing | ReportStatus::Malformed { .. } if self.exit_code != 0 => {
                Some(CheckerError::Execution {
                    exit_code: self.exit_code,
                    stderr: last_line(&self.stderr).to_string(),
                })
            }
            _ => None,
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
}

/// Whole seconds as an integer, anything finer with up to three decimals.
fn format_seconds(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        let text = format!("{:.3}", duration.as_secs_f64());
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(node_id: &str, outcome: Outcome) -> TestOutcome {
        TestOutcome {
            node_id: node_id.into(),
            outcome,
            duration: Duration::from_millis(5),
            longrepr: None,
            stdout: None,
            stderr: None,
        }
    }

    fn result(outcomes: Vec<TestOutcome>) -> RawTestResult {
        RawTestResult {
            exit_code: 0,
            collected_count: outcomes.len(),
            outcomes,
            collection_errors: vec![],
            duration: Duration::from_millis(100),
            raw_report_path: PathBuf::from("/tmp/report.json"),
            report: ReportStatus::Parsed,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(Outcome::from_report("passed"), Outcome::Passed);
        assert_eq!(Outcome::from_report("xpassed"), Outcome::Passed);
        assert_eq!(Outcome::from_report("xfailed"), Outcome::Skipped);
        assert_eq!(Outcome::from_report("error"), Outcome::Error);
        assert_eq!(Outcome::from_report("weird"), Outcome::Error);
    }

    #[test]
    fn test_counts() {
        let r = result(vec![
            outcome("a", Outcome::Passed),
            outcome("b", Outcome::Failed),
            outcome("c", Outcome::Error),
            outcome("d", Outcome::Skipped),
            outcome("e", Outcome::Passed),
        ]);
        let counts = r.counts();
        assert_eq!(counts.passed, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.failing(), 2);
        let failing: Vec<_> = r.failing().map(|o| o.node_id.as_str()).collect();
        assert_eq!(failing, vec!["b", "c"]);
    }

    #[test]
    fn test_timed_out_result() {
        let r = RawTestResult::timed_out(
            Duration::from_secs(300),
            PathBuf::from("/tmp/r.json"),
            String::new(),
            String::new(),
        );
        assert_eq!(r.exit_code, TIMEOUT_EXIT_CODE);
        assert!(r.outcomes.is_empty());
        assert_eq!(r.collection_errors.len(), 1);
        assert!(r.collection_errors[0].contains("300 seconds"));
        assert!(!r.passed());
        assert!(r.execution_error().is_none());
    }

    #[test]
    fn test_timed_out_keeps_fractional_seconds() {
        let message = |timeout| {
            RawTestResult::timed_out(timeout, PathBuf::new(), String::new(), String::new())
                .collection_errors
                .remove(0)
        };
        assert!(message(Duration::from_millis(1500)).contains("after 1.5 seconds"));
        assert!(message(Duration::from_millis(300)).contains("after 0.3 seconds"));
        assert!(message(Duration::from_secs(60)).contains("after 60 seconds"));
    }

    #[test]
    fn test_execution_error_for_missing_report() {
        let mut r = result(vec![]);
        r.exit_code = 4;
        r.report = ReportStatus::Missing;
        r.stderr = "ERROR: usage: ...\nerror: unrecognized arguments: --json-report\n".into();
        match r.execution_error() {
            Some(CheckerError::Execution { exit_code, stderr }) => {
                assert_eq!(exit_code, 4);
                assert!(stderr.contains("unrecognized arguments"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
