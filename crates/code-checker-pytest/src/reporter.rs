//! Bounded text rendering of pytest results.
//!
//! The output is meant to be read by an LLM, so it is capped in length and
//! disclosure is controlled by `show_details`:
//!
//! - the summary and collection errors are always shown,
//! - failure tracebacks and captured output only with `show_details`,
//! - small failing runs without details get a hint to ask for them.

use crate::result::{RawTestResult, ReportStatus, TestOutcome, TIMEOUT_EXIT_CODE};

/// Suggestion emitted when a small run fails without details.
pub const SHOW_DETAILS_HINT: &str =
    "Hint: re-run with show_details=True to see tracebacks and captured output for the failing tests.";

/// Lines of raw stderr/stdout kept when no report could be parsed.
const RAW_OUTPUT_TAIL: usize = 30;

/// Limits applied when rendering a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingPolicy {
    /// Failing tests rendered in detail.
    pub max_failures_shown: usize,
    /// Hard cap on output lines.
    pub max_lines: usize,
    /// Runs with at most this many collected tests get the details hint.
    pub hint_threshold: usize,
}

impl Default for ReportingPolicy {
    fn default() -> Self {
        Self {
            max_failures_shown: 10,
            max_lines: 300,
            hint_threshold: 3,
        }
    }
}

/// Render a run as a bounded text report.
///
/// Pure: the same result and flag always produce the same text.
pub fn format_report(result: &RawTestResult, show_details: bool, policy: &ReportingPolicy) -> String {
    let mut out = BoundedLines::new(policy.max_lines);
    let counts = result.counts();

    out.push_section(summary_lines(result), 0);

    if !result.collection_errors.is_empty() {
        let mut section = vec![
            String::new(),
            format!("Collection errors ({}):", result.collection_errors.len()),
        ];
        for error in &result.collection_errors {
            section.extend(error.lines().map(str::to_string));
        }
        out.push_section(section, 0);
    }

    if matches!(result.report, ReportStatus::Missing | ReportStatus::Malformed { .. }) {
        out.push_section(raw_output_lines(result), 0);
    }

    if !show_details {
        if counts.failing() > 0 && result.collected_count <= policy.hint_threshold {
            out.push_section(vec![String::new(), SHOW_DETAILS_HINT.to_string()], 0);
        }
        return out.finish();
    }

    let failing: Vec<&TestOutcome> = result.failing().collect();
    if failing.is_empty() {
        return out.finish();
    }

    let shown = failing.len().min(policy.max_failures_shown);
    let remainder = failing.len() - shown;

    let mut details = vec![
        String::new(),
        if remainder > 0 {
            format!("Failing tests (showing {} of {}):", shown, failing.len())
        } else {
            format!("Failing tests ({}):", failing.len())
        },
    ];
    for outcome in &failing[..shown] {
        details.push(String::new());
        details.extend(failure_block(outcome));
    }

    let reserve = usize::from(remainder > 0);
    out.push_section(details, reserve);

    if remainder > 0 {
        let noun = if remainder == 1 { "test" } else { "tests" };
        out.push_line(format!("{} more failing {} not shown", remainder, noun));
    }

    out.finish()
}

fn summary_lines(result: &RawTestResult) -> Vec<String> {
    let counts = result.counts();
    let mut lines = vec![format!(
        "Pytest results: {} (exit code {}: {})",
        verdict(result),
        result.exit_code,
        exit_code_meaning(result.exit_code)
    )];

    if matches!(result.report, ReportStatus::Missing | ReportStatus::Malformed { .. }) {
        lines.push("Collected tests: unknown (results unavailable)".to_string());
    } else if result.collected_count == 0
        && result.collection_errors.is_empty()
        && result.outcomes.is_empty()
    {
        lines.push("Collected 0 tests: no tests collected".to_string());
    } else if nothing_selected(result) {
        lines.push(format!(
            "Collected {} tests: none selected to run",
            result.collected_count
        ));
    } else {
        lines.push(format!(
            "Collected {} tests: {} passed, {} failed, {} errors, {} skipped",
            result.collected_count, counts.passed, counts.failed, counts.errors, counts.skipped
        ));
    }
    lines.push(format!("Duration: {:.2}s", result.duration.as_secs_f64()));
    lines
}

fn verdict(result: &RawTestResult) -> &'static str {
    match result.report {
        ReportStatus::TimedOut => "TIMED OUT",
        ReportStatus::Missing | ReportStatus::Malformed { .. } => "ERROR",
        ReportStatus::Parsed => {
            if (result.collected_count == 0
                && result.collection_errors.is_empty()
                && result.outcomes.is_empty())
                || nothing_selected(result)
            {
                "NO TESTS COLLECTED"
            } else if result.passed() {
                "PASSED"
            } else {
                "FAILED"
            }
        }
    }
}

/// pytest exits with 5 when markers or `-k` deselect every collected test.
fn nothing_selected(result: &RawTestResult) -> bool {
    result.exit_code == 5 && result.outcomes.is_empty() && result.collection_errors.is_empty()
}

/// Meaning of pytest's documented exit codes.
fn exit_code_meaning(code: i32) -> &'static str {
    match code {
        0 => "all tests passed",
        1 => "some tests failed",
        2 => "interrupted",
        3 => "internal error",
        4 => "usage error",
        5 => "no tests collected",
        TIMEOUT_EXIT_CODE => "timed out",
        _ => "terminated abnormally",
    }
}

fn raw_output_lines(result: &RawTestResult) -> Vec<String> {
    let mut lines = vec![String::new()];
    match &result.report {
        ReportStatus::Malformed { reason } => {
            lines.push(format!("Detailed results unavailable: could not parse the pytest report ({})", reason));
        }
        _ => lines.push("Detailed results unavailable: pytest did not write a JSON report.".to_string()),
    }
    if let Some(err) = result.execution_error() {
        lines.push(err.to_string());
    }
    if result.stderr.contains("--json-report") {
        lines.push(
            "Hint: pytest rejected --json-report; install the pytest-json-report plugin in the target environment."
                .to_string(),
        );
    }
    for (label, text) in [("stderr", &result.stderr), ("stdout", &result.stdout)] {
        let tail = tail_lines(text, RAW_OUTPUT_TAIL);
        if tail.is_empty() {
            continue;
        }
        lines.push(format!("Last {} lines of {}:", tail.len(), label));
        lines.extend(tail.into_iter().map(|l| format!("  {}", l)));
    }
    lines
}

fn failure_block(outcome: &TestOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "--- {} {} ({:.3}s) ---",
        outcome.outcome.as_str(),
        outcome.node_id,
        outcome.duration.as_secs_f64()
    )];
    match outcome.longrepr.as_deref() {
        Some(text) if !text.trim().is_empty() => lines.extend(text.lines().map(str::to_string)),
        _ => lines.push("(no failure text captured)".to_string()),
    }
    for (label, captured) in [("stdout", &outcome.stdout), ("stderr", &outcome.stderr)] {
        if let Some(text) = captured.as_deref().filter(|t| !t.trim().is_empty()) {
            lines.push(format!("Captured {}:", label));
            lines.extend(text.lines().map(str::to_string));
        }
    }
    lines
}

fn tail_lines(text: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].to_vec()
}

/// Line buffer that refuses to grow past a fixed limit.
struct BoundedLines {
    lines: Vec<String>,
    max: usize,
    truncated: bool,
}

impl BoundedLines {
    fn new(max: usize) -> Self {
        Self {
            lines: Vec::new(),
            max: max.max(1),
            truncated: false,
        }
    }

    fn marker(&self) -> String {
        format!("... [output truncated: {}-line limit reached]", self.max)
    }

    /// Append a section, leaving `reserve` lines free for what follows.
    /// A section that does not fit is cut and followed by the marker.
    fn push_section(&mut self, section: Vec<String>, reserve: usize) {
        if self.truncated {
            return;
        }
        let room = self.max.saturating_sub(self.lines.len() + reserve);
        if section.len() <= room {
            self.lines.extend(section);
            return;
        }
        self.lines.extend(section.into_iter().take(room.saturating_sub(1)));
        self.lines.push(self.marker());
        self.truncated = true;
    }

    fn push_line(&mut self, line: String) {
        self.lines.push(line);
    }

    fn finish(mut self) -> String {
        if self.lines.len() > self.max {
            self.lines.truncate(self.max - 1);
            let marker = self.marker();
            self.lines.push(marker);
        }
        self.lines.join("\n")
    }
}
