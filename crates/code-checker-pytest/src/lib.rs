//! pytest execution and reporting for the MCP code checker.
//!
//! Two pieces make up this crate:
//!
//! - **Runner**: spawns `python -m pytest` once per request with a JSON report
//!   requested from the `pytest-json-report` plugin, under a hard timeout,
//!   and parses the report into a [`RawTestResult`].
//! - **Reporter**: turns a [`RawTestResult`] into a bounded text block for an
//!   LLM, with detail disclosure controlled by `show_details`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use code_checker_pytest::{run_and_report, PytestRunner, ReportingPolicy, TestRunRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runner = PytestRunner::default();
//!     let request = TestRunRequest::new("/path/to/project")
//!         .with_venv("/path/to/project/.venv")
//!         .with_verbosity(2);
//!
//!     let report = run_and_report(&runner, &request, &ReportingPolicy::default()).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

mod error;
mod json_report;
mod reporter;
mod request;
mod result;
mod runner;

pub use error::{CheckerError, CheckerResult};
pub use json_report::{parse_json_report, ParsedReport};
pub use reporter::{format_report, ReportingPolicy, SHOW_DETAILS_HINT};
pub use request::{
    inherited_depth, parse_depth, RunnerOptions, TestRunRequest, DEFAULT_MAX_DEPTH,
    DEFAULT_TEST_FOLDER, DEFAULT_TIMEOUT, SUBPROCESS_DEPTH_ENV,
};
pub use result::{Outcome, OutcomeCounts, RawTestResult, ReportStatus, TestOutcome, TIMEOUT_EXIT_CODE};
pub use runner::{
    build_command, resolve_interpreter, resolve_test_path, venv_interpreter, PytestRunner,
    SIGNAL_EXIT_CODE,
};

/// Run pytest for `request` and render the result with its `show_details` flag.
pub async fn run_and_report(
    runner: &PytestRunner,
    request: &TestRunRequest,
    policy: &ReportingPolicy,
) -> CheckerResult<String> {
    let result = runner.run(request).await?;
    Ok(format_report(&result, request.show_details, policy))
}
