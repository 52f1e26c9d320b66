//! Check command implementation.
//!
//! Runs pytest once with the same settings the server would use and prints
//! the report to stdout.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use code_checker_mcp::ServerSettings;
use code_checker_pytest::{format_report, PytestRunner, TestRunRequest};

/// Per-run options from the command line.
#[derive(Debug, Clone, Default)]
pub struct CheckArgs {
    pub markers: Vec<String>,
    pub verbosity: u8,
    pub show_details: bool,
    pub env_vars: BTreeMap<String, String>,
    pub extra_args: Vec<String>,
}

/// Run pytest and print the report. Returns whether the run passed.
pub async fn execute(settings: &ServerSettings, args: CheckArgs) -> Result<bool> {
    let mut request = TestRunRequest::new(&settings.project_dir)
        .with_test_folder(&settings.test_folder)
        .with_markers(args.markers)
        .with_verbosity(args.verbosity)
        .with_extra_args(args.extra_args)
        .with_details(args.show_details)
        .at_depth(settings.depth);
    request.python_executable = settings.python_executable.clone();
    request.venv_path = settings.venv_path.clone();
    request.keep_temp_files = settings.keep_temp_files;
    request.env_vars = args.env_vars;

    let runner = PytestRunner::new(settings.runner.clone());
    let result = runner
        .run(&request)
        .await
        .context("Could not run pytest")?;

    println!("{}", format_report(&result, request.show_details, &settings.reporting));
    if request.keep_temp_files {
        eprintln!("JSON report kept at {}", result.raw_report_path.display());
    }

    Ok(result.passed())
}
