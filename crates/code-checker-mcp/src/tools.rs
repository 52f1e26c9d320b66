//! Tool implementations for the MCP server.

use tracing::info;

use code_checker_pytest::{run_and_report, CheckerResult, PytestRunner, TestRunRequest};

use crate::types::*;

/// Tool executor that implements the actual logic.
pub struct ToolExecutor {
    pub settings: ServerSettings,
    runner: PytestRunner,
}

impl ToolExecutor {
    pub fn new(settings: ServerSettings) -> Self {
        let runner = PytestRunner::new(settings.runner.clone());
        Self { settings, runner }
    }

    /// Merge server settings with a tool call into a run request.
    pub fn build_request(&self, input: RunPytestCheckInput) -> TestRunRequest {
        let settings = &self.settings;
        let mut request = TestRunRequest::new(&settings.project_dir)
            .with_test_folder(&settings.test_folder)
            .with_markers(input.markers)
            .with_verbosity(input.verbosity)
            .with_extra_args(input.extra_args)
            .with_details(input.show_details)
            .at_depth(settings.depth);

        request.python_executable = settings.python_executable.clone();
        request.venv_path = settings.venv_path.clone();
        request.keep_temp_files = settings.keep_temp_files;
        request.env_vars.extend(input.env_vars);
        request
    }

    /// Run pytest and return the formatted report.
    pub async fn run_pytest_check(&self, input: RunPytestCheckInput) -> CheckerResult<String> {
        let request = self.build_request(input);
        info!(
            markers = ?request.markers,
            extra_args = ?request.extra_args,
            show_details = request.show_details,
            "run_pytest_check"
        );
        run_and_report(&self.runner, &request, &self.settings.reporting).await
    }
}
