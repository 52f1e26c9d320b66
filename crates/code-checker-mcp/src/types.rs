//! Types for MCP tool inputs and server settings.

use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use code_checker_pytest::{ReportingPolicy, RunnerOptions, DEFAULT_TEST_FOLDER};

// =============================================================================
// Server Settings
// =============================================================================

/// Project-level settings fixed when the server starts.
///
/// Tool calls only choose what to run (markers, extra arguments, detail
/// level); where and with which interpreter is decided here.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Root of the project under test.
    pub project_dir: PathBuf,

    /// Test folder relative to the project root.
    pub test_folder: PathBuf,

    /// Interpreter to run pytest with.
    pub python_executable: Option<PathBuf>,

    /// Virtual environment whose interpreter takes precedence.
    pub venv_path: Option<PathBuf>,

    /// Keep JSON reports after parsing.
    pub keep_temp_files: bool,

    /// Nesting depth inherited by this server process.
    pub depth: u32,

    /// Timeout and recursion policy for pytest runs.
    pub runner: RunnerOptions,

    /// Output limits for reports.
    pub reporting: ReportingPolicy,
}

impl ServerSettings {
    /// Settings for a project with defaults everywhere else.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            test_folder: PathBuf::from(DEFAULT_TEST_FOLDER),
            python_executable: None,
            venv_path: None,
            keep_temp_files: false,
            depth: 0,
            runner: RunnerOptions::default(),
            reporting: ReportingPolicy::default(),
        }
    }
}

// =============================================================================
// Tool Input Types
// =============================================================================

/// Input for the `run_pytest_check` tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RunPytestCheckInput {
    /// pytest marker expressions to select tests (e.g. "slow", "not integration").
    #[serde(default)]
    pub markers: Vec<String>,

    /// pytest verbosity level, 0 to 3.
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,

    /// Additional pytest arguments, e.g. ["-k", "test_name", "-x"] or test node ids.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Extra environment variables for the pytest process.
    #[serde(default)]
    pub env_vars: HashMap<String, String>,

    /// Include tracebacks and captured output for failing tests.
    #[serde(default)]
    pub show_details: bool,
}

fn default_verbosity() -> u8 {
    2
}
