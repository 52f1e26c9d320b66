//! Request DTO for a single pytest run.
//!
//! The caller (MCP tool handler or CLI) resolves every parameter up front;
//! the runner never guesses project layout on its own.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default test folder, relative to the project directory.
pub const DEFAULT_TEST_FOLDER: &str = "tests";

/// Hard upper bound on a single pytest run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Nesting depth at which the runner starts warning about recursion.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Environment variable carrying the subprocess nesting depth to children.
pub const SUBPROCESS_DEPTH_ENV: &str = "MCP_CODE_CHECKER_SUBPROCESS_DEPTH";

/// Everything needed to run pytest once against a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunRequest {
    /// Root of the project under test.
    pub project_dir: PathBuf,

    /// Test root, relative to `project_dir` unless absolute.
    #[serde(default = "default_test_folder")]
    pub test_folder: PathBuf,

    /// Interpreter to invoke. Ignored when `venv_path` is set.
    #[serde(default)]
    pub python_executable: Option<PathBuf>,

    /// Virtual environment whose interpreter overrides `python_executable`.
    #[serde(default)]
    pub venv_path: Option<PathBuf>,

    /// Marker expressions, each passed as its own `-m`.
    #[serde(default)]
    pub markers: Vec<String>,

    /// pytest verbosity, 0 to 3.
    #[serde(default)]
    pub verbosity: u8,

    /// Raw pytest arguments appended verbatim.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Extra environment for the subprocess.
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,

    /// Ask pytest not to capture output (`-s`).
    #[serde(default)]
    pub show_details: bool,

    /// Keep the JSON report file after parsing.
    #[serde(default)]
    pub keep_temp_files: bool,

    /// Nesting depth of the current process.
    #[serde(default)]
    pub depth: u32,
}

fn default_test_folder() -> PathBuf {
    PathBuf::from(DEFAULT_TEST_FOLDER)
}

impl TestRunRequest {
    /// Create a request for a project with default settings.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            test_folder: default_test_folder(),
            python_executable: None,
            venv_path: None,
            markers: vec![],
            verbosity: 0,
            extra_args: vec![],
            env_vars: BTreeMap::new(),
            show_details: false,
            keep_temp_files: false,
            depth: 0,
        }
    }

    /// Use a different test folder.
    pub fn with_test_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.test_folder = folder.into();
        self
    }

    /// Use a specific interpreter.
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python_executable = Some(python.into());
        self
    }

    /// Use the interpreter of a virtual environment.
    pub fn with_venv(mut self, venv: impl Into<PathBuf>) -> Self {
        self.venv_path = Some(venv.into());
        self
    }

    /// Add marker expressions.
    pub fn with_markers(mut self, markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.markers.extend(markers.into_iter().map(|m| m.into()));
        self
    }

    /// Set pytest verbosity (clamped to 3).
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity.min(3);
        self
    }

    /// Add raw pytest arguments.
    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable for the subprocess.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Request detailed output.
    pub fn with_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }

    /// Keep the JSON report on disk.
    pub fn keep_temp_files(mut self) -> Self {
        self.keep_temp_files = true;
        self
    }

    /// Set the nesting depth of the calling process.
    pub fn at_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// Execution policy shared by every run of a runner.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Subprocess is killed after this long.
    pub timeout: Duration,

    /// Depth at which a recursion warning is logged. Advisory only.
    pub max_depth: u32,

    /// Directory for transient JSON reports.
    pub report_dir: PathBuf,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_depth: DEFAULT_MAX_DEPTH,
            report_dir: std::env::temp_dir().join("mcp-code-checker"),
        }
    }
}

/// Read the nesting depth inherited from a parent process.
///
/// Only meant to be called once at the process boundary; everything below
/// that passes the depth explicitly through [`TestRunRequest::depth`].
pub fn inherited_depth() -> u32 {
    parse_depth(std::env::var(SUBPROCESS_DEPTH_ENV).ok())
}

/// Parse a depth variable value; unset or unparseable means top level.
pub fn parse_depth(value: Option<String>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
