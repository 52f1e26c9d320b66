//! Error types for the pytest runner.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for runner operations.
pub type CheckerResult<T> = Result<T, CheckerError>;

/// Errors that can occur before or while running pytest.
///
/// Only pre-flight problems surface as errors. Once the subprocess has been
/// spawned, failures (timeouts, missing or malformed reports) are folded
/// into a [`RawTestResult`](crate::RawTestResult) instead.
#[derive(Debug, Error)]
pub enum CheckerError {
    /// Project directory or test folder is missing.
    #[error("Configuration error: {message} ({path})")]
    Configuration { path: PathBuf, message: String },

    /// Interpreter or virtual environment does not resolve to an executable.
    #[error("Environment error: {message} ({path}). {hint}")]
    Environment {
        path: PathBuf,
        message: String,
        hint: String,
    },

    /// pytest exited abnormally and left no report behind.
    #[error("pytest exited with code {exit_code} without producing a report: {stderr}")]
    Execution { exit_code: i32, stderr: String },

    /// The JSON report could not be interpreted.
    #[error("Failed to parse pytest report: {0}")]
    ReportParse(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckerError {
    /// Create a configuration error for a missing or invalid path.
    pub fn configuration(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an environment error for an interpreter that cannot be run.
    pub fn interpreter_not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::Environment {
            hint: format!(
                "Pass --python-executable or --venv-path pointing at an interpreter with pytest installed (interpreter not found at {}).",
                path.display()
            ),
            message: "Python interpreter not found".to_string(),
            path,
        }
    }

    /// Create an environment error for an interpreter the OS refused to start.
    pub fn interpreter_not_runnable(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        let path = path.into();
        Self::Environment {
            hint: format!(
                "Make sure {} is an executable Python interpreter with pytest installed.",
                path.display()
            ),
            message: format!("Python interpreter could not be started: {}", source),
            path,
        }
    }

    /// Whether this error happened before any subprocess was spawned.
    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Environment { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_path() {
        let err = CheckerError::configuration("/missing/tests", "Test folder does not exist");
        let msg = err.to_string();
        assert!(msg.contains("/missing/tests"));
        assert!(msg.contains("Test folder does not exist"));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_interpreter_not_found_has_hint() {
        let err = CheckerError::interpreter_not_found("/opt/venv/bin/python");
        let msg = err.to_string();
        assert!(msg.contains("interpreter not found at /opt/venv/bin/python"));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_interpreter_not_runnable_keeps_os_error() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "Exec format error");
        let err = CheckerError::interpreter_not_runnable("/project/python", &source);
        let msg = err.to_string();
        assert!(msg.contains("could not be started: Exec format error"));
        assert!(msg.contains("/project/python"));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_execution_error_is_not_preflight() {
        let err = CheckerError::Execution {
            exit_code: 4,
            stderr: "usage error".into(),
        };
        assert!(!err.is_preflight());
        assert!(err.to_string().contains("code 4"));
    }
}
