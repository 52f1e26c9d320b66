//! pytest subprocess execution.
//!
//! Runs pytest exactly once per request with a JSON report written to a
//! uniquely named file, waits with a hard timeout, and folds everything that
//! happens after spawning into a [`RawTestResult`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CheckerError, CheckerResult};
use crate::json_report::parse_json_report;
use crate::request::{RunnerOptions, TestRunRequest, SUBPROCESS_DEPTH_ENV};
use crate::result::{RawTestResult, ReportStatus};

/// Exit code recorded when pytest was terminated by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -2;

#[cfg(windows)]
const FALLBACK_PYTHON: &str = "python";
#[cfg(not(windows))]
const FALLBACK_PYTHON: &str = "python3";

/// Runs pytest for [`TestRunRequest`]s under a fixed [`RunnerOptions`] policy.
///
/// Holds no per-run state, so one runner can serve concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct PytestRunner {
    options: RunnerOptions,
}

impl PytestRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Run pytest once and collect its results.
    ///
    /// Fails only on pre-flight problems (missing paths, missing interpreter).
    /// Timeouts and missing or malformed reports are returned as results.
    pub async fn run(&self, request: &TestRunRequest) -> CheckerResult<RawTestResult> {
        let test_path = resolve_test_path(request)?;
        let interpreter = resolve_interpreter(request)?;

        if request.depth >= self.options.max_depth {
            warn!(
                depth = request.depth,
                max_depth = self.options.max_depth,
                "pytest runner is nested deeply; continuing, the timeout still applies"
            );
        }

        tokio::fs::create_dir_all(&self.options.report_dir).await?;
        let report_path = self
            .options
            .report_dir
            .join(format!("pytest_result_{}.json", Uuid::new_v4().simple()));

        let argv = build_command(&interpreter, &test_path, request, &report_path);
        info!(
            project = %request.project_dir.display(),
            tests = %test_path.display(),
            depth = request.depth,
            "Running pytest"
        );
        debug!(command = ?argv, "pytest command line");

        let mut cmd = Command::new(&interpreter);
        cmd.args(&argv[1..])
            .current_dir(&request.project_dir)
            .envs(&request.env_vars)
            .env(SUBPROCESS_DEPTH_ENV, (request.depth + 1).to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(interpreter = %interpreter.display(), error = %e, "Failed to start interpreter");
                return Err(if e.kind() == ErrorKind::NotFound {
                    CheckerError::interpreter_not_found(&interpreter)
                } else {
                    CheckerError::interpreter_not_runnable(&interpreter, &e)
                });
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.options.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed waiting for pytest");
                remove_report(&report_path, request.keep_temp_files).await;
                return Ok(RawTestResult {
                    exit_code: SIGNAL_EXIT_CODE,
                    collected_count: 0,
                    outcomes: vec![],
                    collection_errors: vec![],
                    duration: start.elapsed(),
                    raw_report_path: report_path,
                    report: ReportStatus::Missing,
                    stdout: String::new(),
                    stderr: format!("Failed waiting for pytest: {}", e),
                });
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.options.timeout.as_secs(),
                    "pytest timed out and was killed"
                );
                remove_report(&report_path, request.keep_temp_files).await;
                return Ok(RawTestResult::timed_out(
                    self.options.timeout,
                    report_path,
                    String::new(),
                    String::new(),
                ));
            }
        };

        let elapsed = start.elapsed();
        let exit_code = output.status.code().unwrap_or(SIGNAL_EXIT_CODE);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let mut result = RawTestResult {
            exit_code,
            collected_count: 0,
            outcomes: vec![],
            collection_errors: vec![],
            duration: elapsed,
            raw_report_path: report_path.clone(),
            report: ReportStatus::Missing,
            stdout,
            stderr,
        };

        match tokio::fs::read_to_string(&report_path).await {
            Ok(text) => match parse_json_report(&text) {
                Ok(parsed) => {
                    result.collected_count = parsed.collected_count;
                    result.outcomes = parsed.outcomes;
                    result.collection_errors = parsed.collection_errors;
                    result.duration = parsed.duration.unwrap_or(elapsed);
                    result.report = ReportStatus::Parsed;
                }
                Err(e) => {
                    warn!(report = %report_path.display(), error = %e, "Malformed pytest report");
                    result.report = ReportStatus::Malformed {
                        reason: e.to_string(),
                    };
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(exit_code, "pytest did not write a JSON report");
            }
            Err(e) => {
                result.report = ReportStatus::Malformed {
                    reason: e.to_string(),
                };
            }
        }

        remove_report(&report_path, request.keep_temp_files).await;

        let counts = result.counts();
        info!(
            exit_code,
            collected = result.collected_count,
            passed = counts.passed,
            failed = counts.failed,
            errors = counts.errors,
            skipped = counts.skipped,
            collection_errors = result.collection_errors.len(),
            duration_ms = result.duration.as_millis() as u64,
            "pytest completed"
        );

        Ok(result)
    }
}

/// Interpreter inside a virtual environment.
pub fn venv_interpreter(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

/// Pick the interpreter: venv first, then the explicit executable, then `PATH`.
pub fn resolve_interpreter(request: &TestRunRequest) -> CheckerResult<PathBuf> {
    if let Some(venv) = &request.venv_path {
        if !venv.is_dir() {
            return Err(CheckerError::Environment {
                path: venv.clone(),
                message: "Virtual environment not found".to_string(),
                hint: "Check --venv-path or create the environment first.".to_string(),
            });
        }
        let python = venv_interpreter(venv);
        if !python.is_file() {
            return Err(CheckerError::interpreter_not_found(python));
        }
        return Ok(python);
    }

    if let Some(python) = &request.python_executable {
        // Bare names like `python3` are left to the PATH lookup at spawn time.
        let is_bare = python.parent().map_or(true, |p| p.as_os_str().is_empty());
        if !is_bare && !python.is_file() {
            return Err(CheckerError::interpreter_not_found(python));
        }
        return Ok(python.clone());
    }

    Ok(PathBuf::from(FALLBACK_PYTHON))
}

/// Resolve the test path and make sure it exists.
pub fn resolve_test_path(request: &TestRunRequest) -> CheckerResult<PathBuf> {
    if !request.project_dir.is_dir() {
        return Err(CheckerError::configuration(
            &request.project_dir,
            "Project directory does not exist",
        ));
    }

    let path = if request.test_folder.is_absolute() {
        request.test_folder.clone()
    } else {
        request.project_dir.join(&request.test_folder)
    };

    if !path.exists() {
        return Err(CheckerError::configuration(
            path,
            "Test folder does not exist",
        ));
    }
    Ok(path)
}

/// Build the full pytest command line, interpreter first.
pub fn build_command(
    interpreter: &Path,
    test_path: &Path,
    request: &TestRunRequest,
    report_file: &Path,
) -> Vec<String> {
    let mut argv = vec![
        interpreter.to_string_lossy().into_owned(),
        "-m".to_string(),
        "pytest".to_string(),
        test_path.to_string_lossy().into_owned(),
    ];

    match request.verbosity.min(3) {
        0 => {}
        n => argv.push(format!("-{}", "v".repeat(n as usize))),
    }

    for marker in &request.markers {
        argv.push("-m".to_string());
        argv.push(marker.clone());
    }

    argv.push("--json-report".to_string());
    argv.push(format!("--json-report-file={}", report_file.display()));

    argv.extend(request.extra_args.iter().cloned());

    if request.show_details && !request.extra_args.iter().any(|a| a == "-s") {
        argv.push("-s".to_string());
    }

    argv
}

async fn remove_report(path: &Path, keep: bool) {
    if keep {
        debug!(report = %path.display(), "Keeping pytest report");
        return;
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(report = %path.display(), error = %e, "Failed to remove pytest report"),
    }
}
