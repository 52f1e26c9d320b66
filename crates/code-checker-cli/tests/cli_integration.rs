//! Integration tests for the mcp-code-checker CLI.
//!
//! `check` runs against a fake project whose interpreter is `/bin/sh`: the
//! runner's `sh -m pytest <args>` executes a `pytest` shell script in the
//! project directory that writes a canned JSON report.
//!
//! Run with: `cargo test --package code-checker-cli --test cli_integration`

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run the CLI with an isolated config directory and no inherited settings.
fn run_checker(config_home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mcp-code-checker"))
        .args(args)
        .env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("RUST_LOG")
        .env_remove("MCP_CODE_CHECKER_PROJECT_DIR")
        .env_remove("MCP_CODE_CHECKER_TEST_FOLDER")
        .env_remove("MCP_CODE_CHECKER_TIMEOUT_SECS")
        .env_remove("MCP_CODE_CHECKER_SUBPROCESS_DEPTH")
        .output()
        .expect("Failed to execute mcp-code-checker")
}

/// Create a project with a `tests` folder and a fake pytest that reports
/// one test with the given outcome.
fn create_project(dir: &Path, outcome: &str, exit_code: i32) {
    fs::create_dir_all(dir.join("tests")).unwrap();
    let script = format!(
        r##"report=""
for arg in "$@"; do
  case "$arg" in
    --json-report-file=*) report="${{arg#--json-report-file=}}" ;;
  esac
done
cat > "$report" <<'EOF'
{{
  "duration": 0.01,
  "exitcode": {exit_code},
  "summary": {{"collected": 1}},
  "collectors": [],
  "tests": [
    {{"nodeid": "tests/test_app.py::test_app", "outcome": "{outcome}",
     "call": {{"duration": 0.004, "outcome": "{outcome}",
              "longrepr": "E       assert 1 == 2"}}}}
  ]
}}
EOF
exit {exit_code}
"##
    );
    fs::write(dir.join("pytest"), script).unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    let output = run_checker(home.path(), &["--help"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("serve"));
    assert!(text.contains("check"));
    assert!(text.contains("--project-dir"));
}

#[test]
fn test_check_passing_project() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    create_project(project.path(), "passed", 0);

    let output = run_checker(
        home.path(),
        &[
            "--project-dir",
            project.path().to_str().unwrap(),
            "--python-executable",
            "/bin/sh",
            "-q",
            "check",
        ],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let text = stdout(&output);
    assert!(text.contains("PASSED"), "stdout: {}", text);
    assert!(text.contains("1 passed"), "stdout: {}", text);
}

#[test]
fn test_check_failing_project_exits_nonzero() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    create_project(project.path(), "failed", 1);

    let output = run_checker(
        home.path(),
        &[
            "--project-dir",
            project.path().to_str().unwrap(),
            "--python-executable",
            "/bin/sh",
            "-q",
            "check",
            "--show-details",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("FAILED"), "stdout: {}", text);
    assert!(text.contains("assert 1 == 2"), "stdout: {}", text);
}

#[test]
fn test_check_missing_project_dir() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("does-not-exist");

    let output = run_checker(
        home.path(),
        &["--project-dir", missing.to_str().unwrap(), "check"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Project directory not found"), "stderr: {}", stderr);
}

#[test]
fn test_check_missing_test_folder() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let output = run_checker(
        home.path(),
        &[
            "--project-dir",
            project.path().to_str().unwrap(),
            "--python-executable",
            "/bin/sh",
            "check",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Test folder does not exist"), "stderr: {}", stderr);
}

#[test]
fn test_config_path() {
    let home = TempDir::new().unwrap();
    let output = run_checker(home.path(), &["config", "path"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("config.json"));
}

#[test]
fn test_config_show_reads_env() {
    let home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_mcp-code-checker"))
        .args(["config", "show"])
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("MCP_CODE_CHECKER_TIMEOUT_SECS", "42")
        .output()
        .expect("Failed to execute mcp-code-checker");

    assert!(output.status.success());
    assert!(stdout(&output).contains("42 s"));
}
