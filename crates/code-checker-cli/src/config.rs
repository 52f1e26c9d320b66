//! CLI configuration management.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file,
//! environment variables (including `.env`), then command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use code_checker_pytest::{ReportingPolicy, RunnerOptions, DEFAULT_MAX_DEPTH, DEFAULT_TEST_FOLDER};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Application-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Test folder relative to the project directory.
    pub test_folder: PathBuf,

    /// Seconds before a pytest run is killed.
    pub timeout_secs: u64,

    /// Nesting depth at which recursion warnings start.
    pub max_depth: u32,

    /// Largest collected-test count that still gets the show_details hint.
    pub hint_threshold: usize,

    /// Keep pytest JSON reports after parsing.
    pub keep_temp_files: bool,

    /// Default log level when neither `--log-level` nor `RUST_LOG` is set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            test_folder: PathBuf::from(DEFAULT_TEST_FOLDER),
            timeout_secs: 300,
            max_depth: DEFAULT_MAX_DEPTH,
            hint_threshold: ReportingPolicy::default().hint_threshold,
            keep_temp_files: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from environment variables.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(folder) = var("MCP_CODE_CHECKER_TEST_FOLDER") {
            self.test_folder = PathBuf::from(folder);
        }
        if let Some(secs) = var("MCP_CODE_CHECKER_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid MCP_CODE_CHECKER_TIMEOUT_SECS: {}", secs))?;
        }
        if let Some(depth) = var("MCP_CODE_CHECKER_MAX_DEPTH") {
            self.max_depth = depth
                .parse()
                .with_context(|| format!("Invalid MCP_CODE_CHECKER_MAX_DEPTH: {}", depth))?;
        }
        if let Some(threshold) = var("MCP_CODE_CHECKER_HINT_THRESHOLD") {
            self.hint_threshold = threshold.parse().with_context(|| {
                format!("Invalid MCP_CODE_CHECKER_HINT_THRESHOLD: {}", threshold)
            })?;
        }
        if let Some(level) = var("MCP_CODE_CHECKER_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "mcp-code-checker", "mcp-code-checker")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Runner policy derived from this configuration.
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_depth: self.max_depth,
            ..Default::default()
        }
    }

    /// Reporting policy derived from this configuration.
    pub fn reporting_policy(&self) -> ReportingPolicy {
        ReportingPolicy {
            hint_threshold: self.hint_threshold,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.test_folder, PathBuf::from("tests"));
        assert_eq!(config.runner_options().timeout, Duration::from_secs(300));
        assert_eq!(config.reporting_policy(), ReportingPolicy::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("MCP_CODE_CHECKER_TEST_FOLDER", "src/tests"),
                ("MCP_CODE_CHECKER_TIMEOUT_SECS", "60"),
                ("MCP_CODE_CHECKER_HINT_THRESHOLD", "5"),
            ]))
            .unwrap();
        assert_eq!(config.test_folder, PathBuf::from("src/tests"));
        assert_eq!(config.runner_options().timeout, Duration::from_secs(60));
        assert_eq!(config.reporting_policy().hint_threshold, 5);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("MCP_CODE_CHECKER_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("MCP_CODE_CHECKER_TIMEOUT_SECS"));
    }

    #[test]
    fn test_partial_config_file() {
        let config: Config = serde_json::from_str(r#"{"timeout_secs": 120}"#).unwrap();
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.test_folder, PathBuf::from("tests"));
    }
}
