//! mcp-code-checker - run pytest for LLM agents.
//!
//! Serves a project's test suite over MCP (`serve`, the default) or runs it
//! once from the terminal (`check`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod logging;

use code_checker_mcp::ServerSettings;
use config::Config;

/// Code checker MCP server: exposes pytest runs of a project to LLM agents.
#[derive(Parser, Debug)]
#[command(
    name = "mcp-code-checker",
    author,
    version,
    about = "MCP server exposing pytest checks to LLM agents",
    long_about = None
)]
struct Cli {
    /// Root of the project to test.
    #[arg(long, global = true, env = "MCP_CODE_CHECKER_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Python interpreter to run pytest with.
    #[arg(long, global = true)]
    python_executable: Option<PathBuf>,

    /// Virtual environment to take the interpreter from (overrides --python-executable).
    #[arg(long, global = true)]
    venv_path: Option<PathBuf>,

    /// Test folder relative to the project directory.
    #[arg(long, global = true)]
    test_folder: Option<PathBuf>,

    /// Keep pytest JSON reports after parsing.
    #[arg(long, global = true)]
    keep_temp_files: bool,

    /// Log level: error, warn, info, debug or trace.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write JSON logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose output (same as --log-level debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default command).
    Serve {
        /// Serve over streamable HTTP on this port instead of stdio.
        #[arg(long)]
        http: Option<u16>,
    },

    /// Run pytest once and print the report.
    Check {
        /// Marker expression (can be specified multiple times).
        #[arg(short, long = "marker")]
        markers: Vec<String>,

        /// pytest verbosity, 0 to 3.
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
        verbosity: u8,

        /// Include tracebacks and captured output for failing tests.
        #[arg(long)]
        show_details: bool,

        /// Extra environment for pytest as KEY=VALUE (can be specified multiple times).
        #[arg(short, long = "env", value_parser = parse_env_pair)]
        env_vars: Vec<(String, String)>,

        /// Arguments passed to pytest verbatim (after `--`).
        #[arg(last = true)]
        extra_args: Vec<String>,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Show path to config file.
    Path,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        cli.log_level.clone().unwrap_or_else(|| config.log_level.clone())
    };
    logging::init(&level, cli.log_file.as_deref())?;

    let default_command = Commands::Serve { http: None };
    let command = cli.command.as_ref().unwrap_or(&default_command);

    match command {
        Commands::Serve { http } => {
            let settings = server_settings(&cli, &config)?;
            commands::serve::execute(settings, *http).await?;
        }

        Commands::Check {
            markers,
            verbosity,
            show_details,
            env_vars,
            extra_args,
        } => {
            let settings = server_settings(&cli, &config)?;
            let args = commands::check::CheckArgs {
                markers: markers.clone(),
                verbosity: *verbosity,
                show_details: *show_details,
                env_vars: env_vars.iter().cloned().collect(),
                extra_args: extra_args.clone(),
            };
            let passed = commands::check::execute(&settings, args).await?;
            if !passed {
                std::process::exit(1);
            }
        }

        Commands::Config(ConfigCommands::Show) => commands::config::show(&config),

        Commands::Config(ConfigCommands::Path) => match Config::config_file_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config file path available)"),
        },
    }

    Ok(())
}

/// Combine configuration and CLI flags into server settings.
fn server_settings(cli: &Cli, config: &Config) -> Result<ServerSettings> {
    let project_dir = cli
        .project_dir
        .as_ref()
        .context("--project-dir is required (or set MCP_CODE_CHECKER_PROJECT_DIR)")?;
    let project_dir = std::fs::canonicalize(project_dir)
        .with_context(|| format!("Project directory not found: {}", project_dir.display()))?;

    let mut settings = ServerSettings::new(project_dir);
    settings.test_folder = cli
        .test_folder
        .clone()
        .unwrap_or_else(|| config.test_folder.clone());
    settings.python_executable = cli.python_executable.clone();
    settings.venv_path = cli.venv_path.clone();
    settings.keep_temp_files = cli.keep_temp_files || config.keep_temp_files;
    settings.depth = code_checker_pytest::inherited_depth();
    settings.runner = config.runner_options();
    settings.reporting = config.reporting_policy();
    Ok(settings)
}
