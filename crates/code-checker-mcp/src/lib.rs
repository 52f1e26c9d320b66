//! MCP (Model Context Protocol) server for the code checker.
//!
//! Exposes pytest runs of a single project as an MCP tool, so an LLM agent
//! can run the test suite and read a bounded summary of the results.
//!
//! ```rust,no_run
//! use code_checker_mcp::{CodeCheckerMcp, ServerSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut settings = ServerSettings::new("/path/to/project");
//!     settings.venv_path = Some("/path/to/project/.venv".into());
//!
//!     CodeCheckerMcp::new(settings).run_stdio().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Tools
//!
//! - `run_pytest_check` - Run pytest with optional markers, extra arguments
//!   and environment, returning a summary (or failure details on request)

mod server;
mod tools;
mod types;

pub use server::CodeCheckerMcp;
pub use types::*;
