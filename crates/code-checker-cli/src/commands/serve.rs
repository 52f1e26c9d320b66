//! Serve command implementation.
//!
//! Runs the MCP server over stdio, or over streamable HTTP when a port is
//! given.

use anyhow::Result;
use code_checker_mcp::{CodeCheckerMcp, ServerSettings};
use tracing::info;

/// Start the MCP server and block until the client disconnects.
pub async fn execute(settings: ServerSettings, http_port: Option<u16>) -> Result<()> {
    info!(
        project = %settings.project_dir.display(),
        test_folder = %settings.test_folder.display(),
        depth = settings.depth,
        timeout_secs = settings.runner.timeout.as_secs(),
        "Starting code checker"
    );

    let server = CodeCheckerMcp::new(settings);
    match http_port {
        Some(port) => server.run_http(port).await,
        None => server.run_stdio().await,
    }
}
