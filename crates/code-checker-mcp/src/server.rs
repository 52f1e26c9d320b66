//! MCP server implementation using rmcp.
//!
//! Supports both stdio and streamable HTTP transports.

use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ServerHandler, ServiceExt};
use serde_json::{Map, Value};
use tokio::io::{stdin, stdout};
use tracing::{info, warn};

use crate::tools::ToolExecutor;
use crate::types::*;

/// MCP server exposing pytest checks as tools.
#[derive(Clone)]
pub struct CodeCheckerMcp {
    executor: Arc<ToolExecutor>,
}

/// Convert a schemars schema to the Arc<Map<String, Value>> format required by rmcp.
fn schema_to_input_schema<T: schemars::JsonSchema>() -> Arc<Map<String, Value>> {
    let schema = schemars::schema_for!(T);
    let value = serde_json::to_value(&schema).unwrap_or(Value::Object(Map::new()));
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(Map::new()),
    }
}

impl CodeCheckerMcp {
    /// Create a new MCP server.
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            executor: Arc::new(ToolExecutor::new(settings)),
        }
    }

    /// Settings the server was started with.
    pub fn settings(&self) -> &ServerSettings {
        &self.executor.settings
    }

    /// Run the server over stdio transport.
    pub async fn run_stdio(self) -> Result<()> {
        info!(
            project = %self.settings().project_dir.display(),
            "Starting MCP server on stdio"
        );
        let transport = (stdin(), stdout());
        let server = self.serve(transport).await?;
        server.waiting().await?;
        Ok(())
    }

    /// Run the server over streamable HTTP transport.
    #[cfg(feature = "http-server")]
    pub async fn run_http(self, port: u16) -> Result<()> {
        use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
        use rmcp::transport::{StreamableHttpServerConfig, StreamableHttpService};
        use std::net::SocketAddr;
        use tokio::net::TcpListener;
        use tokio_util::sync::CancellationToken;

        let ct = CancellationToken::new();
        let config = StreamableHttpServerConfig {
            sse_keep_alive: Some(std::time::Duration::from_secs(30)),
            sse_retry: Some(std::time::Duration::from_secs(5)),
            // Each request gets its own session; tool calls carry no state.
            stateful_mode: false,
            cancellation_token: ct.clone(),
        };

        let session_manager = Arc::new(LocalSessionManager::default());
        let server = self.clone();
        let service = StreamableHttpService::new(
            move || Ok(server.clone()),
            session_manager,
            config,
        );

        let app = axum::Router::new()
            .fallback(axum::routing::any_service(service))
            .layer(
                tower_http::cors::CorsLayer::new()
                    .allow_origin(tower_http::cors::Any)
                    .allow_methods(tower_http::cors::Any)
                    .allow_headers(tower_http::cors::Any),
            );

        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        info!(
            %addr,
            project = %self.settings().project_dir.display(),
            "MCP HTTP server listening"
        );

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::signal::ctrl_c().await.ok();
                ct.cancel();
            })
            .await?;

        Ok(())
    }

    /// Get the list of available tools.
    fn tools() -> Vec<Tool> {
        vec![Tool {
            name: "run_pytest_check".into(),
            description: Some(
                "Run pytest on the project and return a summary of the results. Collection errors are always shown. \
                 Set show_details=true to include tracebacks and captured output for up to 10 failing tests; \
                 use markers or extra_args (e.g. a test node id or -k expression) to narrow the run first."
                    .into(),
            ),
            input_schema: schema_to_input_schema::<RunPytestCheckInput>(),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: Some("Run pytest".into()),
        }]
    }

    /// Handle a tool call.
    async fn handle_tool(&self, name: &str, args: Option<Map<String, Value>>) -> CallToolResult {
        let args = args.map(Value::Object).unwrap_or(serde_json::json!({}));

        match name {
            "run_pytest_check" => match serde_json::from_value::<RunPytestCheckInput>(args) {
                Ok(input) => match self.executor.run_pytest_check(input).await {
                    Ok(report) => CallToolResult::success(vec![Content::text(report)]),
                    Err(e) => {
                        warn!(error = %e, "run_pytest_check failed");
                        CallToolResult::error(vec![Content::text(e.to_string())])
                    }
                },
                Err(e) => {
                    CallToolResult::error(vec![Content::text(format!("Invalid input: {}", e))])
                }
            },
            _ => CallToolResult::error(vec![Content::text(format!("Unknown tool: {}", name))]),
        }
    }
}

impl ServerHandler for CodeCheckerMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "mcp-code-checker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Code Checker".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Code checker MCP server. Tool: run_pytest_check runs the project's pytest suite and returns \
                 a bounded report; ask for show_details=true when you need tracebacks."
                    .into(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: Self::tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(self.handle_tool(&request.name, request.arguments).await)
    }
}
