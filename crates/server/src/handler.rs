//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the offline worker.
use std::sync::Arc;

use crate::tools::{WebRequestParams, generations_impl, list_impl, refresh_impl, replay_impl, request_impl};

use offsync_client::OfflineWorker;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for offsync.
#[derive(Clone)]
pub struct OffsyncServer {
    worker: Arc<OfflineWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffsyncServer {
    /// Create a new server handler around an installed worker.
    pub fn new(worker: Arc<OfflineWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Send a request through the offline pipeline.
    ///
    /// Reads are served from cache or network, page loads fall back to the
    /// offline page, and mutations are queued when the network is down.
    #[tool(
        description = "Send an HTTP request through the offline pipeline. Returns status, headers, body and where the response came from (network, cache, offline-fallback, queued)."
    )]
    async fn web_request(&self, params: Parameters<WebRequestParams>) -> Result<CallToolResult, McpError> {
        request_impl(&self.worker, params.0).await
    }

    #[tool(description = "List mutations waiting in the outbox, oldest first.")]
    async fn outbox_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker).await
    }

    /// Replay the outbox now instead of waiting for connectivity probing.
    #[tool(description = "Replay queued mutations now. Returns counts of delivered, retained and parked entries.")]
    async fn outbox_replay(&self) -> Result<CallToolResult, McpError> {
        replay_impl(&self.worker).await
    }

    #[tool(description = "Refresh the periodic data resource into its cache. Never fails; reports why nothing was written.")]
    async fn periodic_refresh(&self) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.worker).await
    }

    #[tool(description = "List caches in the store and mark which belong to the active version.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.worker).await
    }
}

impl ServerHandler for OffsyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offsync".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{FlakyNetwork, worker_with};

    #[test]
    fn test_lists_all_tools() {
        let (worker, _rx) = worker_with(Arc::new(FlakyNetwork::default()));
        let server = OffsyncServer::new(Arc::new(worker));
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            ["cache_generations", "outbox_list", "outbox_replay", "periodic_refresh", "web_request"]
        );
    }

    #[test]
    fn test_server_info() {
        let (worker, _rx) = worker_with(Arc::new(FlakyNetwork::default()));
        let info = OffsyncServer::new(Arc::new(worker)).get_info();
        assert_eq!(info.server_info.name, "offsync");
    }
}
