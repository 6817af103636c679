//! MCP tool implementations.
//!
//! Each tool drives one lifecycle trigger or inspects worker state.

pub mod cache;
pub mod outbox;
pub mod web_request;

pub use cache::{generations_impl, refresh_impl};
pub use outbox::{list_impl, replay_impl};
pub use web_request::{WebRequestParams, request_impl};

use offsync_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
