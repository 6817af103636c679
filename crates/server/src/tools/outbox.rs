//! outbox_list and outbox_replay tool implementations.

use offsync_client::{Lifecycle, OfflineWorker, SYNC_OUTBOX_TAG};
use offsync_core::OutboxEntry;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the outbox_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OutboxListOutput {
    /// Queued mutations, oldest first.
    pub entries: Vec<OutboxEntry>,
}

/// Output from the outbox_replay tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OutboxReplayOutput {
    pub attempted: usize,
    pub delivered: usize,
    pub retained: usize,
    /// Entries that cannot be sent as stored. Replaying again will not help.
    pub unsendable: usize,
    pub parked: usize,
}

/// Implementation of the outbox_list tool.
pub async fn list_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let entries = worker.pending().await?;
    json_result(&OutboxListOutput { entries })
}

/// Implementation of the outbox_replay tool.
///
/// Runs the connectivity-restored handler immediately instead of waiting
/// for the watcher.
pub async fn replay_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_connectivity_restored(SYNC_OUTBOX_TAG).await?.unwrap_or_default();
    let output = OutboxReplayOutput {
        attempted: report.attempted,
        delivered: report.delivered,
        retained: report.retained,
        unsendable: report.unsendable,
        parked: report.parked,
    };
    json_result(&output)
}
