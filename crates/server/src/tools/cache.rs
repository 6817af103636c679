//! cache_generations and periodic_refresh tool implementations.

use offsync_client::{Lifecycle, OfflineWorker, PERIODIC_REFRESH_TAG, RefreshOutcome};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// One cache in the store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInfo {
    pub name: String,
    /// Whether this is an active generation of the current version.
    pub active: bool,
}

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    pub version: String,
    pub caches: Vec<CacheInfo>,
}

/// Output from the periodic_refresh tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PeriodicRefreshOutput {
    pub resource: String,
    pub updated: bool,
    /// Why nothing was written, when `updated` is false.
    pub reason: Option<String>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let generation = worker.caches().generation();
    let active = generation.active_names();
    let caches = worker
        .caches()
        .names()
        .await?
        .into_iter()
        .map(|name| CacheInfo { active: active.contains(&name), name })
        .collect();

    json_result(&CacheGenerationsOutput { version: generation.version().to_string(), caches })
}

/// Implementation of the periodic_refresh tool.
pub async fn refresh_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let outcome = worker.on_scheduled_sync(PERIODIC_REFRESH_TAG).await?;
    let (updated, reason) = match outcome {
        Some(RefreshOutcome::Updated) => (true, None),
        Some(RefreshOutcome::Skipped { reason }) => (false, Some(reason)),
        None => (false, Some("periodic refresh not handled".into())),
    };

    json_result(&PeriodicRefreshOutput { resource: worker.settings().periodic_resource.to_string(), updated, reason })
}
