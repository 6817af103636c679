//! Scheduled refresh of the periodic-data cache.

use std::sync::Arc;

use offsync_core::CacheKey;
use url::Url;

use crate::cache::{CacheManager, CacheRole};
use crate::fetch::Network;
use crate::request::Request;

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    /// Nothing was written; the cached copy, if any, stays in place.
    Skipped { reason: String },
}

/// Re-fetches one well-known resource into the periodic-data cache.
pub struct Refresher {
    network: Arc<dyn Network>,
    caches: CacheManager,
    resource: Url,
}

impl Refresher {
    pub fn new(network: Arc<dyn Network>, caches: CacheManager, resource: Url) -> Self {
        Self { network, caches, resource }
    }

    pub fn resource(&self) -> &Url {
        &self.resource
    }

    /// Fetch once and overwrite the cached copy on an ok response.
    ///
    /// Never fails: every error is logged and reported as `Skipped`. The
    /// next scheduled trigger is the only retry.
    pub async fn run(&self) -> RefreshOutcome {
        let request = Request::get(self.resource.clone());

        let response = match self.network.send(&request).await {
            Ok(response) if response.ok() => response,
            Ok(response) => return self.skip(format!("status {}", response.status.as_u16())),
            Err(e) => return self.skip(e.to_string()),
        };

        let key = CacheKey::get(self.resource.as_str());
        let stored = match self.caches.open(CacheRole::PeriodicData).await {
            Ok(cache) => cache.put(&key, &response).await,
            Err(e) => Err(e),
        };

        match stored {
            Ok(()) => {
                tracing::info!(url = %self.resource, bytes = response.body.len(), "refreshed periodic data");
                RefreshOutcome::Updated
            }
            Err(e) => self.skip(e.to_string()),
        }
    }

    fn skip(&self, reason: String) -> RefreshOutcome {
        tracing::warn!(url = %self.resource, "periodic refresh skipped: {reason}");
        RefreshOutcome::Skipped { reason }
    }
}
