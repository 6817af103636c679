//! Connectivity-restored registration.

use async_trait::async_trait;
use offsync_core::Error;

/// Tag registered after a mutation is queued; its signal drains the outbox.
pub const SYNC_OUTBOX_TAG: &str = "sync-outbox";

/// Tag of the scheduled signal that refreshes the periodic-data cache.
pub const PERIODIC_REFRESH_TAG: &str = "refresh-periodic-data";

/// Host facility that fires a connectivity-restored signal for a tag once
/// the network is likely reachable again. Hosts deduplicate pending tags.
#[async_trait]
pub trait SyncRegistrar: Send + Sync {
    async fn register(&self, tag: &str) -> Result<(), Error>;
}
