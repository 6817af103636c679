//! Durable stores behind the offline pipeline.
//!
//! Two contracts, each operation atomic on its own:
//!
//! - [`OutboxStore`]: append-only queue of pending mutations with
//!   store-assigned, strictly increasing ids.
//! - [`BlobCacheStore`]: named caches mapping GET request identities to
//!   response snapshots.
//!
//! [`OfflineDb`] implements both over SQLite (tokio-rusqlite, WAL mode).
//! [`MemoryStore`] implements both in process memory for tests and
//! ephemeral hosts.

pub mod caches;
pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod outbox;

use async_trait::async_trait;

pub use crate::Error;
use crate::model::{CacheKey, NewOutboxEntry, OutboxEntry, ResponseSnapshot};

pub use connection::OfflineDb;
pub use memory::MemoryStore;

/// Durable queue of mutations awaiting delivery.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Append an entry and return its id. The entry is visible to
    /// `list_all` once this returns, never before.
    async fn add(&self, entry: NewOutboxEntry) -> Result<i64, Error>;

    /// All entries in insertion order. Rows that no longer decode are
    /// skipped with a warning and left in place.
    async fn list_all(&self) -> Result<Vec<OutboxEntry>, Error>;

    /// Remove an entry. Deleting an id that is already gone is not an error.
    async fn delete_by_id(&self, id: i64) -> Result<(), Error>;

    /// Count a failed delivery attempt against an entry.
    async fn record_failure(&self, id: i64, reason: &str) -> Result<(), Error>;
}

/// Named key→response caches.
#[async_trait]
pub trait BlobCacheStore: Send + Sync {
    /// Create the named cache if it does not exist yet.
    async fn open_named(&self, name: &str) -> Result<(), Error>;

    /// Look up a key. A missing cache matches nothing.
    async fn match_entry(&self, name: &str, key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error>;

    /// Store a response, creating the cache if needed and replacing any
    /// previous entry for the key.
    async fn put(&self, name: &str, key: &CacheKey, response: ResponseSnapshot) -> Result<(), Error>;

    /// Names of all existing caches, oldest first.
    async fn cache_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a cache and all of its entries. Returns whether it existed.
    async fn delete_cache(&self, name: &str) -> Result<bool, Error>;
}
