//! In-process implementation of both store contracts.
//!
//! Nothing survives the process. Used as the substitutable fake in tests and
//! by hosts that do not need durability.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{BlobCacheStore, OutboxStore};
use crate::Error;
use crate::model::{CacheKey, NewOutboxEntry, OutboxEntry, ResponseSnapshot};

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    outbox: BTreeMap<i64, OutboxEntry>,
    caches: Vec<(String, HashMap<String, ResponseSnapshot>)>,
}

impl Inner {
    fn cache_mut(&mut self, name: &str) -> &mut HashMap<String, ResponseSnapshot> {
        let index = match self.caches.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.caches.push((name.to_string(), HashMap::new()));
                self.caches.len() - 1
            }
        };
        &mut self.caches[index].1
    }
}

/// Memory-backed outbox and cache store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OutboxStore for MemoryStore {
    async fn add(&self, entry: NewOutboxEntry) -> Result<i64, Error> {
        if !entry.method.is_mutating() {
            return Err(Error::InvalidInput(format!("{} requests are never queued", entry.method)));
        }
        let mut inner = self.lock();
        inner.last_id += 1;
        let id = inner.last_id;
        inner.outbox.insert(id, OutboxEntry::from_new(id, entry));
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<OutboxEntry>, Error> {
        Ok(self.lock().outbox.values().cloned().collect())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), Error> {
        self.lock().outbox.remove(&id);
        Ok(())
    }

    async fn record_failure(&self, id: i64, reason: &str) -> Result<(), Error> {
        if let Some(entry) = self.lock().outbox.get_mut(&id) {
            entry.attempts += 1;
            entry.last_error = Some(reason.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobCacheStore for MemoryStore {
    async fn open_named(&self, name: &str) -> Result<(), Error> {
        self.lock().cache_mut(name);
        Ok(())
    }

    async fn match_entry(&self, name: &str, key: &CacheKey) -> Result<Option<ResponseSnapshot>, Error> {
        let inner = self.lock();
        Ok(inner
            .caches
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, entries)| entries.get(&key.digest()).cloned()))
    }

    async fn put(&self, name: &str, key: &CacheKey, response: ResponseSnapshot) -> Result<(), Error> {
        self.lock().cache_mut(name).insert(key.digest(), response);
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.lock().caches.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let mut inner = self.lock();
        let before = inner.caches.len();
        inner.caches.retain(|(n, _)| n != name);
        Ok(inner.caches.len() != before)
    }
}
