//! Versioned content caches.
//!
//! Each [`CacheRole`] has exactly one active generation, named
//! `{prefix}-{role}-{version}`. Installing a new version fills the static
//! generation from the pre-cache manifest; activating it deletes every cache
//! whose name is not one of the three active generation names. Lookups only
//! ever consult active generations, so entries of a superseded generation
//! are unreachable even before they are deleted.

use std::fmt;
use std::sync::Arc;

use offsync_core::{BlobCacheStore, CacheKey, Error};
use url::Url;

use crate::fetch::Network;
use crate::request::{Request, Response};

/// What a cache generation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheRole {
    /// Offline shell fetched at install.
    Static,
    /// Responses mirrored while serving reads.
    Runtime,
    /// The resource kept fresh by scheduled sync.
    PeriodicData,
}

impl CacheRole {
    /// Lookup order for reads that may be served from any role.
    pub const ALL: [CacheRole; 3] = [CacheRole::Static, CacheRole::Runtime, CacheRole::PeriodicData];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheRole::Static => "static",
            CacheRole::Runtime => "runtime",
            CacheRole::PeriodicData => "periodic-data",
        }
    }
}

impl fmt::Display for CacheRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The generation tag shared by all three roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    prefix: String,
    version: String,
}

impl Generation {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache_name(&self, role: CacheRole) -> String {
        format!("{}-{}-{}", self.prefix, role, self.version)
    }

    pub fn active_names(&self) -> Vec<String> {
        CacheRole::ALL.iter().map(|role| self.cache_name(*role)).collect()
    }
}

/// An opened named cache.
#[derive(Clone)]
pub struct CacheHandle {
    store: Arc<dyn BlobCacheStore>,
    name: String,
}

impl CacheHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        match self.store.match_entry(&self.name, key).await? {
            Some(snapshot) => Ok(Some(Response::from_snapshot(snapshot)?)),
            None => Ok(None),
        }
    }

    /// Replace whatever is stored under `key`.
    pub async fn put(&self, key: &CacheKey, response: &Response) -> Result<(), Error> {
        self.store.put(&self.name, key, response.to_snapshot()).await
    }
}

/// Access to the active cache generations.
#[derive(Clone)]
pub struct CacheManager {
    store: Arc<dyn BlobCacheStore>,
    generation: Generation,
}

impl CacheManager {
    pub fn new(store: Arc<dyn BlobCacheStore>, generation: Generation) -> Self {
        Self { store, generation }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Open (creating if needed) the active generation for `role`.
    pub async fn open(&self, role: CacheRole) -> Result<CacheHandle, Error> {
        let handle = self.handle(role);
        self.store.open_named(&handle.name).await?;
        Ok(handle)
    }

    fn handle(&self, role: CacheRole) -> CacheHandle {
        CacheHandle { store: self.store.clone(), name: self.generation.cache_name(role) }
    }

    /// First hit across the active generations.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<Response>, Error> {
        for role in CacheRole::ALL {
            if let Some(response) = self.handle(role).lookup(key).await? {
                tracing::debug!(role = %role, url = key.url(), "cache hit");
                return Ok(Some(response));
            }
        }
        tracing::debug!(url = key.url(), "cache miss");
        Ok(None)
    }

    /// Store a network response in the runtime generation.
    pub async fn put_runtime(&self, key: &CacheKey, response: &Response) -> Result<(), Error> {
        self.handle(CacheRole::Runtime).put(key, response).await
    }

    /// Fetch every manifest URL and store them in the static generation.
    ///
    /// All fetches must yield an ok response before anything is written; one
    /// failure aborts the install with the static cache untouched.
    pub async fn precache(&self, network: &dyn Network, manifest: &[Url]) -> Result<usize, Error> {
        let mut fetched = Vec::with_capacity(manifest.len());

        for url in manifest {
            let request = Request::get(url.clone());
            let response = network.send(&request).await.map_err(|e| Error::PrecacheFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            if !response.ok() {
                return Err(Error::PrecacheFailed {
                    url: url.to_string(),
                    reason: format!("status {}", response.status.as_u16()),
                });
            }
            fetched.push((CacheKey::get(url.as_str()), response));
        }

        let cache = self.open(CacheRole::Static).await?;
        for (key, response) in &fetched {
            cache.put(key, response).await?;
        }

        tracing::info!(cache = cache.name(), entries = fetched.len(), "pre-cached offline shell");
        Ok(fetched.len())
    }

    /// Delete every cache that is not an active generation.
    ///
    /// Deletion is best effort: a failed delete is logged and skipped.
    /// Returns the names actually deleted.
    pub async fn delete_stale(&self) -> Result<Vec<String>, Error> {
        let active = self.generation.active_names();
        let mut deleted = Vec::new();

        for name in self.store.cache_names().await? {
            if active.contains(&name) {
                continue;
            }
            match self.store.delete_cache(&name).await {
                Ok(true) => {
                    tracing::info!(cache = %name, "deleted stale cache generation");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(cache = %name, "failed to delete stale cache: {e}"),
            }
        }

        Ok(deleted)
    }

    /// Names of all caches in the store.
    pub async fn names(&self) -> Result<Vec<String>, Error> {
        self.store.cache_names().await
    }
}
