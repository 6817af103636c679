//! Lifecycle entry points.
//!
//! A host adapter maps its platform events onto [`Lifecycle`]. The worker
//! holds no ambient state: every store, the network, and the host
//! facilities are handed in through [`Collaborators`].

use std::sync::Arc;

use async_trait::async_trait;
use offsync_core::{AppConfig, BlobCacheStore, CacheKey, Error, OutboxEntry, OutboxStore};
use url::Url;

use crate::cache::{CacheManager, Generation};
use crate::fetch::{Network, resolve};
use crate::notify::{self, Notifier};
use crate::refresh::{RefreshOutcome, Refresher};
use crate::replay::{ReplayReport, Replayer};
use crate::request::Request;
use crate::responder::{Responder, Served};
use crate::sync::{PERIODIC_REFRESH_TAG, SYNC_OUTBOX_TAG, SyncRegistrar};
use crate::wait::WaitUntil;

/// One handler per host trigger.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Pre-cache the offline shell. Fails if any manifest entry fails.
    async fn on_install(&self) -> Result<usize, Error>;

    /// Drop superseded cache generations. Returns the deleted names.
    async fn on_activate(&self) -> Result<Vec<String>, Error>;

    /// Answer an intercepted request.
    async fn on_fetch(&self, request: Request) -> Result<Served, Error>;

    /// Connectivity is back. `None` for tags this worker does not own.
    async fn on_connectivity_restored(&self, tag: &str) -> Result<Option<ReplayReport>, Error>;

    /// Scheduled sync fired. `None` for tags this worker does not own.
    async fn on_scheduled_sync(&self, tag: &str) -> Result<Option<RefreshOutcome>, Error>;

    /// Display a pushed message.
    async fn on_push(&self, payload: Option<&[u8]>) -> Result<(), Error>;
}

/// Resolved settings for a worker.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub origin: Url,
    pub generation: Generation,
    pub precache: Vec<Url>,
    pub offline_page: Url,
    pub periodic_resource: Url,
    pub replay_max_attempts: Option<u32>,
    pub notification_title: String,
    pub notification_icon: String,
}

impl WorkerSettings {
    /// Resolve every configured path against `origin`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let at = |path: &str| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        Ok(Self {
            generation: Generation::new(&config.cache_prefix, &config.cache_version),
            precache: config.precache.iter().map(|p| at(p)).collect::<Result<_, _>>()?,
            offline_page: at(&config.offline_page)?,
            periodic_resource: at(&config.periodic_resource)?,
            replay_max_attempts: config.replay_max_attempts,
            notification_title: config.notification_title.clone(),
            notification_icon: config.notification_icon.clone(),
            origin,
        })
    }
}

/// Injected dependencies.
#[derive(Clone)]
pub struct Collaborators {
    pub network: Arc<dyn Network>,
    pub outbox: Arc<dyn OutboxStore>,
    pub caches: Arc<dyn BlobCacheStore>,
    pub registrar: Arc<dyn SyncRegistrar>,
    pub notifier: Arc<dyn Notifier>,
}

/// The offline pipeline behind the lifecycle triggers.
pub struct OfflineWorker {
    settings: WorkerSettings,
    network: Arc<dyn Network>,
    outbox: Arc<dyn OutboxStore>,
    notifier: Arc<dyn Notifier>,
    caches: CacheManager,
    responder: Responder,
    replayer: Replayer,
    refresher: Refresher,
    background: Arc<WaitUntil>,
}

impl OfflineWorker {
    pub fn new(settings: WorkerSettings, deps: Collaborators) -> Self {
        let background = Arc::new(WaitUntil::new());
        let caches = CacheManager::new(deps.caches, settings.generation.clone());

        let responder = Responder::new(
            deps.network.clone(),
            caches.clone(),
            deps.outbox.clone(),
            deps.registrar,
            background.clone(),
            CacheKey::get(settings.offline_page.as_str()),
        );
        let replayer = Replayer::new(deps.network.clone(), deps.outbox.clone(), settings.replay_max_attempts);
        let refresher = Refresher::new(deps.network.clone(), caches.clone(), settings.periodic_resource.clone());

        Self {
            settings,
            network: deps.network,
            outbox: deps.outbox,
            notifier: deps.notifier,
            caches,
            responder,
            replayer,
            refresher,
            background,
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn caches(&self) -> &CacheManager {
        &self.caches
    }

    /// Current outbox contents, oldest first.
    pub async fn pending(&self) -> Result<Vec<OutboxEntry>, Error> {
        self.outbox.list_all().await
    }

    /// Wait for background work started by earlier events.
    pub async fn settled(&self) {
        self.background.settle().await;
    }
}

#[async_trait]
impl Lifecycle for OfflineWorker {
    async fn on_install(&self) -> Result<usize, Error> {
        tracing::info!(version = self.settings.generation.version(), "installing");
        self.caches.precache(self.network.as_ref(), &self.settings.precache).await
    }

    async fn on_activate(&self) -> Result<Vec<String>, Error> {
        let deleted = self.caches.delete_stale().await?;
        tracing::info!(version = self.settings.generation.version(), deleted = deleted.len(), "activated");
        Ok(deleted)
    }

    async fn on_fetch(&self, request: Request) -> Result<Served, Error> {
        self.responder.respond(request).await
    }

    async fn on_connectivity_restored(&self, tag: &str) -> Result<Option<ReplayReport>, Error> {
        if tag != SYNC_OUTBOX_TAG {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return Ok(None);
        }
        self.replayer.run().await.map(Some)
    }

    async fn on_scheduled_sync(&self, tag: &str) -> Result<Option<RefreshOutcome>, Error> {
        if tag != PERIODIC_REFRESH_TAG {
            tracing::debug!(tag, "ignoring unknown periodic sync tag");
            return Ok(None);
        }
        Ok(Some(self.refresher.run().await))
    }

    async fn on_push(&self, payload: Option<&[u8]>) -> Result<(), Error> {
        let (title, notification) =
            notify::from_push(payload, &self.settings.notification_title, &self.settings.notification_icon);
        self.notifier.show(&title, notification);
        Ok(())
    }
}
