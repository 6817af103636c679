//! Answering intercepted requests.
//!
//! | Class | Order | On network failure |
//! |-------|-------|--------------------|
//! | Navigation | network | offline page |
//! | Cacheable read | cache, then network | offline page |
//! | Mutation | network | queue in outbox, synthesize ack |
//! | Passthrough | network | error |
//!
//! HTTP error statuses are responses, not failures: they are returned to the
//! caller unchanged and never trigger fallback or queueing. A mutation is
//! queued only when it never reached a server; if the server answered with a
//! body too large to keep, its status is passed through with an empty body.
//! A request that cannot be built is rejected with `Error::InvalidInput` in
//! every class. Ok network
//! responses to GETs are mirrored into the runtime cache in the background;
//! the caller gets its response before that write finishes.

use std::sync::Arc;

use bytes::Bytes;
use offsync_core::{CacheKey, Error, NewOutboxEntry, OutboxStore, QueuedBody};
use reqwest::StatusCode;

use crate::cache::CacheManager;
use crate::classify::{RequestClass, classify};
use crate::fetch::{Network, NetworkError};
use crate::request::{Request, Response, strip_framing};
use crate::sync::{SYNC_OUTBOX_TAG, SyncRegistrar};
use crate::wait::WaitUntil;

/// Body of the acknowledgment returned for a queued mutation.
pub const QUEUED_ACK: &str = r#"{"queued":true,"offline":true}"#;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Network,
    Cache,
    OfflineFallback,
    /// Provisional acknowledgment for a mutation parked in the outbox.
    Queued,
}

impl ServedFrom {
    pub fn as_str(self) -> &'static str {
        match self {
            ServedFrom::Network => "network",
            ServedFrom::Cache => "cache",
            ServedFrom::OfflineFallback => "offline-fallback",
            ServedFrom::Queued => "queued",
        }
    }
}

/// A response and its source.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub from: ServedFrom,
}

impl Served {
    fn new(response: Response, from: ServedFrom) -> Self {
        Self { response, from }
    }
}

/// The acknowledgment returned in place of the server response for a
/// queued mutation.
pub fn queued_ack() -> Response {
    Response::new(StatusCode::OK, Bytes::from_static(QUEUED_ACK.as_bytes()))
        .with_header("content-type", "application/json")
}

/// Request classifier and responder.
pub struct Responder {
    network: Arc<dyn Network>,
    caches: CacheManager,
    outbox: Arc<dyn OutboxStore>,
    registrar: Arc<dyn SyncRegistrar>,
    background: Arc<WaitUntil>,
    offline_page: CacheKey,
}

impl Responder {
    pub fn new(
        network: Arc<dyn Network>, caches: CacheManager, outbox: Arc<dyn OutboxStore>,
        registrar: Arc<dyn SyncRegistrar>, background: Arc<WaitUntil>, offline_page: CacheKey,
    ) -> Self {
        Self { network, caches, outbox, registrar, background, offline_page }
    }

    /// Produce exactly one response for `request`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` for a request the HTTP client cannot build.
    /// - `Error::Network` for a passthrough request the network could not
    ///   deliver.
    /// - `Error::OfflineUnavailable` when a read misses everywhere and the
    ///   offline page is not cached either.
    /// - Store errors from cache reads or the outbox append.
    pub async fn respond(&self, request: Request) -> Result<Served, Error> {
        let class = classify(&request);
        tracing::debug!(method = %request.method, url = %request.url, ?class, "intercepted request");

        match class {
            RequestClass::Navigation => self.network_first(request).await,
            RequestClass::CacheableRead => self.cache_first(request).await,
            RequestClass::Mutation => self.deliver_or_queue(request).await,
            RequestClass::Passthrough => {
                let response = self.network.send(&request).await.map_err(|e| match e {
                    NetworkError::InvalidRequest(reason) => Error::InvalidInput(reason),
                    other => Error::Network(other.to_string()),
                })?;
                Ok(Served::new(response, ServedFrom::Network))
            }
        }
    }

    async fn network_first(&self, request: Request) -> Result<Served, Error> {
        match self.network.send(&request).await {
            Ok(response) => {
                self.mirror(&request, &response);
                Ok(Served::new(response, ServedFrom::Network))
            }
            Err(NetworkError::InvalidRequest(reason)) => Err(Error::InvalidInput(reason)),
            Err(e) => {
                tracing::debug!(url = %request.url, "navigation failed: {e}");
                self.offline_fallback(&request).await
            }
        }
    }

    async fn cache_first(&self, request: Request) -> Result<Served, Error> {
        if let Some(key) = request.cache_key()
            && let Some(cached) = self.caches.lookup(&key).await?
        {
            return Ok(Served::new(cached, ServedFrom::Cache));
        }

        match self.network.send(&request).await {
            Ok(response) => {
                self.mirror(&request, &response);
                Ok(Served::new(response, ServedFrom::Network))
            }
            Err(NetworkError::InvalidRequest(reason)) => Err(Error::InvalidInput(reason)),
            Err(e) => {
                tracing::debug!(url = %request.url, "read failed: {e}");
                self.offline_fallback(&request).await
            }
        }
    }

    async fn deliver_or_queue(&self, request: Request) -> Result<Served, Error> {
        match self.network.send(&request).await {
            Ok(response) => Ok(Served::new(response, ServedFrom::Network)),
            Err(e) if e.is_connectivity() => self.enqueue(request, e).await,
            Err(NetworkError::InvalidRequest(reason)) => Err(Error::InvalidInput(reason)),
            Err(e) => match e.answered_status() {
                Some(status) => {
                    tracing::warn!(
                        url = %request.url,
                        status = status.as_u16(),
                        "mutation delivered, response dropped: {e}"
                    );
                    Ok(Served::new(Response::new(status, Bytes::new()), ServedFrom::Network))
                }
                None => Err(Error::Network(e.to_string())),
            },
        }
    }

    async fn enqueue(&self, request: Request, cause: NetworkError) -> Result<Served, Error> {
        let entry = NewOutboxEntry::new(
            request.url.as_str(),
            request.method,
            strip_framing(&request.headers),
            QueuedBody::capture(&request.body),
        );
        let id = self.outbox.add(entry).await?;
        tracing::info!(id, method = %request.method, url = %request.url, "queued mutation: {cause}");

        if let Err(e) = self.registrar.register(SYNC_OUTBOX_TAG).await {
            tracing::warn!(id, "could not register connectivity sync: {e}");
        }

        Ok(Served::new(queued_ack(), ServedFrom::Queued))
    }

    async fn offline_fallback(&self, request: &Request) -> Result<Served, Error> {
        match self.caches.lookup(&self.offline_page).await? {
            Some(page) => Ok(Served::new(page, ServedFrom::OfflineFallback)),
            None => Err(Error::OfflineUnavailable(request.url.to_string())),
        }
    }

    /// Copy an ok GET response into the runtime cache without delaying the
    /// caller.
    fn mirror(&self, request: &Request, response: &Response) {
        let Some(key) = request.cache_key() else {
            return;
        };
        if !response.ok() {
            return;
        }

        let caches = self.caches.clone();
        let response = response.clone();
        self.background.spawn(async move {
            if let Err(e) = caches.put_runtime(&key, &response).await {
                tracing::warn!(url = key.url(), "runtime cache write failed: {e}");
            }
        });
    }
}
