//! Offline request pipeline for offsync.
//!
//! This crate decides how each outgoing request is answered when the
//! network may be missing: from the cache, from the network with the
//! response mirrored into the cache, or by queueing a mutation in a durable
//! outbox that is replayed once connectivity returns.

pub mod cache;
pub mod classify;
pub mod fetch;
pub mod notify;
pub mod refresh;
pub mod replay;
pub mod request;
pub mod responder;
pub mod sync;
pub mod wait;
pub mod worker;

#[cfg(test)]
mod testing;

pub use cache::{CacheHandle, CacheManager, CacheRole, Generation};
pub use classify::{RequestClass, classify};
pub use fetch::{FetchConfig, HttpNetwork, Network, NetworkError};
pub use notify::{LogNotifier, Notification, Notifier};
pub use refresh::{RefreshOutcome, Refresher};
pub use replay::{ReplayReport, Replayer};
pub use request::{Request, RequestMode, Response};
pub use responder::{QUEUED_ACK, Responder, Served, ServedFrom, queued_ack};
pub use sync::{PERIODIC_REFRESH_TAG, SYNC_OUTBOX_TAG, SyncRegistrar};
pub use reqwest::StatusCode;
pub use wait::WaitUntil;
pub use worker::{Collaborators, Lifecycle, OfflineWorker, WorkerSettings};
