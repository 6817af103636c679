//! Core types and shared functionality for offsync.
//!
//! This crate provides:
//! - Request, response and outbox model types
//! - Durable store contracts with SQLite and in-memory backends
//! - Unified error types
//! - Layered configuration

pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{CacheKey, HeaderList, Method, NewOutboxEntry, OutboxEntry, QueuedBody, ResponseSnapshot};
pub use store::{BlobCacheStore, MemoryStore, OfflineDb, OutboxStore};
