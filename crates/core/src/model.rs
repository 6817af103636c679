//! Request, response and outbox types shared by the stores and the pipeline.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::store::hash::compute_cache_key;

/// Ordered header snapshot. A flat list keeps duplicate header names intact.
pub type HeaderList = Vec<(String, String)>;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    /// Methods that are queued in the outbox when the network is unreachable.
    pub fn is_mutating(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "OPTIONS" => Ok(Method::Options),
            other => Err(Error::InvalidInput(format!("unsupported method: {other}"))),
        }
    }
}

/// Body of a queued mutation, captured once at enqueue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum QueuedBody {
    /// Body parsed as JSON.
    Json(serde_json::Value),
    /// Anything that did not parse as JSON, kept as text.
    Text(String),
}

impl QueuedBody {
    /// Capture a materialized request body: JSON when it parses, text otherwise.
    pub fn capture(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => QueuedBody::Json(value),
            Err(_) => QueuedBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Body as sent on replay. JSON is re-serialized; text goes out unchanged.
    pub fn to_wire(&self) -> Result<String, Error> {
        match self {
            QueuedBody::Json(value) => Ok(serde_json::to_string(value)?),
            QueuedBody::Text(text) => Ok(text.clone()),
        }
    }
}

/// A mutation waiting to be written to the outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewOutboxEntry {
    pub url: String,
    pub method: Method,
    pub headers: HeaderList,
    pub body: QueuedBody,
    pub queued_at: String,
}

impl NewOutboxEntry {
    pub fn new(url: impl Into<String>, method: Method, headers: HeaderList, body: QueuedBody) -> Self {
        Self { url: url.into(), method, headers, body, queued_at: chrono::Utc::now().to_rfc3339() }
    }
}

/// A persisted outbox entry.
///
/// `id` is assigned by the store, strictly increasing and never reused.
/// `attempts` and `last_error` are replay bookkeeping; the captured request
/// itself never changes after enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutboxEntry {
    pub id: i64,
    pub url: String,
    pub method: Method,
    pub headers: HeaderList,
    pub body: QueuedBody,
    pub queued_at: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl OutboxEntry {
    pub fn from_new(id: i64, entry: NewOutboxEntry) -> Self {
        Self {
            id,
            url: entry.url,
            method: entry.method,
            headers: entry.headers,
            body: entry.body,
            queued_at: entry.queued_at,
            attempts: 0,
            last_error: None,
        }
    }
}

/// Identity of a cached response. Only GET requests have one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    url: String,
}

impl CacheKey {
    /// Key for a GET of `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Key for an arbitrary request; `None` unless the method is GET.
    pub fn for_request(method: Method, url: &str) -> Option<Self> {
        (method == Method::Get).then(|| Self::get(url))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        Method::Get
    }

    /// Stable hex digest used as the storage key.
    pub fn digest(&self) -> String {
        compute_cache_key(self.method().as_str(), &self.url)
    }
}

/// Stored copy of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}
