//! Request classification.

use crate::request::{Request, RequestMode};
use offsync_core::Method;

/// How an intercepted request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Top-level document load: network first, offline page on failure.
    Navigation,
    /// Non-navigation GET: cache first, then network, then offline page.
    CacheableRead,
    /// POST/PUT/DELETE: network, queued in the outbox on failure.
    Mutation,
    /// Any other method: network only.
    Passthrough,
}

pub fn classify(request: &Request) -> RequestClass {
    if request.mode == RequestMode::Navigate {
        RequestClass::Navigation
    } else if request.method == Method::Get {
        RequestClass::CacheableRead
    } else if request.method.is_mutating() {
        RequestClass::Mutation
    } else {
        RequestClass::Passthrough
    }
}
