//! Materialized requests and responses.
//!
//! Bodies are fully read into [`Bytes`] before a request enters the
//! pipeline. Cloning a request or response clones a handle to the same
//! buffer, so one copy can go to the network or the caller while another is
//! persisted.

use bytes::Bytes;
use offsync_core::{CacheKey, Error, HeaderList, Method, ResponseSnapshot};
use reqwest::StatusCode;
use url::Url;

/// Headers that describe how one particular body was framed on the wire.
/// The HTTP client recomputes them for whatever body it actually sends.
const FRAMING_HEADERS: [&str; 4] = ["content-length", "transfer-encoding", "host", "connection"];

/// Copy of `headers` without framing headers, order otherwise kept.
pub fn strip_framing(headers: &HeaderList) -> HeaderList {
    headers
        .iter()
        .filter(|(name, _)| !FRAMING_HEADERS.iter().any(|f| name.eq_ignore_ascii_case(f)))
        .cloned()
        .collect()
}

/// How the request was issued by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    /// Subresource, API call, anything else.
    #[default]
    Other,
}

/// An outgoing request with its body already read.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderList,
    pub body: Bytes,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: Vec::new(), body: Bytes::new(), mode: RequestMode::Other }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// A top-level GET document load.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Cache identity, present only for GET.
    pub fn cache_key(&self) -> Option<CacheKey> {
        CacheKey::for_request(self.method, self.url.as_str())
    }
}

/// A response from the network, a cache, or synthesized locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderList,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Status in 200..=299.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// First header value with a case-insensitive name match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn to_snapshot(&self) -> ResponseSnapshot {
        ResponseSnapshot { status: self.status.as_u16(), headers: self.headers.clone(), body: self.body.to_vec() }
    }

    pub fn from_snapshot(snapshot: ResponseSnapshot) -> Result<Self, Error> {
        let status = StatusCode::from_u16(snapshot.status)
            .map_err(|_| Error::Codec(format!("invalid stored status {}", snapshot.status)))?;
        Ok(Self { status, headers: snapshot.headers, body: Bytes::from(snapshot.body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("http://localhost:8080").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_navigate_is_get() {
        let req = Request::navigate(url("/book.html"));
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.mode, RequestMode::Navigate);
        assert!(req.cache_key().is_some());
    }

    #[test]
    fn test_cache_key_get_only() {
        let req = Request::new(Method::Post, url("/api/notes")).with_body(r#"{"title":"x"}"#);
        assert!(req.cache_key().is_none());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let res = Response::new(StatusCode::OK, "").with_header("Content-Type", "text/html");
        assert_eq!(res.header("content-type"), Some("text/html"));
        assert_eq!(res.header("etag"), None);
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_bytes() {
        let res = Response::new(StatusCode::CREATED, vec![0u8, 159, 146, 150]).with_header("x-a", "1");
        let back = Response::from_snapshot(res.to_snapshot()).unwrap();
        assert_eq!(back, res);
    }

    #[test]
    fn test_from_snapshot_rejects_bad_status() {
        let snapshot = ResponseSnapshot { status: 42, headers: Vec::new(), body: Vec::new() };
        assert!(matches!(Response::from_snapshot(snapshot), Err(Error::Codec(_))));
    }

    #[test]
    fn test_strip_framing_keeps_order_and_duplicates() {
        let headers: HeaderList = vec![
            ("Content-Type".into(), "application/json".into()),
            ("Content-Length".into(), "14".into()),
            ("x-trace".into(), "a".into()),
            ("Host".into(), "localhost:8080".into()),
            ("transfer-encoding".into(), "chunked".into()),
            ("x-trace".into(), "b".into()),
        ];
        let kept = strip_framing(&headers);
        assert_eq!(
            kept,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("x-trace".to_string(), "a".to_string()),
                ("x-trace".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_ok_range() {
        assert!(Response::new(StatusCode::NO_CONTENT, "").ok());
        assert!(!Response::new(StatusCode::NOT_FOUND, "").ok());
        assert!(!Response::new(StatusCode::SERVICE_UNAVAILABLE, "").ok());
    }
}
