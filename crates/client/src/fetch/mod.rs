//! Network seam for the offline pipeline.
//!
//! ### Failure classes
//! - A [`NetworkError`] means no usable response was obtained: the host is
//!   unreachable, the request timed out, or the body exceeded the size cap.
//!   Reads fall back to the cache on any of them. Mutations are queued only
//!   when [`NetworkError::is_connectivity`] holds: an oversized body still
//!   carries the status the server answered with, and a request that could
//!   not be built will never send.
//! - Any HTTP status, including 4xx/5xx, is a successful `send` and is passed
//!   through to the caller.
//!
//! ### HTTP client
//! - rustls, gzip/brotli/deflate, limited redirects (default 5)
//! - Request timeout and max body bytes from configuration

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::request::{Request, Response, strip_framing};
use offsync_core::{AppConfig, Error, Method};

pub use self::url::{UrlError, resolve};

/// Errors that leave the caller without a response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// Connection could not be established or was dropped.
    #[error("network unreachable: {0}")]
    Unreachable(String),

    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Response body exceeded the configured limit. The server did answer,
    /// with `status`.
    #[error("response too large: {size} bytes exceeds {limit} (status {status})")]
    TooLarge { status: StatusCode, size: usize, limit: usize },

    /// Request could not be built (bad header, unsupported URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl NetworkError {
    /// The request never reached a server.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, NetworkError::Unreachable(_) | NetworkError::Timeout)
    }

    /// Status the server answered with before the body was rejected.
    pub fn answered_status(&self) -> Option<StatusCode> {
        match self {
            NetworkError::TooLarge { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_builder() {
            NetworkError::InvalidRequest(err.to_string())
        } else {
            NetworkError::Unreachable(err.to_string())
        }
    }
}

/// Anything that can deliver a request and return a response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offsync/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offsync/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn send(&self, request: &Request) -> Result<Response, NetworkError> {
        let start = Instant::now();

        let mut builder = self.http.request(to_reqwest_method(request.method), request.url.clone());
        for (name, value) in strip_framing(&request.headers) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge { status, size: len as usize, limit: self.config.max_bytes });
        }

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        let body = response.bytes().await?;
        if body.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge { status, size: body.len(), limit: self.config.max_bytes });
        }

        tracing::debug!(
            "{} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// True once `raw` holds the head and the body its content-length announces.
    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.trim().eq_ignore_ascii_case("content-length") { value.trim().parse::<usize>().ok() } else { None }
            })
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    /// Answer one connection with `reply`. The handle yields the raw request.
    async fn serve_once(reply: Vec<u8>) -> (::url::Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut seen = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&seen) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
            }
            socket.write_all(&reply).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&seen).into_owned()
        });
        (::url::Url::parse(&format!("http://{addr}/api/notes")).unwrap(), handle)
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "offsync/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test/1".into(), timeout_ms: 500, max_bytes: 1024, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.max_bytes, 1024);
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest_method(Method::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn test_http_network_new() {
        assert!(HttpNetwork::new(FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let network = HttpNetwork::new(FetchConfig { timeout: Duration::from_millis(500), ..Default::default() }).unwrap();
        // Port 9 on loopback has no listener in test environments.
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/").unwrap());
        let err = network.send(&request).await.unwrap_err();
        assert!(matches!(err, NetworkError::Unreachable(_) | NetworkError::Timeout));
    }

    #[tokio::test]
    async fn test_oversized_body_keeps_status() {
        let mut reply = b"HTTP/1.1 201 Created\r\nContent-Length: 2048\r\nConnection: close\r\n\r\n".to_vec();
        reply.extend(std::iter::repeat_n(b'a', 2048));
        let (url, server) = serve_once(reply).await;

        let network = HttpNetwork::new(FetchConfig { max_bytes: 1024, ..Default::default() }).unwrap();
        let err = network
            .send(&Request::new(Method::Post, url).with_body(r#"{"title":"x"}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, NetworkError::TooLarge { size: 2048, limit: 1024, .. }));
        assert_eq!(err.answered_status(), Some(StatusCode::CREATED));
        assert!(!err.is_connectivity());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_content_length_is_recomputed() {
        let reply = b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec();
        let (url, server) = serve_once(reply).await;

        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let request = Request::new(Method::Post, url)
            .with_header("content-type", "application/json")
            .with_header("content-length", "14")
            .with_body(r#"{"title":"x"}"#);
        let response = network.send(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);

        let seen = server.await.unwrap().to_ascii_lowercase();
        assert!(seen.contains("content-length: 13"), "{seen}");
        assert!(!seen.contains("content-length: 14"), "{seen}");
        assert!(seen.ends_with(r#"{"title":"x"}"#));
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_not_connectivity() {
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();
        let request =
            Request::new(Method::Post, ::url::Url::parse("http://127.0.0.1:9/").unwrap()).with_header("bad header", "x");
        let err = network.send(&request).await.unwrap_err();
        assert!(matches!(err, NetworkError::InvalidRequest(_)));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_connectivity_classes() {
        assert!(NetworkError::Unreachable("refused".into()).is_connectivity());
        assert!(NetworkError::Timeout.is_connectivity());
        assert_eq!(NetworkError::Timeout.answered_status(), None);
    }
}
