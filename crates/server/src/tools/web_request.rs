//! web_request tool implementation.
//!
//! Sends one request through the offline pipeline: cache, network, or the
//! outbox, depending on how the request classifies.

use offsync_client::{Lifecycle, OfflineWorker, Request, RequestMode, fetch::resolve};
use offsync_core::{Error, Method};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// A single header, order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HeaderParam {
    pub name: String,
    pub value: String,
}

/// Input parameters for web_request tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebRequestParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers in order. Repeated names are kept.
    #[serde(default)]
    pub headers: Vec<HeaderParam>,

    /// Request body.
    #[serde(default)]
    pub body: Option<String>,

    /// Treat the request as a top-level page load.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for web_request tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebRequestOutput {
    pub status: u16,
    pub headers: Vec<HeaderParam>,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
    /// One of: network, cache, offline-fallback, queued.
    pub served_from: String,
}

/// Implementation of the web_request tool.
pub async fn request_impl(worker: &OfflineWorker, params: WebRequestParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method: Method = params.method.parse()?;
    let url = resolve(&worker.settings().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::new(method, url);
    request.headers = params.headers.into_iter().map(|h| (h.name, h.value)).collect();
    if let Some(body) = params.body {
        request.body = body.into();
    }
    if params.navigate {
        request.mode = RequestMode::Navigate;
    }

    let served = worker.on_fetch(request).await?;

    let output = WebRequestOutput {
        status: served.response.status.as_u16(),
        headers: served
            .response
            .headers
            .iter()
            .map(|(name, value)| HeaderParam { name: name.clone(), value: value.clone() })
            .collect(),
        body: String::from_utf8_lossy(&served.response.body).into_owned(),
        served_from: served.from.as_str().to_string(),
    };

    json_result(&output)
}
