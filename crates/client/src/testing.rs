//! Fakes shared by the pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use offsync_core::{Error, Method};
use reqwest::StatusCode;
use url::Url;

use crate::fetch::{Network, NetworkError};
use crate::notify::{Notification, Notifier};
use crate::request::{Request, Response};
use crate::sync::SyncRegistrar;

pub const ORIGIN: &str = "http://localhost:8080";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Route-table network that can be switched offline or made to fail.
pub struct FakeNetwork {
    online: AtomicBool,
    failures_left: AtomicUsize,
    routes: Mutex<HashMap<(Method, String), Result<Response, NetworkError>>>,
    seen: Mutex<Vec<Request>>,
}

impl FakeNetwork {
    pub fn online() -> Self {
        Self {
            online: AtomicBool::new(true),
            failures_left: AtomicUsize::new(0),
            routes: Mutex::new(HashMap::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn offline() -> Self {
        let network = Self::online();
        network.set_online(false);
        network
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Fail the next `n` sends with a network error, then behave normally.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn route(&self, method: Method, path: &str, response: Response) -> &Self {
        self.routes.lock().unwrap().insert((method, path.to_string()), Ok(response));
        self
    }

    /// Answer `method path` with `error` while online.
    pub fn route_error(&self, method: Method, path: &str, error: NetworkError) -> &Self {
        self.routes.lock().unwrap().insert((method, path.to_string()), Err(error));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn send(&self, request: &Request) -> Result<Response, NetworkError> {
        self.seen.lock().unwrap().push(request.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable("offline".into()));
        }
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(NetworkError::Unreachable("flaky".into()));
        }

        let routes = self.routes.lock().unwrap();
        routes
            .get(&(request.method, request.url.path().to_string()))
            .cloned()
            .unwrap_or_else(|| Ok(Response::new(StatusCode::NOT_FOUND, "not found")))
    }
}

#[derive(Default)]
pub struct RecordingRegistrar {
    pub tags: Mutex<Vec<String>>,
    pub refuse: AtomicBool,
}

#[async_trait]
impl SyncRegistrar for RecordingRegistrar {
    async fn register(&self, tag: &str) -> Result<(), Error> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Error::Registration("background sync unavailable".into()));
        }
        self.tags.lock().unwrap().push(tag.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub shown: Mutex<Vec<(String, Notification)>>,
}

impl Notifier for RecordingNotifier {
    fn show(&self, title: &str, notification: Notification) {
        self.shown.lock().unwrap().push((title.to_string(), notification));
    }
}

pub fn html(body: &str) -> Response {
    Response::new(StatusCode::OK, body.to_string()).with_header("content-type", "text/html")
}

pub fn json(status: StatusCode, body: &str) -> Response {
    Response::new(status, body.to_string()).with_header("content-type", "application/json")
}
