//! Deferred completion for event handlers.
//!
//! A handler may hand its caller a result while work it started is still
//! running (for example a cache write mirroring a response that was already
//! returned). That work is spawned here, and the host awaits [`WaitUntil::settle`]
//! before treating the event as finished.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;

/// Tracks background tasks spawned on behalf of events.
#[derive(Debug, Default)]
pub struct WaitUntil {
    tasks: Mutex<JoinSet<()>>,
}

impl WaitUntil {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `task` in the background. Must be called inside a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(done) = tasks.try_join_next() {
            log_join(done);
        }
        tasks.spawn(task);
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every task spawned before this call.
    pub async fn settle(&self) {
        let mut tasks = std::mem::take(&mut *self.lock());
        while let Some(done) = tasks.join_next().await {
            log_join(done);
        }
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::warn!("background task did not complete: {e}");
    }
}
