//! Outbox replay.
//!
//! One run walks the outbox once, in id order, one entry at a time. An ok
//! response deletes the entry; a network failure or non-ok status leaves it
//! queued and the run moves on. A server that answers with a body too large
//! to read still answered: its status decides the outcome. Entries that can
//! never be sent (unparseable URL, headers the HTTP client rejects) stay in
//! the outbox for inspection and are counted apart from retryable ones. A run never retries an entry or reorders
//! the queue, so delivery is at-least-once: if a delete fails after a
//! successful send, the next run sends the entry again.

use std::sync::Arc;

use bytes::Bytes;
use offsync_core::{Error, OutboxEntry, OutboxStore};
use serde::Serialize;
use url::Url;

use crate::fetch::{Network, NetworkError};
use crate::request::{Request, RequestMode, strip_framing};

/// Outcome of one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Entries sent to the network.
    pub attempted: usize,
    /// Entries confirmed and deleted.
    pub delivered: usize,
    /// Entries that failed this run and stay queued.
    pub retained: usize,
    /// Entries that cannot be sent as stored. Kept, but retrying will not help.
    pub unsendable: usize,
    /// Entries skipped because they reached the attempt cap.
    pub parked: usize,
}

impl ReplayReport {
    /// Entries still in the outbox after this run.
    pub fn remaining(&self) -> usize {
        self.retained + self.parked + self.unsendable
    }
}

/// Drains the outbox against the network.
pub struct Replayer {
    network: Arc<dyn Network>,
    outbox: Arc<dyn OutboxStore>,
    max_attempts: Option<u32>,
}

impl Replayer {
    /// `max_attempts: None` retries every entry on every run, forever.
    pub fn new(network: Arc<dyn Network>, outbox: Arc<dyn OutboxStore>, max_attempts: Option<u32>) -> Self {
        Self { network, outbox, max_attempts }
    }

    /// Attempt every queued entry once.
    ///
    /// # Errors
    ///
    /// Store failures while listing or deleting abort the run. Entries not
    /// yet processed stay queued for the next trigger.
    pub async fn run(&self) -> Result<ReplayReport, Error> {
        let entries = self.outbox.list_all().await?;
        let mut report = ReplayReport::default();

        for entry in entries {
            if self.max_attempts.is_some_and(|max| entry.attempts >= max) {
                tracing::debug!(id = entry.id, attempts = entry.attempts, "skipping parked outbox entry");
                report.parked += 1;
                continue;
            }

            let request = match rebuild(&entry) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(id = entry.id, "outbox entry cannot be rebuilt: {e}");
                    self.note_failure(entry.id, &e.to_string()).await;
                    report.unsendable += 1;
                    continue;
                }
            };

            report.attempted += 1;
            let status = match self.network.send(&request).await {
                Ok(response) => response.status,
                Err(NetworkError::InvalidRequest(reason)) => {
                    tracing::warn!(id = entry.id, "outbox entry cannot be sent: {reason}");
                    self.note_failure(entry.id, &format!("invalid request: {reason}")).await;
                    report.unsendable += 1;
                    continue;
                }
                Err(e) => match e.answered_status() {
                    Some(status) => status,
                    None => {
                        tracing::debug!(id = entry.id, "delivery failed: {e}");
                        self.note_failure(entry.id, &e.to_string()).await;
                        report.retained += 1;
                        continue;
                    }
                },
            };

            if status.is_success() {
                self.outbox.delete_by_id(entry.id).await?;
                tracing::debug!(id = entry.id, status = status.as_u16(), "delivered outbox entry");
                report.delivered += 1;
            } else {
                let failure = format!("status {}", status.as_u16());
                tracing::debug!(id = entry.id, "delivery failed: {failure}");
                self.note_failure(entry.id, &failure).await;
                report.retained += 1;
            }
        }

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            retained = report.retained,
            unsendable = report.unsendable,
            parked = report.parked,
            "outbox replay finished"
        );
        Ok(report)
    }

    async fn note_failure(&self, id: i64, reason: &str) {
        if let Err(e) = self.outbox.record_failure(id, reason).await {
            tracing::warn!(id, "could not record delivery failure: {e}");
        }
    }
}

/// Reconstruct the request captured at enqueue time.
///
/// Framing headers are dropped: JSON bodies are re-serialized, so a stored
/// content-length may not match the bytes sent now.
fn rebuild(entry: &OutboxEntry) -> Result<Request, Error> {
    let url = Url::parse(&entry.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", entry.url)))?;
    Ok(Request {
        method: entry.method,
        url,
        headers: strip_framing(&entry.headers),
        body: Bytes::from(entry.body.to_wire()?),
        mode: RequestMode::Other,
    })
}
