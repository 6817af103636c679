//! Host-side signal sources.
//!
//! Stands in for the platform scheduler: sync registrations arrive over a
//! channel and are held until a HEAD request reaches the origin, then fire the
//! connectivity-restored trigger once per pending tag. A separate timer
//! fires the scheduled-sync trigger.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use offsync_client::{Lifecycle, Network, OfflineWorker, PERIODIC_REFRESH_TAG, Request, SYNC_OUTBOX_TAG, SyncRegistrar};
use offsync_core::{Error, Method};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use url::Url;

/// Registrar that forwards tags to [`watch_connectivity`].
#[derive(Debug, Clone)]
pub struct ChannelRegistrar {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl SyncRegistrar for ChannelRegistrar {
    async fn register(&self, tag: &str) -> Result<(), Error> {
        self.tx
            .send(tag.to_string())
            .map_err(|_| Error::Registration("connectivity watcher stopped".into()))
    }
}

pub fn channel() -> (ChannelRegistrar, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelRegistrar { tx }, rx)
}

/// Any HTTP response from the origin counts as connectivity.
async fn reachable(network: &dyn Network, origin: &Url) -> bool {
    network.send(&Request::new(Method::Head, origin.clone())).await.is_ok()
}

/// Hold sync registrations until the origin answers, then fire them.
///
/// Pending tags are deduplicated. A tag stays armed while its handler fails
/// or leaves retained entries behind. Parked and unsendable entries do not
/// re-arm it.
/// Entries left in the outbox at startup get a registration of their own
/// so a restart does not strand them.
pub async fn watch_connectivity(
    worker: Arc<OfflineWorker>, network: Arc<dyn Network>, origin: Url, every: Duration,
    mut registrations: mpsc::UnboundedReceiver<String>,
) {
    let mut pending = BTreeSet::new();
    match worker.pending().await {
        Ok(entries) if !entries.is_empty() => {
            tracing::info!(entries = entries.len(), "outbox not empty at startup");
            pending.insert(SYNC_OUTBOX_TAG.to_string());
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("could not inspect outbox at startup: {e}"),
    }

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            tag = registrations.recv() => match tag {
                Some(tag) => {
                    pending.insert(tag);
                }
                None => break,
            },
            _ = ticker.tick(), if !pending.is_empty() => {
                if !reachable(network.as_ref(), &origin).await {
                    tracing::debug!(pending = pending.len(), "origin still unreachable");
                    continue;
                }
                for tag in std::mem::take(&mut pending) {
                    match worker.on_connectivity_restored(&tag).await {
                        Ok(Some(report)) if report.retained > 0 => {
                            tracing::info!(tag = %tag, retained = report.retained, "entries left behind, re-arming");
                            pending.insert(tag);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(tag = %tag, "connectivity handler failed: {e}");
                            pending.insert(tag);
                        }
                    }
                }
            }
        }
    }

    tracing::debug!("connectivity watcher stopped");
}

/// Fire the scheduled-sync trigger every `every`, starting one period in.
pub async fn run_schedule(worker: Arc<OfflineWorker>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = worker.on_scheduled_sync(PERIODIC_REFRESH_TAG).await {
            tracing::warn!("scheduled sync failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{FlakyNetwork, worker_with};

    #[tokio::test]
    async fn test_channel_registrar_forwards() {
        let (registrar, mut rx) = channel();
        registrar.register(SYNC_OUTBOX_TAG).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some(SYNC_OUTBOX_TAG));
    }

    #[tokio::test]
    async fn test_channel_registrar_closed() {
        let (registrar, rx) = channel();
        drop(rx);
        assert!(matches!(registrar.register(SYNC_OUTBOX_TAG).await, Err(Error::Registration(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_replays_when_origin_returns() {
        let network = Arc::new(FlakyNetwork::default());
        let (worker, _rx) = worker_with(network.clone());
        let worker = Arc::new(worker);

        network.set_online(false);
        let request = Request::new(Method::Post, Url::parse("http://localhost:8080/api/notes").unwrap()).with_body("{}");
        worker.on_fetch(request).await.unwrap();
        assert_eq!(worker.pending().await.unwrap().len(), 1);

        let (registrar, rx) = channel();
        let origin = worker.settings().origin.clone();
        let watcher = tokio::spawn(watch_connectivity(
            worker.clone(),
            network.clone(),
            origin,
            Duration::from_secs(15),
            rx,
        ));
        registrar.register(SYNC_OUTBOX_TAG).await.unwrap();

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(worker.pending().await.unwrap().len(), 1);

        network.set_online(true);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(worker.pending().await.unwrap().is_empty());

        drop(registrar);
        watcher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_stops_when_registrar_dropped() {
        let network = Arc::new(FlakyNetwork::default());
        let (worker, _rx) = worker_with(network.clone());
        let (registrar, rx) = channel();
        let origin = worker.settings().origin.clone();
        let watcher = tokio::spawn(watch_connectivity(Arc::new(worker), network, origin, Duration::from_secs(1), rx));

        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(registrar);
        watcher.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_does_not_rearm_for_unsendable_entry() {
        let network = Arc::new(FlakyNetwork::default());
        let (worker, _rx) = worker_with(network.clone());
        let worker = Arc::new(worker);

        network.set_online(false);
        let request = Request::new(Method::Post, Url::parse("http://localhost:8080/api/poison").unwrap()).with_body("{}");
        worker.on_fetch(request).await.unwrap();
        network.set_online(true);
        network.reject("/api/poison");

        let (registrar, rx) = channel();
        let origin = worker.settings().origin.clone();
        let watcher = tokio::spawn(watch_connectivity(
            worker.clone(),
            network.clone(),
            origin,
            Duration::from_secs(15),
            rx,
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        let after_first_run = network.calls();
        assert_eq!(worker.pending().await.unwrap()[0].attempts, 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(network.calls(), after_first_run);
        assert_eq!(worker.pending().await.unwrap().len(), 1);

        drop(registrar);
        watcher.await.unwrap();
    }
}
