//! offsync server entry point.
//!
//! Boots the offline worker against the configured origin, starts the
//! host signal sources, and serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use offsync_client::{
    CacheRole, Collaborators, FetchConfig, HttpNetwork, Lifecycle, LogNotifier, Network, OfflineWorker, WorkerSettings,
};
use offsync_core::{AppConfig, CacheKey, OfflineDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(origin = %config.origin, version = %config.cache_version, "starting offsync on stdio transport");

    let db = Arc::new(
        OfflineDb::open(&config.db_path)
            .await
            .with_context(|| format!("opening {}", config.db_path.display()))?,
    );
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
    let (registrar, registrations) = host::channel();

    let settings = WorkerSettings::from_config(&config)?;
    let origin = settings.origin.clone();
    let worker = Arc::new(OfflineWorker::new(
        settings,
        Collaborators {
            network: network.clone(),
            outbox: db.clone(),
            caches: db,
            registrar: Arc::new(registrar),
            notifier: Arc::new(LogNotifier),
        },
    ));

    if install(&worker).await? {
        worker.on_activate().await?;
    }

    tokio::spawn(host::watch_connectivity(
        worker.clone(),
        network,
        origin,
        config.sync_check_interval(),
        registrations,
    ));
    tokio::spawn(host::run_schedule(worker.clone(), config.periodic_interval()));

    let handler = handler::OffsyncServer::new(worker.clone());
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    worker.settled().await;
    tracing::info!("offsync stopped");

    Ok(())
}

/// Run the install trigger. Returns whether activation should follow.
///
/// A failed install is fatal unless this version was installed on an
/// earlier run, in which case the existing static cache keeps serving.
async fn install(worker: &OfflineWorker) -> Result<bool> {
    match worker.on_install().await {
        Ok(count) => {
            tracing::info!(count, "precache complete");
            Ok(true)
        }
        Err(e) => {
            let offline_page = CacheKey::get(worker.settings().offline_page.as_str());
            let installed = worker
                .caches()
                .open(CacheRole::Static)
                .await?
                .lookup(&offline_page)
                .await?
                .is_some();
            if !installed {
                return Err(e).context("install failed and no earlier install of this version exists");
            }
            tracing::warn!("install failed, keeping the previous install of this version: {e}");
            Ok(false)
        }
    }
}
