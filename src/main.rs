//! railcache - serves cached live rail vehicle positions
//!
//! Polls the upstream GraphQL API in the background and answers
//! `GET /api/timetables` from memory, alongside the static frontend.

use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use railcache::cache::{SnapshotMirror, SnapshotStore};
use railcache::cli::{Cli, ServerConfig};
use railcache::data::TransitClient;
use railcache::refresh::{RefreshHandle, Refresher};
use railcache::server::{build_router, start_server};

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ServerConfig::from_cli(&cli)
        .unwrap_or_else(|err| Cli::command().error(ErrorKind::ValueValidation, err).exit());

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!(
        interval_secs = config.refresh.interval.as_secs(),
        timeout_secs = config.refresh.timeout.as_secs(),
        public_dir = %config.public_dir.display(),
        "railcache starting"
    );

    let client = TransitClient::with_endpoint(config.upstream_url.clone(), config.refresh.timeout)?;
    info!(upstream = %client.endpoint(), "polling upstream");

    let mut refresher = Refresher::new(client, Arc::new(SnapshotStore::new()), config.refresh.timeout);
    if let Some(path) = &config.mirror_file {
        info!(path = %path.display(), "mirroring snapshots to disk");
        refresher = refresher.with_mirror(SnapshotMirror::new(path.clone()));
    }
    let router = build_router(Arc::clone(refresher.store()), &config.public_dir);

    // First refresh runs immediately; requests before it completes get 503
    let refresh = RefreshHandle::spawn(Arc::new(refresher), config.refresh.interval);

    let served = start_server(config.addr, router, shutdown_signal()).await;

    refresh.shutdown().await;
    served?;

    info!("railcache stopped");
    Ok(())
}
