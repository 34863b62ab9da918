//! HTTP server assembly and lifecycle
//!
//! [`build_router`] mounts the timetables endpoint and serves every other path
//! from the public asset directory. [`start_server`] binds and runs it until
//! the shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, TIMETABLES_PATH};
use crate::cache::SnapshotStore;

/// Errors that can occur when starting or running the server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The server hit a fatal I/O error while serving
    #[error("serve error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Builds the complete router
///
/// - `GET /api/timetables` -- the cached snapshot
/// - anything else -- static files under `public_dir`
pub fn build_router(store: Arc<SnapshotStore>, public_dir: &Path) -> Router {
    Router::new()
        .route(TIMETABLES_PATH, get(api::get_timetables))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// Binds `addr` and serves `router` until `shutdown` resolves
///
/// In-flight requests are allowed to finish after `shutdown` fires.
pub async fn start_server<F>(addr: SocketAddr, router: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    let local_addr = listener.local_addr().unwrap_or(addr);
    info!(addr = %local_addr, "server running at http://{local_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}
