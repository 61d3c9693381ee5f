// src/api/mod.rs

// HTTP surface of the orchestrator: submission, status polling, tool
// availability and a liveness probe.

pub mod handlers;
pub mod models;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ScannersConfig;
use crate::core::orchestrator::Orchestrator;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub scanners: Arc<ScannersConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/scans", post(handlers::create_scan))
        .route("/api/v1/scans/{id}", get(handlers::get_scan))
        .route("/api/v1/scanners", get(handlers::list_scanners))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the API until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "HTTP API listening.");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
