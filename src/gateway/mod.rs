//! HTTP gateway: the `/api/upload` relay endpoint.

pub mod upload;

use crate::providers::StreamInvoker;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

/// Transport-level body cap. Far above the 4 MiB per-file limit so the
/// handler gets to reject oversized files with the specific error message;
/// this only defends against unbounded bodies.
const TRANSPORT_BODY_CAP: usize = 64 * 1024 * 1024;

/// Everything a request handler needs, built once at startup. The invoker
/// is behind a trait object so tests can substitute a scripted one.
#[derive(Clone)]
pub struct AppState {
    pub invoker: Arc<dyn StreamInvoker>,
    pub spool_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/upload", post(upload::upload))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(TRANSPORT_BODY_CAP))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(port: u16, state: AppState) -> Result<()> {
    let app = router(state);
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("relay listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("server error")
}
