//! Read-only JSON render API
//!
//! Exposes the render-time reads to a content host over HTTP:
//! - `GET /components`
//! - `GET /components/{handle}/fields`
//! - `GET /content/{id}` (every placement, resolved)
//! - `GET /content/{id}/components/{handle}?instance=...`
//! - `GET /stats`

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod routes;

/// Server state
pub struct AppState {
    pub database_path: PathBuf,
}

pub fn router(database_path: PathBuf) -> Router {
    let state = Arc::new(AppState { database_path });

    Router::new()
        .route("/components", get(routes::list_components))
        .route("/components/{handle}/fields", get(routes::component_fields))
        .route("/content/{id}", get(routes::render_content))
        .route("/content/{id}/components/{handle}", get(routes::resolved_fields))
        .route("/stats", get(routes::get_stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, database_path: PathBuf) -> anyhow::Result<()> {
    let app = router(database_path);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
