use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::endpoints::Endpoints;

pub mod routes;

/// Server state
pub struct AppState {
    pub endpoints: Arc<Endpoints>,
}

/// Build the router; `static_dir` is served for any path not under `/api`
pub fn create_router(state: Arc<AppState>, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api", get(routes::list_endpoints))
        .route(
            "/api/{name}",
            get(routes::get_endpoint).post(routes::post_endpoint),
        )
        .route("/cache/clear", post(routes::clear_cache))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(
    port: u16,
    endpoints: Arc<Endpoints>,
    static_dir: PathBuf,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState { endpoints });
    let app = create_router(state, static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
