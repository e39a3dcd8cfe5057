//! Router configuration and server setup.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Creates the router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let magnet_route = state.config.magnet_route();

    Router::new()
        .route("/health", get(handlers::health))
        .route(&magnet_route, get(handlers::resolve_magnet))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the server on the configured address.
pub async fn serve(state: AppState) -> Result<(), std::io::Error> {
    let addr = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, route = %state.config.magnet_route(), "HTTP server listening");
    axum::serve(listener, create_router(state)).await
}
