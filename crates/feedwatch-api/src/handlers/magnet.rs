//! Magnet redirect handler.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::error::Result;
use crate::state::AppState;

/// GET /magnet/:id/:type_label - Redirect to the variant's magnet URI.
///
/// Path segments arrive percent-decoded, so `WEBRip%201080p` is matched as
/// `WEBRip 1080p`.
pub async fn resolve_magnet(
    State(state): State<AppState>,
    Path((id, type_label)): Path<(String, String)>,
) -> Result<Response> {
    let magnet = state.resolver.resolve(&id, &type_label).await?;
    info!(id = %id, type_label = %type_label, "Redirecting to magnet");

    Ok((StatusCode::FOUND, [(header::LOCATION, magnet)]).into_response())
}
