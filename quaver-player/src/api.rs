//! HTTP surface for the player process
//!
//! Read-only: liveness plus snapshots of the authoritative playback
//! state. All control flows in through the bridge, never through HTTP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::coordinator::{PlaybackCoordinator, PlaybackState};

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub coordinator: PlaybackCoordinator,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

/// Build the player router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(all_states))
        .route("/state/:chat_id", get(chat_state))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "quaver-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /state - All active sessions
pub async fn all_states(State(ctx): State<AppContext>) -> Json<Vec<PlaybackState>> {
    Json(ctx.coordinator.snapshot().await)
}

/// GET /state/:chat_id - One chat's session, 404 when idle
pub async fn chat_state(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
) -> Result<Json<PlaybackState>, (StatusCode, Json<StatusResponse>)> {
    match ctx.coordinator.state_for(chat_id).await {
        Some(state) => Ok(Json(state)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(StatusResponse {
                status: format!("no active session for chat {}", chat_id),
            }),
        )),
    }
}
