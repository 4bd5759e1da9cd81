//! HTTP command surface for the intake process
//!
//! Delivers validated `(chat_id, user_id, args)` tuples to the controller
//! and renders textual status replies. Owns no playback logic.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use quaver_common::bridge::Action;
use quaver_common::queue::QueueItem;
use quaver_common::Error;

use crate::controller::{IntakeController, PlayOutcome};

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub controller: IntakeController,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub user_id: i64,
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    status: String,
    message: String,
    title: String,
    started: bool,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    status: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    status: String,
    message: String,
    removed: u64,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    now_playing: Option<String>,
    items: Vec<QueueItem>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    status: String,
    removed: u64,
}

/// Command API errors
///
/// Wraps controller failures into user-facing status replies. Storage
/// trouble maps to 503 so callers know to retry; bridge trouble maps to
/// 502 because the request was accepted but could not be relayed.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Database(_) | Error::Io(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Redis(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Build the intake router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chats/:chat_id/play", post(play))
        .route("/chats/:chat_id/pause", post(pause))
        .route("/chats/:chat_id/resume", post(resume))
        .route("/chats/:chat_id/toggle", post(toggle))
        .route("/chats/:chat_id/skip", post(skip))
        .route("/chats/:chat_id/stop", post(stop))
        .route("/chats/:chat_id/rewind", post(rewind))
        .route("/chats/:chat_id/volume/up", post(volume_up))
        .route("/chats/:chat_id/volume/down", post(volume_down))
        .route("/chats/:chat_id/queue", get(list_queue).delete(clear_queue))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "quaver-intake".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /chats/:chat_id/play - Queue a track, kicking playback when idle
pub async fn play(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<PlayRequest>,
) -> Result<Json<PlayResponse>, ApiError> {
    let outcome = ctx.controller.play(chat_id, req.user_id, &req.query).await?;

    let response = match outcome {
        PlayOutcome::Started { title } => PlayResponse {
            status: "ok".to_string(),
            message: format!("Now playing: {}", title),
            title,
            started: true,
        },
        PlayOutcome::Queued { title, position } => PlayResponse {
            status: "ok".to_string(),
            message: format!("Queued: {} (position {})", title, position),
            title,
            started: false,
        },
    };
    Ok(Json(response))
}

async fn relay(
    ctx: AppContext,
    chat_id: i64,
    user_id: i64,
    action: Action,
    message: &str,
) -> Result<Json<ControlResponse>, ApiError> {
    ctx.controller.control(chat_id, user_id, action).await?;
    Ok(Json(ControlResponse {
        status: "ok".to_string(),
        message: message.to_string(),
    }))
}

/// POST /chats/:chat_id/pause
pub async fn pause(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    relay(ctx, chat_id, req.user_id, Action::Pause, "Playback paused.").await
}

/// POST /chats/:chat_id/resume
pub async fn resume(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    relay(ctx, chat_id, req.user_id, Action::Resume, "Playback resumed.").await
}

/// POST /chats/:chat_id/toggle
pub async fn toggle(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    relay(ctx, chat_id, req.user_id, Action::Toggle, "Playback toggled.").await
}

/// POST /chats/:chat_id/skip
pub async fn skip(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    relay(ctx, chat_id, req.user_id, Action::Skip, "Skipped to the next track.").await
}

/// POST /chats/:chat_id/rewind
pub async fn rewind(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    relay(ctx, chat_id, req.user_id, Action::Rewind, "Rewound to the start.").await
}

/// POST /chats/:chat_id/volume/up
pub async fn volume_up(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    relay(ctx, chat_id, req.user_id, Action::VolumeUp, "Volume up.").await
}

/// POST /chats/:chat_id/volume/down
pub async fn volume_down(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    relay(ctx, chat_id, req.user_id, Action::VolumeDown, "Volume down.").await
}

/// POST /chats/:chat_id/stop - Stop playback and clear the queue
pub async fn stop(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<StopResponse>, ApiError> {
    let removed = ctx.controller.stop(chat_id, req.user_id).await?;
    Ok(Json(StopResponse {
        status: "ok".to_string(),
        message: "Stopped playback and cleared the queue.".to_string(),
        removed,
    }))
}

/// GET /chats/:chat_id/queue - Pending items in playback order
pub async fn list_queue(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
) -> Result<Json<QueueResponse>, ApiError> {
    let items = ctx.controller.list(chat_id).await?;
    let now_playing = ctx
        .controller
        .now_playing(chat_id)
        .await
        .map(|mark| mark.title);
    Ok(Json(QueueResponse { now_playing, items }))
}

/// DELETE /chats/:chat_id/queue - Drop pending items, playback untouched
pub async fn clear_queue(
    State(ctx): State<AppContext>,
    Path(chat_id): Path<i64>,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = ctx.controller.clear(chat_id).await?;
    Ok(Json(ClearResponse {
        status: "ok".to_string(),
        removed,
    }))
}
