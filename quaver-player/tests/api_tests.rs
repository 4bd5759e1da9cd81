//! Integration tests for the quaver-player HTTP surface
//!
//! The read-only state endpoints are exercised through the router with
//! `tower::util::ServiceExt::oneshot`, backed by an in-memory queue and
//! fake engine/resolver.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use quaver_common::bridge::ActionMessage;
use quaver_common::db::create_queue_table;
use quaver_common::queue::PersistentQueue;
use quaver_player::api::{build_router, AppContext};
use quaver_player::coordinator::{CoordinatorConfig, PlaybackCoordinator};
use quaver_player::engine::NullEngine;
use quaver_player::resolver::DirectResolver;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

async fn setup_coordinator() -> PlaybackCoordinator {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_queue_table(&pool).await.unwrap();

    PlaybackCoordinator::new(
        PersistentQueue::new(pool),
        Arc::new(NullEngine),
        Arc::new(DirectResolver),
        CoordinatorConfig::default(),
    )
}

fn setup_app(coordinator: PlaybackCoordinator) -> axum::Router {
    build_router(AppContext { coordinator })
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(setup_coordinator().await);

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "quaver-player");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_state_listing_starts_empty() {
    let app = setup_app(setup_coordinator().await);

    let response = app.oneshot(test_request("GET", "/state")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, Value::Array(vec![]));
}

#[tokio::test]
async fn test_state_listing_reports_active_sessions() {
    let coordinator = setup_coordinator().await;
    coordinator
        .handle(&ActionMessage::play(42, 7, "songX", "songX"))
        .await
        .unwrap();
    let app = setup_app(coordinator);

    let response = app.oneshot(test_request("GET", "/state")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let sessions = body.as_array().expect("Should be an array");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["chat_id"], 42);
    assert_eq!(sessions[0]["title"], "songX");
    assert_eq!(sessions[0]["is_playing"], true);
    assert_eq!(sessions[0]["volume"], 100);
}

#[tokio::test]
async fn test_chat_state_lookup() {
    let coordinator = setup_coordinator().await;
    coordinator
        .handle(&ActionMessage::play(42, 7, "songX", "songX"))
        .await
        .unwrap();
    let app = setup_app(coordinator);

    let response = app
        .oneshot(test_request("GET", "/state/42"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["chat_id"], 42);
    assert_eq!(body["position"], 0);
}

#[tokio::test]
async fn test_chat_state_missing_returns_404() {
    let app = setup_app(setup_coordinator().await);

    let response = app
        .oneshot(test_request("GET", "/state/99"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert!(body["status"].as_str().unwrap().contains("no active session"));
}
