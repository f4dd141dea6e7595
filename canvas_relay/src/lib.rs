//! Websocket relay for the shared canvas.
//!
//! Clients connect to `/canvas` (or `/canvas/{room}` after creating the room
//! with `GET /create/{room}`) and send `send-stroke` frames; every other
//! client in the same room receives the board as a `broadcast-board` frame.
//! The relay keeps no board state.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod handlers;
pub mod websocket;

pub use config::RelayConfig;
pub use websocket::{AppWsState, DEFAULT_ROOM, ROOM_NOT_FOUND};

pub fn app(state: Arc<AppWsState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/create/{room}", get(handlers::create_room))
        .route("/canvas", get(websocket::default_room_handler))
        .route("/canvas/{room}", get(websocket::room_handler))
        .with_state(state)
        .layer(cors)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
