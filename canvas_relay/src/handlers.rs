use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::websocket::AppWsState;

#[derive(Debug)]
pub enum AppError {
    RoomExists(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::RoomExists(room) => {
                (StatusCode::BAD_REQUEST, format!("Room {room} already exists"))
            }
        };
        (status, error_message).into_response()
    }
}

#[derive(Serialize, Debug)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

/// Handler to create a room that clients can then join at `/canvas/{room}`.
pub async fn create_room(
    State(state): State<Arc<AppWsState>>,
    Path(room): Path<String>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    if !state.create_room(&room).await {
        debug!("Room {} already exists", room);
        return Err(AppError::RoomExists(room));
    }
    Ok(Json(CreateRoomResponse { room_id: room }))
}
