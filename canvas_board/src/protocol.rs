use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::image_data::ImageData;

pub const SEND_STROKE: &str = "send-stroke";
pub const BROADCAST_BOARD: &str = "broadcast-board";
pub const INVALID_ROOM: &str = "invalid-room";

/// Message format for relay communication, one JSON text frame per event:
/// `{"event": "send-stroke", "data": {"width": .., "height": .., "data": "<base64>"}}`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum BoardEvent {
    /// Client to relay: the whole board after a completed stroke.
    SendStroke(ImageData),
    /// Relay to clients: a peer's board.
    BroadcastBoard(ImageData),
    /// Relay to a client that asked for a room it does not know.
    InvalidRoom(String),
}

impl BoardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::SendStroke(_) => SEND_STROKE,
            BoardEvent::BroadcastBoard(_) => BROADCAST_BOARD,
            BoardEvent::InvalidRoom(_) => INVALID_ROOM,
        }
    }

    /// The board carried by the event, if any.
    pub fn image(&self) -> Option<&ImageData> {
        match self {
            BoardEvent::SendStroke(image) | BoardEvent::BroadcastBoard(image) => Some(image),
            BoardEvent::InvalidRoom(_) => None,
        }
    }

    pub fn into_image(self) -> Option<ImageData> {
        match self {
            BoardEvent::SendStroke(image) | BoardEvent::BroadcastBoard(image) => Some(image),
            BoardEvent::InvalidRoom(_) => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
