use serde::{Deserialize, Serialize};

use crate::room::RoomMessage;

/// Body of `POST /rooms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    /// The user id of the room creator, an empty owner is rejected with `400`
    #[serde(default)]
    pub owner: String,
}

/// Reply of a successful `POST /rooms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    #[serde(rename = "roomId")]
    pub room_id: String,
}

/// Body of `POST /rooms/:id/messages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub message: String,
}

/// Reply of a successful `POST /rooms/:id/messages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub id: String,
}

/// Reply of `GET /rooms/:id/messages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<RoomMessage>,
}

/// Body of every non-2xx reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Reply of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
