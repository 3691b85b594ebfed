use serde::{Deserialize, Serialize};

/// The current value of a watched room
///
/// Sent once right after a subscription is accepted and again after every change to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshotEvent {
    /// The id of the room the snapshot belongs to
    #[serde(rename = "r")]
    pub room: String,
    /// The raw room value, see [crate::room::RoomValue] for its expected shape.
    /// `None` when no room exists under the id.
    #[serde(rename = "v")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
/// Events that can be sent to the feed client
/// Events may relate to different rooms, the receipient is a single feed session
pub enum Event {
    RoomSnapshot(RoomSnapshotEvent),
}
