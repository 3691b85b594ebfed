use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A single chat message as the backend stores and publishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMessage {
    /// Display name of the sender
    pub from: String,
    /// Text of the message
    pub message: String,
    /// Epoch millis stamped by the backend
    pub timestamp: i64,
}

/// The message collection of a room value.
///
/// Backends publish either an ordered sequence or a mapping keyed by push ids.
/// Entries stay raw so that a single malformed entry can be dropped by the reader
/// without rejecting the whole room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageCollection {
    Sequence(Vec<Value>),
    Keyed(Map<String, Value>),
}

impl Default for MessageCollection {
    fn default() -> Self {
        MessageCollection::Sequence(Vec::new())
    }
}

impl MessageCollection {
    pub fn from_messages<'a>(messages: impl IntoIterator<Item = &'a RoomMessage>) -> Self {
        MessageCollection::Sequence(
            messages
                .into_iter()
                .map(|m| {
                    json!({
                        "from": m.from,
                        "message": m.message,
                        "timestamp": m.timestamp,
                    })
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            MessageCollection::Sequence(entries) => entries.len(),
            MessageCollection::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens the collection into feed order.
    ///
    /// Sequences keep their index order, keyed collections are ordered by key.
    pub fn into_entries(self) -> Vec<Value> {
        match self {
            MessageCollection::Sequence(entries) => entries,
            MessageCollection::Keyed(entries) => {
                let mut keyed: Vec<(String, Value)> = entries.into_iter().collect();
                keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

                keyed.into_iter().map(|(_, entry)| entry).collect()
            }
        }
    }
}

/// RoomValue is the value published on the realtime feed for a single room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomValue {
    /// The user id of the room creator
    #[serde(default)]
    pub owner: String,
    /// `None` when the room has no messages yet, backends may send `null` or omit the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<MessageCollection>,
}
