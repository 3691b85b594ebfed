use comms::room::RoomValue;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::state_store::{normalize_messages, Message};

/// A decoded room feed snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// The feed has no value for the room, the room does not exist
    Missing,
    Room {
        owner: String,
        /// Valid messages only, ascending by timestamp
        messages: Vec<Message>,
    },
}

#[derive(Debug, Error)]
pub enum SnapshotDecodeError {
    #[error("room value has an unexpected shape: {0}")]
    InvalidShape(#[source] serde_json::Error),
}

/// A message entry as it may appear in the feed
///
/// Only `message` has to be a string, the other fields are read leniently.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    from: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
}

impl RawEntry {
    fn into_message(self) -> Option<Message> {
        let message = self.message?;

        Some(Message::new(
            self.from.map(sender_from_value).unwrap_or_default(),
            message,
            self.timestamp.as_ref().and_then(timestamp_from_value).unwrap_or(0),
        ))
    }
}

fn sender_from_value(value: Value) -> String {
    match value {
        Value::String(from) => from,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Integer millis, a float truncated, or a number inside a string
fn timestamp_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis as i64)),
        Value::String(raw) => {
            let raw = raw.trim();
            raw.parse::<i64>()
                .ok()
                .or_else(|| raw.parse::<f64>().ok().map(|millis| millis as i64))
        }
        _ => None,
    }
}

/// Decodes the raw feed value of a room.
///
/// `None` and `null` both mean the room is missing. Entries that are not
/// message objects, or have no text, are dropped. The resulting messages are
/// sorted by timestamp, entries sharing a timestamp keep the feed order.
pub fn decode_snapshot(value: Option<Value>) -> Result<Snapshot, SnapshotDecodeError> {
    let value = match value {
        None | Some(Value::Null) => return Ok(Snapshot::Missing),
        Some(value) => value,
    };

    let room: RoomValue = serde_json::from_value(value).map_err(SnapshotDecodeError::InvalidShape)?;

    let entries = room.messages.map(|m| m.into_entries()).unwrap_or_default();
    let total = entries.len();
    let messages: Vec<Message> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawEntry>(entry).ok())
        .filter_map(RawEntry::into_message)
        .collect();
    let messages = normalize_messages(messages);

    if messages.len() != total {
        trace!(
            dropped = total - messages.len(),
            "dropped malformed message entries"
        );
    }

    Ok(Snapshot::Room {
        owner: room.owner,
        messages,
    })
}
