use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use comms::room::{RoomMessage, RoomValue};
use nanoid::nanoid;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use super::room::Room;

const ROOM_ID_LEN: usize = 6;
const ROOM_ID_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];
const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("room '{0}' not found")]
    NotFound(String),
}

/// Snapshots of a room id, `None` while no room exists under it
pub type SnapshotReceiver = broadcast::Receiver<Option<RoomValue>>;

/// A room id that is either backed by a room or only watched, waiting for one
struct RoomSlot {
    room: Option<Room>,
    snapshot_tx: broadcast::Sender<Option<RoomValue>>,
}

impl RoomSlot {
    fn empty() -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        RoomSlot {
            room: None,
            snapshot_tx,
        }
    }

    fn value(&self) -> Option<RoomValue> {
        self.room.as_ref().map(Room::value)
    }

    fn publish(&self) {
        // no watchers is fine
        let _ = self.snapshot_tx.send(self.value());
    }
}

/// [RoomManager] owns every room and publishes a snapshot after each change
pub struct RoomManager {
    slots: Mutex<HashMap<String, RoomSlot>>,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomManager {
    pub fn new() -> Self {
        RoomManager {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty room owned by `owner` and returns its id
    pub async fn create_room(&self, owner: &str) -> String {
        let mut slots = self.slots.lock().await;

        let room_id = loop {
            let candidate = nanoid!(ROOM_ID_LEN, &ROOM_ID_ALPHABET);
            let taken = slots
                .get(&candidate)
                .map(|slot| slot.room.is_some())
                .unwrap_or(false);

            if !taken {
                break candidate;
            }
        };

        let slot = slots.entry(room_id.clone()).or_insert_with(RoomSlot::empty);
        slot.room = Some(Room::new(owner));
        slot.publish();

        info!(%room_id, owner, "created room");

        room_id
    }

    pub async fn room_value(&self, room_id: &str) -> Option<RoomValue> {
        self.slots.lock().await.get(room_id).and_then(RoomSlot::value)
    }

    pub async fn messages(&self, room_id: &str) -> Option<Vec<RoomMessage>> {
        self.slots
            .lock()
            .await
            .get(room_id)
            .and_then(|slot| slot.room.as_ref())
            .map(|room| room.messages().to_vec())
    }

    /// Appends a message to the room and returns the id of the message
    pub async fn post_message(
        &self,
        room_id: &str,
        from: &str,
        message: &str,
    ) -> Result<String, RoomError> {
        let mut slots = self.slots.lock().await;
        let slot = slots
            .get_mut(room_id)
            .ok_or_else(|| RoomError::NotFound(String::from(room_id)))?;
        let room = slot
            .room
            .as_mut()
            .ok_or_else(|| RoomError::NotFound(String::from(room_id)))?;

        let timestamp = room.push(from, message, now_millis()).timestamp;
        slot.publish();

        let id = nanoid!();
        debug!(room_id, message_id = %id, timestamp, "posted message");

        Ok(id)
    }

    /// Starts watching a room id, which does not have to exist yet
    ///
    /// Returns the current value alongside a receiver for every later one.
    pub async fn watch_room(&self, room_id: &str) -> (Option<RoomValue>, SnapshotReceiver) {
        let mut slots = self.slots.lock().await;
        // forget ids nobody watches anymore that never got a room
        slots.retain(|_, slot| slot.room.is_some() || slot.snapshot_tx.receiver_count() > 0);

        let slot = slots
            .entry(String::from(room_id))
            .or_insert_with(RoomSlot::empty);

        (slot.value(), slot.snapshot_tx.subscribe())
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_room_ids_are_short_upper_case() {
        let manager = RoomManager::new();

        let room_id = manager.create_room("u1").await;

        assert_eq!(room_id.len(), ROOM_ID_LEN);
        assert!(room_id
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(manager.room_value(&room_id).await.unwrap().owner, "u1");
    }

    #[tokio::test]
    async fn test_post_to_unknown_room() {
        let manager = RoomManager::new();
        // watching alone does not create the room
        let _watch = manager.watch_room("NOPE00").await;

        let result = manager.post_message("NOPE00", "Ana", "hi").await;

        assert_eq!(result, Err(RoomError::NotFound("NOPE00".into())));
        assert_eq!(manager.messages("NOPE00").await, None);
    }

    #[tokio::test]
    async fn test_messages_keep_arrival_order() {
        let manager = RoomManager::new();
        let room_id = manager.create_room("u1").await;

        for text in ["one", "two", "three"] {
            manager.post_message(&room_id, "Ana", text).await.unwrap();
        }

        let messages = manager.messages(&room_id).await.unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(messages
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_watchers_get_every_change() {
        let manager = RoomManager::new();
        let room_id = manager.create_room("u1").await;

        let (current, mut snapshots) = manager.watch_room(&room_id).await;
        assert_eq!(current.unwrap().messages, None);

        manager.post_message(&room_id, "Ana", "hi").await.unwrap();

        let next = snapshots.recv().await.unwrap().unwrap();
        assert_eq!(next.messages.map(|messages| messages.len()), Some(1));
    }

    #[tokio::test]
    async fn test_watching_a_missing_room() {
        let manager = RoomManager::new();

        let (current, _snapshots) = manager.watch_room("ZZZZZZ").await;

        assert_eq!(current, None);
    }
}
