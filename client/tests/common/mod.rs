#![allow(dead_code)]

use std::{
    env, fs,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use client::{
    api::RoomsApi,
    error::ActionError,
    room_sync::{MemoryFeed, RoomSync, RoomSyncEvent},
    state_store::{storage::MemoryStorage, PersistenceAdapter, Store},
};
use comms::room::{MessageCollection, RoomMessage, RoomValue};
use tokio::{sync::broadcast, time::timeout};

pub fn memory_store() -> Store {
    Store::new(PersistenceAdapter::new(Arc::new(MemoryStorage::new())))
}

pub fn unique_temp_dir(label: &str) -> PathBuf {
    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = env::temp_dir().join(format!("chat-rooms-{label}-{now_nanos}"));
    let _ = fs::remove_dir_all(&dir);

    dir
}

pub fn room_value(messages: &[RoomMessage]) -> serde_json::Value {
    serde_json::to_value(RoomValue {
        owner: "owner".into(),
        messages: Some(MessageCollection::from_messages(messages)),
    })
    .unwrap()
}

pub fn room_message(from: &str, message: &str, timestamp: i64) -> RoomMessage {
    RoomMessage {
        from: from.into(),
        message: message.into(),
        timestamp,
    }
}

pub async fn next_event(events: &mut broadcast::Receiver<RoomSyncEvent>) -> RoomSyncEvent {
    timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("no room sync event in time")
        .unwrap()
}

/// Waits until `condition` holds, yielding to the spawned tasks in between.
pub async fn eventually(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition never held");
}

/// A [RoomsApi] that records every call and, like the real backend, publishes
/// posted messages to the feed of the room.
#[derive(Default)]
pub struct RecordingApi {
    pub feed: Option<Arc<MemoryFeed>>,
    pub created_for: Mutex<Vec<String>>,
    pub posted: Mutex<Vec<(String, String, String)>>,
    /// Messages of each room, in arrival order
    pub rooms: Mutex<Vec<(String, Vec<RoomMessage>)>>,
    /// Timestamp stamped on the next posted message
    pub next_timestamp: Mutex<i64>,
    pub reject_with: Mutex<Option<(u16, String)>>,
}

impl RecordingApi {
    pub fn with_feed(feed: Arc<MemoryFeed>) -> Self {
        RecordingApi {
            feed: Some(feed),
            ..Default::default()
        }
    }

    pub fn seed_room(&self, room_id: &str, messages: Vec<RoomMessage>) {
        if let Some(feed) = self.feed.as_ref() {
            feed.publish(room_id, Some(room_value(&messages)));
        }
        self.rooms.lock().unwrap().push((room_id.to_string(), messages));
    }

    pub fn reject(&self, status: u16, message: &str) {
        *self.reject_with.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn call_count(&self) -> usize {
        self.created_for.lock().unwrap().len() + self.posted.lock().unwrap().len()
    }

    fn rejection(&self) -> Option<ActionError> {
        self.reject_with
            .lock()
            .unwrap()
            .clone()
            .map(|(status, message)| ActionError::Rejected { status, message })
    }
}

#[async_trait]
impl RoomsApi for RecordingApi {
    async fn create_room(&self, owner: &str) -> Result<String, ActionError> {
        self.created_for.lock().unwrap().push(owner.to_string());
        if let Some(err) = self.rejection() {
            return Err(err);
        }

        let room_id = format!("ROOM{}", self.created_for.lock().unwrap().len());
        self.seed_room(&room_id, vec![]);

        Ok(room_id)
    }

    async fn post_message(
        &self,
        room_id: &str,
        from: &str,
        message: &str,
    ) -> Result<String, ActionError> {
        self.posted
            .lock()
            .unwrap()
            .push((room_id.to_string(), from.to_string(), message.to_string()));
        if let Some(err) = self.rejection() {
            return Err(err);
        }

        let timestamp = *self.next_timestamp.lock().unwrap();
        let value = {
            let mut rooms = self.rooms.lock().unwrap();
            let (_, messages) = rooms
                .iter_mut()
                .find(|(id, _)| id == room_id)
                .ok_or_else(|| ActionError::NotFound(room_id.to_string()))?;
            messages.push(room_message(from, message, timestamp));

            room_value(messages)
        };

        if let Some(feed) = self.feed.as_ref() {
            feed.publish(room_id, Some(value));
        }

        Ok(format!("msg-{timestamp}"))
    }
}

pub fn sync_setup() -> (Store, Arc<MemoryFeed>, RoomSync) {
    let store = memory_store();
    let feed = Arc::new(MemoryFeed::new());
    let room_sync = RoomSync::new(store.clone(), feed.clone());

    (store, feed, room_sync)
}
