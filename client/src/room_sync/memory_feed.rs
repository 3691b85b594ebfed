use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::feed::{RoomFeed, SnapshotStream};

#[derive(Default)]
struct MemoryRoom {
    /// Last published value, `None` until something is published
    current: Option<Option<Value>>,
    watchers: Vec<UnboundedSender<anyhow::Result<Option<Value>>>>,
}

/// [MemoryFeed] is an in-process [RoomFeed], values are published by hand
///
/// Like the realtime server, a subscriber first receives the last published value
/// of the room and then every later one.
#[derive(Default)]
pub struct MemoryFeed {
    rooms: Mutex<HashMap<String, MemoryRoom>>,
    subscriptions: AtomicUsize,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<String, MemoryRoom>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a new value of the room, `None` marks the room as missing.
    pub fn publish(&self, room_id: &str, value: Option<Value>) {
        let mut rooms = self.rooms();
        let room = rooms.entry(room_id.to_string()).or_default();

        room.watchers
            .retain(|watcher| watcher.send(Ok(value.clone())).is_ok());
        room.current = Some(value);
    }

    /// Sends an error to every watcher of the room.
    pub fn fail(&self, room_id: &str, reason: &str) {
        if let Some(room) = self.rooms().get_mut(room_id) {
            room.watchers
                .retain(|watcher| watcher.send(Err(anyhow::anyhow!(reason.to_string()))).is_ok());
        }
    }

    /// Ends the snapshot streams of every watcher of the room.
    pub fn close(&self, room_id: &str) {
        if let Some(room) = self.rooms().get_mut(room_id) {
            room.watchers.clear();
        }
    }

    /// Number of open snapshot streams of the room
    pub fn watcher_count(&self, room_id: &str) -> usize {
        self.rooms()
            .get(room_id)
            .map(|room| room.watchers.iter().filter(|watcher| !watcher.is_closed()).count())
            .unwrap_or(0)
    }

    /// Number of subscriptions ever opened, for any room
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoomFeed for MemoryFeed {
    async fn subscribe(&self, room_id: &str) -> anyhow::Result<SnapshotStream> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut rooms = self.rooms();
        let room = rooms.entry(room_id.to_string()).or_default();
        if let Some(current) = room.current.as_ref() {
            // the receiver is alive, sending can not fail
            let _ = tx.send(Ok(current.clone()));
        }
        room.watchers.push(tx);
        drop(rooms);

        self.subscriptions.fetch_add(1, Ordering::SeqCst);

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
