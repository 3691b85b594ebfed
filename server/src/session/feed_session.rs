use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use comms::{
    command::FeedCommand,
    event::{Event, RoomSnapshotEvent},
    room::RoomValue,
};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::{AbortHandle, JoinSet},
};
use tracing::{debug, warn};

use crate::room_manager::RoomManager;

pub(super) struct FeedSession {
    session_id: String,
    room_manager: Arc<RoomManager>,
    watched_rooms: HashMap<String, AbortHandle>,
    join_set: JoinSet<()>,
    mpsc_tx: mpsc::Sender<Event>,
    mpsc_rx: mpsc::Receiver<Event>,
}

impl FeedSession {
    pub fn new(session_id: &str, room_manager: Arc<RoomManager>) -> Self {
        let (mpsc_tx, mpsc_rx) = mpsc::channel(100);

        FeedSession {
            session_id: String::from(session_id),
            room_manager,
            watched_rooms: HashMap::new(),
            join_set: JoinSet::new(),
            mpsc_tx,
            mpsc_rx,
        }
    }

    /// Handle a subscribe or unsubscribe command of the feed client
    pub async fn handle_feed_command(&mut self, cmd: FeedCommand) {
        match cmd {
            FeedCommand::Subscribe(cmd) => {
                if self.watched_rooms.contains_key(&cmd.room) {
                    debug!(session_id = %self.session_id, room = %cmd.room, "room already watched");
                    return;
                }

                let (current, mut snapshots) = self.room_manager.watch_room(&cmd.room).await;

                // the current value goes first, then one snapshot per change,
                // all of them through the session channel so the order is kept
                let abort_handle = self.join_set.spawn({
                    let mpsc_tx = self.mpsc_tx.clone();
                    let room = cmd.room.clone();

                    async move {
                        let snapshot = |value: Option<RoomValue>| {
                            Event::RoomSnapshot(RoomSnapshotEvent {
                                room: room.clone(),
                                value: value.and_then(|value| serde_json::to_value(value).ok()),
                            })
                        };

                        if mpsc_tx.send(snapshot(current)).await.is_err() {
                            return;
                        }

                        loop {
                            match snapshots.recv().await {
                                Ok(value) => {
                                    if mpsc_tx.send(snapshot(value)).await.is_err() {
                                        break;
                                    }
                                }
                                // every snapshot is a full value, only the latest ones matter
                                Err(RecvError::Lagged(skipped)) => {
                                    warn!(room = %room, skipped, "feed session lagged behind");
                                }
                                Err(RecvError::Closed) => break,
                            }
                        }
                    }
                });

                self.watched_rooms.insert(cmd.room, abort_handle);
            }
            FeedCommand::Unsubscribe(cmd) => {
                if let Some(abort_handle) = self.watched_rooms.remove(&cmd.room) {
                    abort_handle.abort();
                }
            }
            FeedCommand::Quit(_) => {}
        }
    }

    /// Stop watching every room of the session
    pub fn unwatch_all_rooms(&mut self) {
        for (_, abort_handle) in self.watched_rooms.drain() {
            abort_handle.abort();
        }
    }

    pub fn watched_room_count(&self) -> usize {
        self.watched_rooms.len()
    }

    /// Recieve a snapshot of any of the rooms the session watches
    pub async fn recv(&mut self) -> anyhow::Result<Event> {
        self.mpsc_rx
            .recv()
            .await
            .context("could not recv from the session channel")
    }
}
