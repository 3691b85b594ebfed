use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use tokio::{sync::broadcast, task::AbortHandle};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::state_store::{StatePatch, Store};

use super::{
    feed::RoomFeed,
    snapshot::{decode_snapshot, Snapshot},
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Called once, after the first snapshot of an existing room was applied
pub type OnFirstSync = Box<dyn FnOnce() + Send>;

/// Conditions of the active subscription, reported beside the store writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomSyncEvent {
    FirstSync { room: String },
    RoomNotFound { room: String },
    DecodeFailed { room: String, reason: String },
    FeedClosed { room: String },
    FeedFailed { room: String, reason: String },
}

struct ActiveSubscription {
    room_id: String,
    generation: u64,
    abort_handle: AbortHandle,
}

struct RoomSyncInner {
    store: Store,
    feed: Arc<dyn RoomFeed>,
    active: Mutex<Option<ActiveSubscription>>,
    next_generation: AtomicU64,
    events_tx: broadcast::Sender<RoomSyncEvent>,
}

impl RoomSyncInner {
    fn active(&self) -> MutexGuard<'_, Option<ActiveSubscription>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active()
            .as_ref()
            .map(|active| active.generation == generation)
            .unwrap_or(false)
    }

    /// Forgets the subscription if it is still the active one, its task is finishing anyway.
    fn release(&self, generation: u64) {
        let mut active = self.active();
        if active.as_ref().map(|a| a.generation) == Some(generation) {
            active.take();
        }
    }

    fn emit(&self, event: RoomSyncEvent) {
        // nobody listening is fine
        let _ = self.events_tx.send(event);
    }
}

/// [RoomSync] keeps the messages of a single room in sync with the realtime feed
///
/// At most one subscription is live at any time. Opening a new one always
/// cancels the previous one first, and a snapshot that arrives for a replaced
/// subscription is never written to the store.
#[derive(Clone)]
pub struct RoomSync {
    inner: Arc<RoomSyncInner>,
}

impl RoomSync {
    pub fn new(store: Store, feed: Arc<dyn RoomFeed>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        RoomSync {
            inner: Arc::new(RoomSyncInner {
                store,
                feed,
                active: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                events_tx,
            }),
        }
    }

    pub fn events(&self) -> broadcast::Receiver<RoomSyncEvent> {
        self.inner.events_tx.subscribe()
    }

    /// The room of the live subscription, if there is one
    pub fn active_room(&self) -> Option<String> {
        self.inner.active().as_ref().map(|active| active.room_id.clone())
    }

    /// Cancels the current subscription and opens one for `room_id`.
    ///
    /// The cancellation is done before this returns. Must be called from
    /// within a tokio runtime, the subscription runs as a spawned task.
    pub fn access_to_room(&self, room_id: &str, on_first_sync: Option<OnFirstSync>) {
        let mut active = self.inner.active();

        if let Some(previous) = active.take() {
            previous.abort_handle.abort();
            debug!(
                room_id = %previous.room_id,
                generation = previous.generation,
                "cancelled room subscription"
            );
        }

        if room_id.is_empty() {
            error!("missing room id, no room subscription opened");
            return;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let task = tokio::spawn(forward_snapshots(
            Arc::clone(&self.inner),
            room_id.to_string(),
            generation,
            on_first_sync,
        ));

        *active = Some(ActiveSubscription {
            room_id: room_id.to_string(),
            generation,
            abort_handle: task.abort_handle(),
        });

        info!(room_id, generation, "opened room subscription");
    }

    /// Cancels the current subscription, does nothing when there is none.
    pub fn unsubscribe_from_room(&self) {
        if let Some(previous) = self.inner.active().take() {
            previous.abort_handle.abort();
            info!(room_id = %previous.room_id, "unsubscribed from room");
        }
    }
}

async fn forward_snapshots(
    inner: Arc<RoomSyncInner>,
    room_id: String,
    generation: u64,
    mut on_first_sync: Option<OnFirstSync>,
) {
    let mut snapshots = match inner.feed.subscribe(&room_id).await {
        Ok(snapshots) => snapshots,
        Err(err) => {
            if inner.is_current(generation) {
                error!(%room_id, ?err, "could not open the room feed");
                inner.release(generation);
                inner.emit(RoomSyncEvent::FeedFailed {
                    room: room_id,
                    reason: format!("{err:#}"),
                });
            }

            return;
        }
    };

    let mut synced = false;

    while let Some(result) = snapshots.next().await {
        // the subscription may have been replaced while the snapshot was in flight
        if !inner.is_current(generation) {
            debug!(%room_id, generation, "discarding snapshot of a replaced subscription");
            return;
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                error!(%room_id, ?err, "room feed failed");
                inner.release(generation);
                inner.emit(RoomSyncEvent::FeedFailed {
                    room: room_id,
                    reason: format!("{err:#}"),
                });

                return;
            }
        };

        match decode_snapshot(raw) {
            Ok(Snapshot::Missing) => {
                warn!(%room_id, "room not found");
                inner.emit(RoomSyncEvent::RoomNotFound {
                    room: room_id.clone(),
                });
            }
            Ok(Snapshot::Room { messages, .. }) => {
                debug!(%room_id, messages = messages.len(), "applying room snapshot");
                inner.store.set_state(StatePatch::new().with_messages(messages));

                if !synced {
                    synced = true;
                    inner.emit(RoomSyncEvent::FirstSync {
                        room: room_id.clone(),
                    });

                    if let Some(on_first_sync) = on_first_sync.take() {
                        on_first_sync();
                    }
                }
            }
            Err(err) => {
                warn!(%room_id, %err, "could not decode room snapshot");
                inner.emit(RoomSyncEvent::DecodeFailed {
                    room: room_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    if inner.is_current(generation) {
        info!(%room_id, "room feed closed");
        inner.release(generation);
        inner.emit(RoomSyncEvent::FeedClosed { room: room_id });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use super::*;
    use crate::{
        room_sync::MemoryFeed,
        state_store::{storage::MemoryStorage, Message, PersistenceAdapter},
    };

    fn setup() -> (Store, Arc<MemoryFeed>, RoomSync) {
        let store = Store::new(PersistenceAdapter::new(Arc::new(MemoryStorage::new())));
        let feed = Arc::new(MemoryFeed::new());
        let room_sync = RoomSync::new(store.clone(), feed.clone());

        (store, feed, room_sync)
    }

    async fn next_event(events: &mut broadcast::Receiver<RoomSyncEvent>) -> RoomSyncEvent {
        timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("no room sync event in time")
            .unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_is_written_sorted_and_first_sync_fires_once() {
        let (store, feed, room_sync) = setup();
        let mut events = room_sync.events();
        let first_syncs = Arc::new(AtomicU64::new(0));

        feed.publish(
            "R1",
            Some(json!({
                "owner": "u1",
                "messages": [
                    { "from": "Bo", "message": "second", "timestamp": 2 },
                    { "from": "Ana", "message": "first", "timestamp": 1 },
                ],
            })),
        );
        room_sync.access_to_room(
            "R1",
            Some(Box::new({
                let first_syncs = first_syncs.clone();
                move || {
                    first_syncs.fetch_add(1, Ordering::SeqCst);
                }
            })),
        );

        assert_eq!(
            next_event(&mut events).await,
            RoomSyncEvent::FirstSync { room: "R1".into() }
        );
        assert_eq!(
            store.get_state().messages,
            vec![Message::new("Ana", "first", 1), Message::new("Bo", "second", 2)]
        );

        feed.publish(
            "R1",
            Some(json!({ "owner": "u1", "messages": [{ "from": "Ana", "message": "only", "timestamp": 5 }] })),
        );
        feed.publish("R1", Some(json!("garbage")));

        assert!(matches!(
            next_event(&mut events).await,
            RoomSyncEvent::DecodeFailed { .. }
        ));
        assert_eq!(store.get_state().messages, vec![Message::new("Ana", "only", 5)]);
        assert_eq!(first_syncs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_room_keeps_messages() {
        let (store, feed, room_sync) = setup();
        let mut events = room_sync.events();
        let existing = vec![Message::new("Ana", "kept", 1)];
        store.set_state(StatePatch::new().with_messages(existing.clone()));

        feed.publish("NOPE", None);
        room_sync.access_to_room("NOPE", Some(Box::new(|| panic!("must not fire"))));

        assert_eq!(
            next_event(&mut events).await,
            RoomSyncEvent::RoomNotFound { room: "NOPE".into() }
        );
        assert_eq!(store.get_state().messages, existing);
        assert_eq!(room_sync.active_room().as_deref(), Some("NOPE"));
    }

    #[tokio::test]
    async fn test_empty_room_id_cancels_and_opens_nothing() {
        let (_, feed, room_sync) = setup();

        room_sync.access_to_room("R1", None);
        room_sync.access_to_room("", None);

        assert_eq!(room_sync.active_room(), None);
        tokio::task::yield_now().await;
        assert_eq!(feed.watcher_count("R1"), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_without_subscription_is_a_no_op() {
        let (_, _, room_sync) = setup();

        room_sync.unsubscribe_from_room();
        room_sync.unsubscribe_from_room();

        assert_eq!(room_sync.active_room(), None);
    }

    #[tokio::test]
    async fn test_closed_feed_releases_the_subscription() {
        let (_, feed, room_sync) = setup();
        let mut events = room_sync.events();
        feed.publish("R1", Some(json!({ "owner": "u1" })));

        room_sync.access_to_room("R1", None);
        assert_eq!(
            next_event(&mut events).await,
            RoomSyncEvent::FirstSync { room: "R1".into() }
        );

        feed.close("R1");

        assert_eq!(
            next_event(&mut events).await,
            RoomSyncEvent::FeedClosed { room: "R1".into() }
        );
        assert_eq!(room_sync.active_room(), None);
    }

    #[tokio::test]
    async fn test_feed_error_is_reported() {
        let (_, feed, room_sync) = setup();
        let mut events = room_sync.events();

        room_sync.access_to_room("R1", None);
        // let the task open the subscription before failing it
        while feed.watcher_count("R1") == 0 {
            tokio::task::yield_now().await;
        }
        feed.fail("R1", "connection reset");

        assert_eq!(
            next_event(&mut events).await,
            RoomSyncEvent::FeedFailed {
                room: "R1".into(),
                reason: "connection reset".into(),
            }
        );
        assert_eq!(room_sync.active_room(), None);
    }
}
