use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak,
};

use tracing::{debug, error, info};

use super::{persistence::PersistenceAdapter, StateData, StatePatch};

/// A state change callback. It carries no payload, listeners re-read the state.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Identifies one listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct StoreInner {
    state: RwLock<Arc<StateData>>,
    /// Registrations in registration order
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    persistence: PersistenceAdapter,
}

impl StoreInner {
    fn listeners(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);

        listeners.len() != before
    }
}

/// [Store] is the only writer of [StateData]
///
/// Every [Store::set_state] call notifies the listeners and then persists the
/// whole state before returning. Clones share the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates a store with the default state, see [Store::init] for restoring.
    pub fn new(persistence: PersistenceAdapter) -> Self {
        Store {
            inner: Arc::new(StoreInner {
                state: RwLock::new(Arc::new(StateData::default())),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                persistence,
            }),
        }
    }

    /// Restores the persisted state, if there is a usable one.
    ///
    /// Never fails, an unusable record is dropped by the persistence adapter and
    /// the store keeps the defaults.
    pub fn init(&self) {
        match self.inner.persistence.load() {
            Some(restored) => {
                info!(room_id = %restored.room_id, "restored persisted state");
                self.set_state(StatePatch::from(restored));
            }
            None => debug!("no persisted state, starting with defaults"),
        }
    }

    pub fn get_state(&self) -> Arc<StateData> {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);

        Arc::clone(&state)
    }

    /// Merges the patch into the current state, notifies the listeners and persists.
    pub fn set_state(&self, patch: StatePatch) {
        let next = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let next = Arc::new(state.merged(patch));
            *state = Arc::clone(&next);

            next
        };

        debug!(
            room_id = %next.room_id,
            messages = next.messages.len(),
            "state changed"
        );

        self.notify();

        // listeners may have written again, the record always follows the latest state
        let latest = self.get_state();
        if let Err(err) = self.inner.persistence.save(&latest) {
            error!(?err, "could not persist the state");
        }
    }

    /// Registers a listener, the same callback may be registered more than once.
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners().push((id, Arc::new(listener)));

        ListenerHandle {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Removes a registration, returns false if it was already removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.remove_listener(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }

    fn notify(&self) {
        // listeners run on a copy, so they can subscribe or unsubscribe while being notified
        let listeners: Vec<Listener> = self
            .inner
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

/// [ListenerHandle] is the unsubscribe action returned by [Store::subscribe]
#[must_use = "the listener stays registered until `unsubscribe` is called"]
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    store: Weak<StoreInner>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn unsubscribe(self) {
        if let Some(inner) = self.store.upgrade() {
            inner.remove_listener(self.id);
        }
    }
}
