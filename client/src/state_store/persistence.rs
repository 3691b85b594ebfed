use std::sync::Arc;

use anyhow::Context;
use tracing::{error, warn};

use super::{storage::KeyValueStorage, StateData};

/// The fixed key the whole state is stored under
pub const STATE_KEY: &str = "chat-state";

/// [PersistenceAdapter] saves and restores the full [StateData] under [STATE_KEY]
///
/// Every save overwrites the whole record, there are no incremental writes.
#[derive(Clone)]
pub struct PersistenceAdapter {
    storage: Arc<dyn KeyValueStorage>,
}

impl PersistenceAdapter {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        PersistenceAdapter { storage }
    }

    pub fn save(&self, state: &StateData) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(state).context("could not serialize the state")?;

        self.storage
            .set(STATE_KEY, &serialized)
            .context("could not write the persisted state")
    }

    /// Returns the saved state, or `None` when there is nothing usable.
    ///
    /// A record that does not decode is removed, so the next start is clean.
    pub fn load(&self) -> Option<StateData> {
        let raw = match self.storage.get(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(?err, "could not read the persisted state, using defaults");
                return None;
            }
        };

        match serde_json::from_str::<StateData>(&raw) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(%err, "discarding invalid persisted state");

                if let Err(err) = self.storage.remove(STATE_KEY) {
                    error!(?err, "could not remove the invalid persisted state");
                }

                None
            }
        }
    }
}
