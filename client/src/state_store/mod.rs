pub mod persistence;
mod state;
pub mod storage;
mod store;

pub use self::{
    persistence::PersistenceAdapter,
    state::{derive_user_id, normalize_email, normalize_messages, Message, StateData, StatePatch},
    store::{Listener, ListenerHandle, ListenerId, Store},
};
