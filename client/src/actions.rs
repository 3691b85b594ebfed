//! Identity and room operations on top of the [Store]
//!
//! Every operation validates what it needs before any request is made, and the
//! store is only written once the backend accepted the request.

use tracing::{debug, info};

use crate::{
    api::RoomsApi,
    error::ActionError,
    state_store::{derive_user_id, normalize_email, StatePatch, Store},
};

pub fn set_email(store: &Store, email: &str) {
    store.set_state(StatePatch::new().with_email(email));
}

pub fn set_full_name(store: &Store, full_name: &str) {
    store.set_state(StatePatch::new().with_full_name(full_name));
}

pub fn set_room_id(store: &Store, room_id: &str) {
    store.set_state(StatePatch::new().with_room_id(room_id));
}

/// Normalizes the stored email and derives the user id from it.
pub fn sign_in(store: &Store) -> Result<(), ActionError> {
    let state = store.get_state();
    let email = normalize_email(&state.email);

    if email.is_empty() {
        return Err(ActionError::validation("missing email"));
    }

    let user_id = derive_user_id(&email);
    info!(%user_id, "signed in");
    store.set_state(StatePatch::new().with_email(email).with_user_id(user_id));

    Ok(())
}

/// Creates a room owned by the signed in user and makes it the active room.
pub async fn ask_new_room(store: &Store, api: &dyn RoomsApi) -> Result<String, ActionError> {
    let owner = store.get_state().user_id.clone();

    if owner.is_empty() {
        return Err(ActionError::validation("user not signed in"));
    }

    let room_id = api.create_room(&owner).await?;
    info!(%room_id, "created room");
    store.set_state(StatePatch::new().with_room_id(room_id.as_str()));

    Ok(room_id)
}

/// Sends a message to the active room as the current full name.
///
/// The message only shows up in the store once the feed delivers it back.
pub async fn push_message(
    store: &Store,
    api: &dyn RoomsApi,
    message: &str,
) -> Result<String, ActionError> {
    let state = store.get_state();

    if state.room_id.is_empty() {
        return Err(ActionError::validation("missing room id"));
    }
    if state.full_name.is_empty() {
        return Err(ActionError::validation("missing full name"));
    }
    if message.trim().is_empty() {
        return Err(ActionError::validation("missing message"));
    }

    let id = api
        .post_message(&state.room_id, &state.full_name, message)
        .await?;
    debug!(room_id = %state.room_id, message_id = %id, "message sent");

    Ok(id)
}
