use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// A chat message of the active room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the sender
    pub from: String,
    /// Text of the message, never blank once stored
    pub message: String,
    /// Epoch millis stamped by the backend
    pub timestamp: i64,
}

impl Message {
    pub fn new(from: impl Into<String>, message: impl Into<String>, timestamp: i64) -> Self {
        Message {
            from: from.into(),
            message: message.into(),
            timestamp,
        }
    }

    fn has_text(&self) -> bool {
        !self.message.trim().is_empty()
    }
}

/// StateData holds everything the pages render from
///
/// Serialized with the same keys the persisted record uses: `email`, `fullName`,
/// `userId`, `roomId` and `messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateData {
    /// The email as typed by the user, normalized on sign in
    pub email: String,
    /// The name shown as the sender of outgoing messages
    pub full_name: String,
    /// Derived from the normalized email, empty until sign in
    pub user_id: String,
    /// Empty when there is no active room
    pub room_id: String,
    /// Messages of the active room, ascending by timestamp
    pub messages: Vec<Message>,
}

impl StateData {
    pub fn has_active_room(&self) -> bool {
        !self.room_id.is_empty()
    }

    pub fn is_signed_in(&self) -> bool {
        !self.user_id.is_empty()
    }

    /// Builds the state that results from applying `patch` on top of this one.
    pub(crate) fn merged(&self, patch: StatePatch) -> StateData {
        StateData {
            email: patch.email.unwrap_or_else(|| self.email.clone()),
            full_name: patch.full_name.unwrap_or_else(|| self.full_name.clone()),
            user_id: patch.user_id.unwrap_or_else(|| self.user_id.clone()),
            room_id: patch.room_id.unwrap_or_else(|| self.room_id.clone()),
            messages: match patch.messages {
                Some(messages) => normalize_messages(messages),
                None => self.messages.clone(),
            },
        }
    }
}

/// A partial update of [StateData], `None` fields keep their current value.
///
/// A supplied `messages` list replaces the stored one entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub user_id: Option<String>,
    pub room_id: Option<String>,
    pub messages: Option<Vec<Message>>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_room_id(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }
}

impl From<StateData> for StatePatch {
    fn from(state: StateData) -> Self {
        StatePatch {
            email: Some(state.email),
            full_name: Some(state.full_name),
            user_id: Some(state.user_id),
            room_id: Some(state.room_id),
            messages: Some(state.messages),
        }
    }
}

/// Drops messages without text and orders the rest ascending by timestamp.
///
/// The sort is stable, messages sharing a timestamp keep their relative order.
pub fn normalize_messages(mut messages: Vec<Message>) -> Vec<Message> {
    messages.retain(Message::has_text);
    messages.sort_by_key(|message| message.timestamp);

    messages
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The user id is the base64 encoding of the normalized email
pub fn derive_user_id(email: &str) -> String {
    STANDARD.encode(normalize_email(email))
}
