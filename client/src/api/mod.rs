use async_trait::async_trait;

use crate::error::ActionError;

mod http;

pub use self::http::HttpRoomsApi;

/// [RoomsApi] is the HTTP side of the backend, every outbound action goes through it
#[async_trait]
pub trait RoomsApi: Send + Sync {
    /// Creates a room owned by `owner` and returns its id.
    async fn create_room(&self, owner: &str) -> Result<String, ActionError>;

    /// Appends a message to the room and returns the id of the new message.
    async fn post_message(
        &self,
        room_id: &str,
        from: &str,
        message: &str,
    ) -> Result<String, ActionError>;
}
