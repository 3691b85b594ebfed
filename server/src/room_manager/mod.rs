mod room;
#[allow(clippy::module_inception)]
mod room_manager;

pub use room_manager::{RoomError, RoomManager};
