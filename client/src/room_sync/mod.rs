mod engine;
mod feed;
mod memory_feed;
pub mod snapshot;

pub use self::{
    engine::{OnFirstSync, RoomSync, RoomSyncEvent},
    feed::{RoomFeed, SnapshotStream, TcpRoomFeed},
    memory_feed::MemoryFeed,
    snapshot::{decode_snapshot, Snapshot, SnapshotDecodeError},
};
