use std::{
    pin::Pin,
    task::{ready, Context as TaskContext, Poll},
};

use anyhow::Context;
use async_trait::async_trait;
use comms::{
    command::{FeedCommand, SubscribeCommand},
    event::Event,
    transport::{
        self,
        client::{CommandWriter, EventStream},
    },
};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_stream::Stream;
use tracing::debug;

/// [SnapshotStream] yields the raw value of a single room every time it changes
///
/// `None` values mean the room does not exist. The stream ends when the feed
/// closes, dropping it cancels the subscription.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = anyhow::Result<Option<Value>>> + Send>>;

/// [RoomFeed] opens realtime subscriptions to rooms
#[async_trait]
pub trait RoomFeed: Send + Sync {
    async fn subscribe(&self, room_id: &str) -> anyhow::Result<SnapshotStream>;
}

/// [TcpRoomFeed] watches rooms on the realtime server, one connection per subscription
#[derive(Debug, Clone)]
pub struct TcpRoomFeed {
    addr: String,
}

impl TcpRoomFeed {
    pub fn new(addr: impl Into<String>) -> Self {
        TcpRoomFeed { addr: addr.into() }
    }
}

#[async_trait]
impl RoomFeed for TcpRoomFeed {
    async fn subscribe(&self, room_id: &str) -> anyhow::Result<SnapshotStream> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .with_context(|| format!("could not connect to the realtime server at {}", self.addr))?;
        let (events, mut command_writer) = transport::client::split_tcp_stream(stream);

        command_writer
            .write(&FeedCommand::Subscribe(SubscribeCommand {
                room: room_id.to_string(),
            }))
            .await
            .context("could not subscribe to the room")?;

        debug!(room_id, addr = %self.addr, "subscribed to the realtime feed");

        Ok(Box::pin(RoomSnapshots {
            room_id: room_id.to_string(),
            events,
            _command_writer: command_writer,
        }))
    }
}

/// Snapshots of one room read from a feed connection
struct RoomSnapshots {
    room_id: String,
    events: EventStream,
    /// Keeps the write half open, the server ends the session once it is dropped
    _command_writer: CommandWriter,
}

impl Stream for RoomSnapshots {
    type Item = anyhow::Result<Option<Value>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(self.events.as_mut().poll_next(cx)) {
                Some(Ok(Event::RoomSnapshot(snapshot))) => {
                    if snapshot.room == self.room_id {
                        return Poll::Ready(Some(Ok(snapshot.value)));
                    }
                }
                Some(Err(err)) => return Poll::Ready(Some(Err(err))),
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use comms::event::RoomSnapshotEvent;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_tcp_feed_subscribes_and_filters_by_room() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let feed = TcpRoomFeed::new(listener.local_addr().unwrap().to_string());

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (mut commands, mut events) = transport::server::split_tcp_stream(socket);

            let command = commands.next().await.unwrap().unwrap();
            for (room, value) in [("OTHER", json!({ "owner": "x" })), ("R1", json!({ "owner": "u1" }))] {
                events
                    .write(&Event::RoomSnapshot(RoomSnapshotEvent {
                        room: room.into(),
                        value: Some(value),
                    }))
                    .await
                    .unwrap();
            }
            events
                .write(&Event::RoomSnapshot(RoomSnapshotEvent {
                    room: "R1".into(),
                    value: None,
                }))
                .await
                .unwrap();

            command
        });

        let mut snapshots = feed.subscribe("R1").await.unwrap();

        assert_eq!(
            snapshots.next().await.unwrap().unwrap(),
            Some(json!({ "owner": "u1" }))
        );
        assert_eq!(snapshots.next().await.unwrap().unwrap(), None);
        assert_eq!(
            server.await.unwrap(),
            FeedCommand::Subscribe(SubscribeCommand { room: "R1".into() })
        );
        // the server task dropped the connection
        assert!(snapshots.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(TcpRoomFeed::new(addr).subscribe("R1").await.is_err());
    }
}
