use std::sync::Arc;

use comms::{command::FeedCommand, transport};
use nanoid::nanoid;
use tokio::{net::TcpStream, sync::broadcast};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::room_manager::RoomManager;

use self::feed_session::FeedSession;

mod feed_session;

/// Given a tcp stream and a room manager, serves the realtime feed of a single client
/// until the client quits, or the tcp stream is closed for some reason, or the server shuts down
pub async fn handle_feed_session(
    room_manager: Arc<RoomManager>,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let session_id = nanoid!();
    // Split the tcp stream into a command stream and an event writer with better ergonomics
    let (mut commands, mut event_writer) = transport::server::split_tcp_stream(stream);
    let mut feed_session = FeedSession::new(&session_id, room_manager);

    info!(%session_id, "feed session started");

    loop {
        tokio::select! {
            cmd = commands.next() => match cmd {
                // Closing the stream or quitting cancels every subscription of the session
                None | Some(Ok(FeedCommand::Quit(_))) => {
                    debug!(
                        %session_id,
                        watched_rooms = feed_session.watched_room_count(),
                        "feed client left"
                    );
                    feed_session.unwatch_all_rooms();
                    break;
                }
                Some(Ok(cmd)) => feed_session.handle_feed_command(cmd).await,
                Some(Err(err)) => warn!(%session_id, ?err, "skipping invalid feed command"),
            },
            // Snapshots of all the watched rooms are sent to the client
            Ok(event) = feed_session.recv() => {
                event_writer.write(&event).await?;
            }
            // If the server is shutting down, we can just close the tcp stream
            Ok(_) = quit_rx.recv() => {
                feed_session.unwatch_all_rooms();
                drop(event_writer);
                info!(%session_id, "gracefully shutting down feed session");
                break;
            }
        }
    }

    Ok(())
}
