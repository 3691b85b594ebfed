use tokio::net::TcpStream;

use crate::{command, event};

use super::common::{json_lines_stream, BoxedStream, JsonLinesWriter};

/// [CommandStream] is a stream of [crate::command::FeedCommand]s sent by the feed client
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select!]
/// without the risk of missing commands.
pub type CommandStream = BoxedStream<anyhow::Result<command::FeedCommand>>;

/// [EventWriter] writes [crate::event::Event]s to the feed client
pub type EventWriter = JsonLinesWriter<event::Event>;

/// Splits a TCP stream into a stream of commands and an event writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (CommandStream, EventWriter) {
    let (reader, writer) = stream.into_split();

    (
        json_lines_stream(reader, "client"),
        EventWriter::new(writer),
    )
}
