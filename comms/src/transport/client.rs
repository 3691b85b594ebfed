use tokio::net::TcpStream;

use crate::{command, event};

use super::common::{json_lines_stream, BoxedStream, JsonLinesWriter};

/// [EventStream] is a stream of [crate::event::Event]s sent by the realtime server
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select]
/// without the risk of missing events.
pub type EventStream = BoxedStream<anyhow::Result<event::Event>>;

/// [CommandWriter] writes [crate::command::FeedCommand]s to the realtime server
pub type CommandWriter = JsonLinesWriter<command::FeedCommand>;

/// Splits a TCP stream into a stream of events and a command writer.
///
/// Dropping the [CommandWriter] closes the write side, which the server treats as the end of the session.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (EventStream, CommandWriter) {
    let (reader, writer) = stream.into_split();

    (
        json_lines_stream(reader, "server"),
        CommandWriter::new(writer),
    )
}
