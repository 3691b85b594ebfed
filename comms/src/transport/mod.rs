/// Transport over TCP implementation for a client to be able to watch rooms on the realtime server
#[cfg(feature = "client")]
pub mod client;
/// Newline-delimited JSON framing shared by both sides
#[cfg(any(feature = "client", feature = "server"))]
pub mod common;
/// Transport over TCP implementation for the realtime server to interact with a single client TCP Stream
#[cfg(feature = "server")]
pub mod server;
