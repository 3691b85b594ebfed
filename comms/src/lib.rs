/// Set of commands a feed client can send to the realtime server
pub mod command;
/// Events the realtime server pushes to the feed clients
pub mod event;
/// Request and response bodies of the rooms HTTP API
pub mod http;
/// Shape of a room value as published on the realtime feed
pub mod room;
/// Implementation of event and command transportation over TCP Streams.
/// Requires 'server' or 'client' features to be enabled and will bring in tokio dependency alongside with other dependencies
pub mod transport;
