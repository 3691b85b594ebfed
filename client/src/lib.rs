/// Identity and room operations exposed to the pages
pub mod actions;
/// HTTP side of the rooms backend
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
/// Locations, routing and programmatic navigation
pub mod navigation;
/// Keeps the messages of the active room in sync with the realtime feed
pub mod room_sync;
/// The state every page renders from, with its persistence
pub mod state_store;
pub mod termination;
/// Terminal front end
pub mod ui_management;
