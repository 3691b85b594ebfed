mod location;
mod navigator;
pub mod routes;

pub use self::{
    location::Location,
    navigator::{HistoryNavigator, Navigator, RouteEvent},
    routes::{resolve_active_room, RouteDecision, RouteTable},
};
