use tracing::debug;

use crate::{actions, state_store::Store};

use super::Location;

/// Paths that always redirect to [WELCOME_PATH]
const ROOT_PATHS: [&str; 2] = ["/", "/index.html"];

pub const WELCOME_PATH: &str = "/welcome";
pub const CHAT_PATH: &str = "/chat";
/// Query parameter carrying the room id on [CHAT_PATH]
pub const ROOM_PARAM: &str = "room";

/// What to do with a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision<T> {
    Render(T),
    Redirect(Location),
    NotFound,
}

/// [RouteTable] maps paths to page targets, the first matching pattern wins
///
/// A pattern matches when the path contains it.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    routes: Vec<(String, T)>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        RouteTable { routes: Vec::new() }
    }
}

impl<T: Clone> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, target: T) -> Self {
        self.routes.push((pattern.to_string(), target));
        self
    }

    pub fn resolve(&self, path: &str) -> Option<&T> {
        self.routes
            .iter()
            .find(|(pattern, _)| path.contains(pattern.as_str()))
            .map(|(_, target)| target)
    }

    pub fn decide(&self, location: &Location) -> RouteDecision<T> {
        if ROOT_PATHS.contains(&location.path()) {
            return RouteDecision::Redirect(Location::new(WELCOME_PATH, &[]));
        }

        match self.resolve(location.path()) {
            Some(target) => RouteDecision::Render(target.clone()),
            None => RouteDecision::NotFound,
        }
    }
}

/// Applies the room query parameter of `location` to the store.
///
/// Returns false when there is still no active room afterwards, in which case
/// the room pages must not be rendered.
pub fn resolve_active_room(store: &Store, location: &Location) -> bool {
    if let Some(room_id) = location.query_param(ROOM_PARAM).filter(|room| !room.is_empty()) {
        if store.get_state().room_id != room_id {
            debug!(room_id, "room taken from the location");
            actions::set_room_id(store, room_id);
        }
    }

    store.get_state().has_active_room()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::state_store::{storage::MemoryStorage, PersistenceAdapter, StatePatch};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Target {
        Welcome,
        Chat,
    }

    fn table() -> RouteTable<Target> {
        RouteTable::new()
            .route(WELCOME_PATH, Target::Welcome)
            .route(CHAT_PATH, Target::Chat)
    }

    fn store() -> Store {
        Store::new(PersistenceAdapter::new(Arc::new(MemoryStorage::new())))
    }

    #[test]
    fn test_root_paths_redirect_to_welcome() {
        for root in ROOT_PATHS {
            assert_eq!(
                table().decide(&Location::parse(root)),
                RouteDecision::Redirect(Location::parse("/welcome"))
            );
        }
    }

    #[test]
    fn test_first_matching_pattern_wins() {
        let table = RouteTable::new()
            .route("/chat", Target::Chat)
            .route("/chat/welcome", Target::Welcome);

        assert_eq!(table.resolve("/chat/welcome"), Some(&Target::Chat));
        assert_eq!(
            self::table().decide(&Location::parse("/app/chat?room=R1")),
            RouteDecision::Render(Target::Chat)
        );
        assert_eq!(self::table().decide(&Location::parse("/nope")), RouteDecision::NotFound);
    }

    #[test]
    fn test_room_param_is_applied_to_store() {
        let store = store();

        assert!(resolve_active_room(&store, &Location::parse("/chat?room=R9")));
        assert_eq!(store.get_state().room_id, "R9");
    }

    #[test]
    fn test_store_room_is_kept_without_param() {
        let store = store();
        store.set_state(StatePatch::new().with_room_id("R1"));

        assert!(resolve_active_room(&store, &Location::parse("/chat")));
        assert_eq!(store.get_state().room_id, "R1");
    }

    #[test]
    fn test_no_room_anywhere() {
        let store = store();

        assert!(!resolve_active_room(&store, &Location::parse("/chat?room=")));
        assert!(!store.get_state().has_active_room());
    }
}
