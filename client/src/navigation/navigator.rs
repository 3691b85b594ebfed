use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::Location;

/// Routing events, consumed by the single place routes are resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEvent {
    /// The location changed, either programmatically or by going back
    PopState(Location),
}

/// [Navigator] is the programmatic side of routing, used by the pages
pub trait Navigator: Send + Sync {
    /// Moves to `path` with the given query parameters and emits a routing event.
    fn navigate(&self, path: &str, query: &[(&str, &str)]);

    /// Goes back one entry, returns false when there is nothing to go back to.
    fn back(&self) -> bool;

    fn location(&self) -> Location;

    fn query_param(&self, name: &str) -> Option<String> {
        self.location().query_param(name).map(str::to_string)
    }
}

/// [HistoryNavigator] keeps an in-memory history stack
///
/// Programmatic navigation and going back both end up as a [RouteEvent::PopState]
/// on the returned receiver, so they share the same handling path.
pub struct HistoryNavigator {
    history: Mutex<Vec<Location>>,
    route_tx: UnboundedSender<RouteEvent>,
}

impl HistoryNavigator {
    pub fn new(initial: Location) -> (Self, UnboundedReceiver<RouteEvent>) {
        let (route_tx, route_rx) = mpsc::unbounded_channel();

        (
            HistoryNavigator {
                history: Mutex::new(vec![initial]),
                route_tx,
            },
            route_rx,
        )
    }

    fn history(&self) -> MutexGuard<'_, Vec<Location>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, location: Location) {
        if self.route_tx.send(RouteEvent::PopState(location)).is_err() {
            warn!("nobody is handling route events anymore");
        }
    }

    pub fn depth(&self) -> usize {
        self.history().len()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str, query: &[(&str, &str)]) {
        let location = Location::new(path, query);
        debug!(%location, "navigating");

        self.history().push(location.clone());
        self.emit(location);
    }

    fn back(&self) -> bool {
        let previous = {
            let mut history = self.history();
            if history.len() < 2 {
                return false;
            }

            history.pop();
            history.last().cloned()
        };

        match previous {
            Some(location) => {
                debug!(%location, "navigating back");
                self.emit(location);
                true
            }
            None => false,
        }
    }

    fn location(&self) -> Location {
        self.history().last().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_pushes_and_emits() {
        let (navigator, mut route_rx) = HistoryNavigator::new(Location::parse("/welcome"));

        navigator.navigate("/chat", &[("room", "R1")]);

        assert_eq!(navigator.location().to_string(), "/chat?room=R1");
        assert_eq!(navigator.query_param("room").as_deref(), Some("R1"));
        assert_eq!(
            route_rx.try_recv().unwrap(),
            RouteEvent::PopState(Location::new("/chat", &[("room", "R1")]))
        );
        assert_eq!(navigator.depth(), 2);
    }

    #[test]
    fn test_back_emits_previous_location() {
        let (navigator, mut route_rx) = HistoryNavigator::new(Location::parse("/welcome"));
        navigator.navigate("/chat", &[]);
        let _ = route_rx.try_recv();

        assert!(navigator.back());
        assert_eq!(
            route_rx.try_recv().unwrap(),
            RouteEvent::PopState(Location::parse("/welcome"))
        );

        // the initial entry is never popped
        assert!(!navigator.back());
        assert!(route_rx.try_recv().is_err());
        assert_eq!(navigator.location().path(), "/welcome");
    }
}
