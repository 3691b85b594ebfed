use crossterm::event::KeyEvent;
use ratatui::{prelude::*, widgets::*, Frame};
use tracing::{debug, info, warn};

use crate::{
    context::AppContext,
    navigation::{
        resolve_active_room,
        routes::{CHAT_PATH, WELCOME_PATH},
        Location, RouteDecision, RouteTable,
    },
    room_sync::RoomSyncEvent,
    state_store::StateData,
};

use self::{chat_page::ChatPage, welcome_page::WelcomePage};

use super::components::ComponentRender;

mod chat_page;
mod welcome_page;

/// [Page] is a full screen view driven by the router
///
/// A mounted page holds exactly one store listener, unmounting releases it
/// together with anything else the page owns.
pub trait Page: ComponentRender<Rect> {
    fn name(&self) -> &str;

    fn mount(&mut self, ctx: &AppContext);

    fn unmount(&mut self, ctx: &AppContext);

    fn move_with_state(self, state: &StateData) -> Self
    where
        Self: Sized;

    fn handle_key_event(&mut self, ctx: &AppContext, key: KeyEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivePage {
    WelcomePage,
    ChatPage,
}

pub struct AppRouter {
    routes: RouteTable<ActivePage>,
    active_page: Option<ActivePage>,
    //
    welcome_page: WelcomePage,
    chat_page: ChatPage,
}

impl AppRouter {
    pub fn new(state: &StateData) -> Self {
        AppRouter {
            routes: RouteTable::new()
                .route(WELCOME_PATH, ActivePage::WelcomePage)
                .route(CHAT_PATH, ActivePage::ChatPage),
            active_page: None,
            welcome_page: WelcomePage::new(state),
            chat_page: ChatPage::new(state),
        }
    }

    pub fn move_with_state(self, state: &StateData) -> Self {
        AppRouter {
            welcome_page: self.welcome_page.move_with_state(state),
            chat_page: self.chat_page.move_with_state(state),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        match self.active_page {
            Some(ActivePage::WelcomePage) => self.welcome_page.name(),
            Some(ActivePage::ChatPage) => self.chat_page.name(),
            None => "No Page",
        }
    }

    /// Resolves `location` and swaps the active page, redirects go through the navigator.
    pub fn handle_route(&mut self, ctx: &AppContext, location: &Location) {
        debug!(%location, "resolving route");

        let target = match self.routes.decide(location) {
            RouteDecision::Render(target) => target,
            RouteDecision::Redirect(target) => {
                ctx.navigator.navigate(target.path(), &[]);
                return;
            }
            RouteDecision::NotFound => {
                warn!(%location, "no page for the location");
                ctx.notices.push(format!("Nothing at {}", location.path()));
                ctx.navigator.navigate(WELCOME_PATH, &[]);
                return;
            }
        };

        if target == ActivePage::ChatPage && !resolve_active_room(&ctx.store, location) {
            info!("no active room, redirecting to the welcome page");
            ctx.navigator.navigate(WELCOME_PATH, &[]);
            return;
        }

        self.switch_to(ctx, target);
    }

    fn switch_to(&mut self, ctx: &AppContext, target: ActivePage) {
        // the outgoing page is always unmounted first, even when it is mounted again
        self.unmount_active(ctx);

        match target {
            ActivePage::WelcomePage => self.welcome_page.mount(ctx),
            ActivePage::ChatPage => self.chat_page.mount(ctx),
        }
        self.active_page = Some(target);

        debug!(page = self.name(), "page mounted");
    }

    pub fn handle_key_event(&mut self, ctx: &AppContext, key: KeyEvent) {
        match self.active_page {
            Some(ActivePage::WelcomePage) => self.welcome_page.handle_key_event(ctx, key),
            Some(ActivePage::ChatPage) => self.chat_page.handle_key_event(ctx, key),
            None => (),
        }
    }

    /// Turns the room sync conditions the user should know about into notices.
    pub fn handle_room_sync_event(&mut self, ctx: &AppContext, event: RoomSyncEvent) {
        match event {
            RoomSyncEvent::RoomNotFound { room } => {
                ctx.notices.push(format!("Room {room} not found"));
            }
            RoomSyncEvent::FeedFailed { room, reason } => {
                ctx.notices
                    .push(format!("Lost the connection to room {room}: {reason}"));
            }
            RoomSyncEvent::FeedClosed { room } => {
                ctx.notices.push(format!("Room {room} stopped updating"));
            }
            RoomSyncEvent::DecodeFailed { .. } | RoomSyncEvent::FirstSync { .. } => (),
        }
    }

    /// Unmounts the active page, if any.
    pub fn unmount_active(&mut self, ctx: &AppContext) {
        if let Some(previous) = self.active_page.take() {
            match previous {
                ActivePage::WelcomePage => self.welcome_page.unmount(ctx),
                ActivePage::ChatPage => self.chat_page.unmount(ctx),
            }
        }
    }
}

pub struct RenderProps {
    /// Shown in the status line under the active page
    pub notice: Option<String>,
}

impl ComponentRender<RenderProps> for AppRouter {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: RenderProps) {
        let [container_page, container_status] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)].as_ref())
            .split(frame.size())
        else {
            panic!("The main layout should have 2 chunks")
        };

        match self.active_page {
            Some(ActivePage::WelcomePage) => self.welcome_page.render(frame, container_page),
            Some(ActivePage::ChatPage) => self.chat_page.render(frame, container_page),
            None => (),
        }

        if let Some(notice) = props.notice {
            let status_line = Paragraph::new(Line::from(vec![
                Span::from(" ! ").bold().on_red(),
                Span::from(format!(" {notice}")),
            ]));
            frame.render_widget(status_line, container_status);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use crossterm::event::{KeyCode, KeyModifiers};
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::{
        api::RoomsApi,
        error::ActionError,
        navigation::{HistoryNavigator, RouteEvent},
        room_sync::{MemoryFeed, RoomSync},
        state_store::{storage::MemoryStorage, PersistenceAdapter, StatePatch, Store},
    };

    use super::*;

    struct OfflineApi;

    #[async_trait]
    impl RoomsApi for OfflineApi {
        async fn create_room(&self, _owner: &str) -> Result<String, ActionError> {
            Err(ActionError::validation("offline"))
        }

        async fn post_message(
            &self,
            _room_id: &str,
            _from: &str,
            _message: &str,
        ) -> Result<String, ActionError> {
            Err(ActionError::validation("offline"))
        }
    }

    fn context() -> (AppContext, UnboundedReceiver<RouteEvent>) {
        let store = Store::new(PersistenceAdapter::new(Arc::new(MemoryStorage::new())));
        store.init();
        let room_sync = RoomSync::new(store.clone(), Arc::new(MemoryFeed::new()));
        let (navigator, route_rx) = HistoryNavigator::new(Location::default());

        (
            AppContext::new(store, room_sync, Arc::new(OfflineApi), Arc::new(navigator)),
            route_rx,
        )
    }

    fn press(router: &mut AppRouter, ctx: &AppContext, code: KeyCode) {
        router.handle_key_event(ctx, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[tokio::test]
    async fn test_leaving_chat_releases_listener_and_room() {
        let (ctx, _route_rx) = context();
        ctx.store.set_state(StatePatch::new().with_room_id("R1"));
        let mut router = AppRouter::new(&ctx.store.get_state());

        router.handle_route(&ctx, &Location::parse("/chat?room=R1"));
        assert_eq!(router.active_page, Some(ActivePage::ChatPage));
        assert_eq!(ctx.store.listener_count(), 1);
        assert_eq!(ctx.room_sync.active_room().as_deref(), Some("R1"));

        router.handle_route(&ctx, &Location::parse("/welcome"));
        assert_eq!(router.active_page, Some(ActivePage::WelcomePage));
        // only the listener of the welcome page is left
        assert_eq!(ctx.store.listener_count(), 1);
        assert_eq!(ctx.room_sync.active_room(), None);

        router.unmount_active(&ctx);
        assert_eq!(ctx.store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_without_room_redirects_to_welcome() {
        let (ctx, mut route_rx) = context();
        let mut router = AppRouter::new(&ctx.store.get_state());

        router.handle_route(&ctx, &Location::parse("/chat"));

        assert_eq!(router.active_page, None);
        assert_eq!(ctx.store.listener_count(), 0);
        assert_eq!(ctx.room_sync.active_room(), None);
        match route_rx.try_recv() {
            Ok(RouteEvent::PopState(location)) => assert_eq!(location.path(), WELCOME_PATH),
            other => panic!("unexpected route event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_root_redirects_to_welcome() {
        let (ctx, mut route_rx) = context();
        let mut router = AppRouter::new(&ctx.store.get_state());

        router.handle_route(&ctx, &Location::parse("/"));

        assert_eq!(router.active_page, None);
        assert_eq!(
            route_rx.try_recv().unwrap(),
            RouteEvent::PopState(Location::new(WELCOME_PATH, &[]))
        );
    }

    #[tokio::test]
    async fn test_leaving_welcome_cancels_the_room_being_entered() {
        let (ctx, _route_rx) = context();
        ctx.store.set_state(
            StatePatch::new()
                .with_email("ana@example.com")
                .with_full_name("Ana"),
        );
        let mut router = AppRouter::new(&ctx.store.get_state());
        router.handle_route(&ctx, &Location::parse("/welcome"));

        // email and name are prefilled, pick an existing room
        press(&mut router, &ctx, KeyCode::Tab);
        press(&mut router, &ctx, KeyCode::Tab);
        press(&mut router, &ctx, KeyCode::Char(' '));
        press(&mut router, &ctx, KeyCode::Tab);
        press(&mut router, &ctx, KeyCode::Char('R'));
        press(&mut router, &ctx, KeyCode::Char('9'));
        press(&mut router, &ctx, KeyCode::Enter);
        assert_eq!(ctx.room_sync.active_room().as_deref(), Some("R9"));

        router.unmount_active(&ctx);
        assert_eq!(ctx.room_sync.active_room(), None);
        assert_eq!(ctx.store.listener_count(), 0);
    }
}
