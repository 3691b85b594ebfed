use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::{api::RoomsApi, navigation::Navigator, room_sync::RoomSync, state_store::Store};

/// [AppContext] is created once at start and handed to every page
#[derive(Clone)]
pub struct AppContext {
    pub store: Store,
    pub room_sync: RoomSync,
    pub api: Arc<dyn RoomsApi>,
    pub navigator: Arc<dyn Navigator>,
    pub notices: NoticeBoard,
    redraw: Arc<Notify>,
}

impl AppContext {
    pub fn new(
        store: Store,
        room_sync: RoomSync,
        api: Arc<dyn RoomsApi>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        AppContext {
            store,
            room_sync,
            api,
            navigator,
            notices: NoticeBoard::default(),
            redraw: Arc::new(Notify::new()),
        }
    }

    /// Wakes the UI loop, a wake up requested while it is busy is not lost.
    pub fn request_redraw(&self) {
        self.redraw.notify_one();
    }

    pub fn redraw_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.redraw)
    }
}

/// [NoticeBoard] holds the latest user visible notice, shown in the status line
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    current: Arc<Mutex<Option<String>>>,
}

impl NoticeBoard {
    fn current(&self) -> MutexGuard<'_, Option<String>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, notice: impl Into<String>) {
        *self.current() = Some(notice.into());
    }

    pub fn get(&self) -> Option<String> {
        self.current().clone()
    }

    pub fn clear(&self) {
        self.current().take();
    }
}
