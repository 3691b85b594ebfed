use std::{
    io::{self, Stdout},
    time::Duration,
};

use anyhow::Context;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::{broadcast, mpsc::UnboundedReceiver};
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::{
    context::AppContext,
    navigation::RouteEvent,
    termination::{Interrupted, Terminator},
    ui_management::components::ComponentRender,
};

use super::pages::{self, AppRouter};

const RENDERING_TICK_RATE: Duration = Duration::from_millis(250);

pub struct UiManager {
    ctx: AppContext,
}

impl UiManager {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn main_loop(
        self,
        mut terminator: Terminator,
        mut route_rx: UnboundedReceiver<RouteEvent>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        let ctx = self.ctx;
        let redraw = ctx.redraw_signal();
        let mut room_sync_events = ctx.room_sync.events();

        let mut app_router = AppRouter::new(&ctx.store.get_state());
        // the starting location goes through the same resolution as every later one
        app_router.handle_route(&ctx, &ctx.navigator.location());

        let mut terminal = setup_terminal()?;
        let mut ticker = tokio::time::interval(RENDERING_TICK_RATE);
        let mut crossterm_events = EventStream::new();

        let result: anyhow::Result<Interrupted> = loop {
            app_router = app_router.move_with_state(&ctx.store.get_state());

            if let Err(err) = terminal
                .draw(|frame| {
                    app_router.render(
                        frame,
                        pages::RenderProps {
                            notice: ctx.notices.get(),
                        },
                    )
                })
                .context("could not render to the terminal")
            {
                break Err(err);
            }

            tokio::select! {
                // Tick to terminate the select every N milliseconds
                _ = ticker.tick() => (),
                // Catch and handle crossterm events
                maybe_event = crossterm_events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if key.kind == KeyEventKind::Press
                            && key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL)
                        {
                            let _ = terminator.terminate(Interrupted::UserInt);

                            break Ok(Interrupted::UserInt);
                        }

                        ctx.notices.clear();
                        app_router.handle_key_event(&ctx, key);
                    },
                    None => break Ok(Interrupted::UserInt),
                    _ => (),
                },
                // Every navigation, programmatic or back, is resolved here
                Some(RouteEvent::PopState(location)) = route_rx.recv() => {
                    app_router.handle_route(&ctx, &location);
                },
                // Store listeners and finished actions ask for a redraw
                _ = redraw.notified() => (),
                Ok(event) = room_sync_events.recv() => {
                    debug!(?event, "room sync event");
                    app_router.handle_room_sync_event(&ctx, event);
                },
                // Catch and handle interrupt signal to gracefully shutdown
                Ok(interrupted) = interrupt_rx.recv() => {
                    break Ok(interrupted);
                }
            }
        };

        app_router.unmount_active(&ctx);
        restore_terminal(&mut terminal)?;
        info!("ui loop stopped");

        result
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();

    enable_raw_mode()?;

    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;

    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    Ok(terminal.show_cursor()?)
}
