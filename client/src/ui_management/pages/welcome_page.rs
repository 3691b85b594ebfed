use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{prelude::*, widgets::*, Frame};
use tracing::{error, info};

use crate::{
    actions,
    context::AppContext,
    navigation::routes::{CHAT_PATH, ROOM_PARAM},
    state_store::{ListenerHandle, StateData},
    ui_management::components::{
        input_box::{self, InputBox},
        usage::{widget_usage_to_text, HasUsageInfo, UsageInfo},
        Component, ComponentRender,
    },
};

use super::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Email,
    FullName,
    RoomChoice,
    RoomId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoomChoice {
    New,
    Existing,
}

impl RoomChoice {
    fn toggled(self) -> Self {
        match self {
            RoomChoice::New => RoomChoice::Existing,
            RoomChoice::Existing => RoomChoice::New,
        }
    }
}

struct Props {
    /// Email from the persisted state, used to prefill the form
    email: String,
    /// Full name from the persisted state, used to prefill the form
    full_name: String,
}

impl From<&StateData> for Props {
    fn from(state: &StateData) -> Self {
        Props {
            email: state.email.clone(),
            full_name: state.full_name.clone(),
        }
    }
}

/// WelcomePage collects the identity of the user and the room to chat in
pub struct WelcomePage {
    /// State Mapped WelcomePage Props
    props: Props,
    // Internal State
    focused: Field,
    room_choice: RoomChoice,
    /// Set while a room is being created
    creating_room: Arc<AtomicBool>,
    /// Room subscription opened by this page while waiting for the first sync
    entering_room: Option<String>,
    listener: Option<ListenerHandle>,
    // Child Components
    email: InputBox,
    full_name: InputBox,
    room_id: InputBox,
}

impl WelcomePage {
    pub fn new(state: &StateData) -> Self {
        WelcomePage {
            props: Props::from(state),
            focused: Field::Email,
            room_choice: RoomChoice::New,
            creating_room: Arc::new(AtomicBool::new(false)),
            entering_room: None,
            listener: None,
            email: InputBox::new(),
            full_name: InputBox::new(),
            room_id: InputBox::new(),
        }
    }

    fn fields(&self) -> &'static [Field] {
        match self.room_choice {
            RoomChoice::New => &[Field::Email, Field::FullName, Field::RoomChoice],
            RoomChoice::Existing => &[
                Field::Email,
                Field::FullName,
                Field::RoomChoice,
                Field::RoomId,
            ],
        }
    }

    fn focus_next(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focused).unwrap_or(0);
        self.focused = fields[(idx + 1) % fields.len()];
    }

    fn focus_previous(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focused).unwrap_or(0);
        self.focused = fields[(idx + fields.len() - 1) % fields.len()];
    }

    fn focused_input_mut(&mut self) -> Option<&mut InputBox> {
        match self.focused {
            Field::Email => Some(&mut self.email),
            Field::FullName => Some(&mut self.full_name),
            Field::RoomId => Some(&mut self.room_id),
            Field::RoomChoice => None,
        }
    }

    fn border_color(&self, field: Field) -> Color {
        if self.focused == field {
            Color::Yellow
        } else {
            Color::Reset
        }
    }

    fn submit(&mut self, ctx: &AppContext) {
        let email = self.email.text().trim().to_string();
        let full_name = self.full_name.text().trim().to_string();

        if email.is_empty() || full_name.is_empty() {
            ctx.notices.push("Please fill in your email and your name");
            return;
        }

        actions::set_email(&ctx.store, &email);
        actions::set_full_name(&ctx.store, &full_name);
        if let Err(err) = actions::sign_in(&ctx.store) {
            ctx.notices.push(err.to_string());
            return;
        }

        match self.room_choice {
            RoomChoice::New => self.create_room(ctx),
            RoomChoice::Existing => self.enter_room(ctx),
        }
    }

    fn create_room(&self, ctx: &AppContext) {
        if self.creating_room.swap(true, Ordering::SeqCst) {
            return;
        }

        let ctx = ctx.clone();
        let creating_room = Arc::clone(&self.creating_room);

        tokio::spawn(async move {
            match actions::ask_new_room(&ctx.store, ctx.api.as_ref()).await {
                Ok(room_id) => ctx
                    .navigator
                    .navigate(CHAT_PATH, &[(ROOM_PARAM, room_id.as_str())]),
                Err(err) => {
                    error!(%err, "could not create a room");
                    ctx.notices.push(format!("Could not create the room: {err}"));
                }
            }

            creating_room.store(false, Ordering::SeqCst);
            ctx.request_redraw();
        });
    }

    fn enter_room(&mut self, ctx: &AppContext) {
        let room_id = self.room_id.text().trim().to_string();

        if room_id.is_empty() {
            ctx.notices.push("Please enter a room id");
            return;
        }

        actions::set_room_id(&ctx.store, &room_id);
        info!(%room_id, "entering existing room");

        // the chat page is only opened once the room turned out to exist
        let navigator = Arc::clone(&ctx.navigator);
        let target_room = room_id.clone();
        ctx.room_sync.access_to_room(
            &room_id,
            Some(Box::new(move || {
                navigator.navigate(CHAT_PATH, &[(ROOM_PARAM, target_room.as_str())])
            })),
        );
        self.entering_room = Some(room_id);
    }
}

impl Page for WelcomePage {
    fn name(&self) -> &str {
        "Welcome Page"
    }

    fn mount(&mut self, ctx: &AppContext) {
        if let Some(previous) = self.listener.take() {
            previous.unsubscribe();
        }
        let redraw = ctx.redraw_signal();
        self.listener = Some(ctx.store.subscribe(move || redraw.notify_one()));

        self.props = Props::from(ctx.store.get_state().as_ref());
        if self.email.is_empty() {
            self.email.set_text(&self.props.email);
        }
        if self.full_name.is_empty() {
            self.full_name.set_text(&self.props.full_name);
        }
    }

    fn unmount(&mut self, ctx: &AppContext) {
        if let Some(listener) = self.listener.take() {
            listener.unsubscribe();
        }

        // another page may have replaced the subscription already
        if let Some(room_id) = self.entering_room.take() {
            if ctx.room_sync.active_room().as_deref() == Some(room_id.as_str()) {
                ctx.room_sync.unsubscribe_from_room();
            }
        }
    }

    fn move_with_state(self, state: &StateData) -> Self
    where
        Self: Sized,
    {
        WelcomePage {
            props: Props::from(state),
            ..self
        }
    }

    fn handle_key_event(&mut self, ctx: &AppContext, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_previous(),
            KeyCode::Enter => self.submit(ctx),
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if self.focused == Field::RoomChoice =>
            {
                self.room_choice = self.room_choice.toggled();
            }
            _ => {
                if let Some(input) = self.focused_input_mut() {
                    input.handle_key_event(key);
                }
            }
        }
    }
}

impl ComponentRender<Rect> for WelcomePage {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let [_, both_centered, _] = *Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                [
                    Constraint::Ratio(1, 4),
                    Constraint::Min(1),
                    Constraint::Ratio(1, 4),
                ]
                .as_ref(),
            )
            .split(area)
        else {
            panic!("The horizontal layout should have 3 chunks")
        };

        let [container_title, container_email, container_name, container_choice, container_room_id, container_usage] =
            *Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(1),
                    ]
                    .as_ref(),
                )
                .split(both_centered)
        else {
            panic!("The form layout should have 6 chunks")
        };

        let title = Paragraph::new(Line::from("Welcome".bold())).alignment(Alignment::Center);
        frame.render_widget(title, container_title);

        self.email.render(
            frame,
            input_box::RenderProps {
                title: "Email".into(),
                area: container_email,
                border_color: self.border_color(Field::Email),
                show_cursor: self.focused == Field::Email,
            },
        );
        self.full_name.render(
            frame,
            input_box::RenderProps {
                title: "Your name".into(),
                area: container_name,
                border_color: self.border_color(Field::FullName),
                show_cursor: self.focused == Field::FullName,
            },
        );

        let option = |choice: RoomChoice, label: &'static str| -> Span<'static> {
            if self.room_choice == choice {
                Span::from(format!("[x] {label}")).bold()
            } else {
                Span::from(format!("[ ] {label}"))
            }
        };
        let room_choice = Paragraph::new(Line::from(vec![
            option(RoomChoice::New, "New room"),
            "   ".into(),
            option(RoomChoice::Existing, "Existing room"),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .fg(self.border_color(Field::RoomChoice))
                .title("Room"),
        );
        frame.render_widget(room_choice, container_choice);

        if self.room_choice == RoomChoice::Existing {
            self.room_id.render(
                frame,
                input_box::RenderProps {
                    title: "Room id".into(),
                    area: container_room_id,
                    border_color: self.border_color(Field::RoomId),
                    show_cursor: self.focused == Field::RoomId,
                },
            );
        }

        let usage = Paragraph::new(widget_usage_to_text(self.usage_info()))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Usage"));
        frame.render_widget(usage, container_usage);
    }
}

impl HasUsageInfo for WelcomePage {
    fn usage_info(&self) -> UsageInfo {
        let usage = if self.creating_room.load(Ordering::SeqCst) {
            UsageInfo::new("Creating your room...")
        } else {
            UsageInfo::new("Tell us who you are and pick a room")
        };

        let usage = usage.line(&["Tab", "↓"], "to move to the next field");
        let usage = if self.focused == Field::RoomChoice {
            usage.line(&["←", "→"], "to switch between a new and an existing room")
        } else {
            usage
        };

        usage
            .line(&["Enter"], "to start chatting")
            .line(&["Ctrl+C"], "to exit")
    }
}
