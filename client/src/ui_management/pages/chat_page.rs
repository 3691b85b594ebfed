use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{prelude::*, widgets::*, Frame};
use tracing::warn;

use crate::{
    actions,
    context::AppContext,
    navigation::routes::WELCOME_PATH,
    state_store::{ListenerHandle, Message, StateData},
    ui_management::components::{
        input_box::{self, InputBox},
        usage::{widget_usage_to_text, HasUsageInfo, UsageInfo},
        Component, ComponentRender,
    },
};

use super::Page;

struct Props {
    /// The room being chatted in
    room_id: String,
    /// Messages sent with this name are shown as our own
    full_name: String,
    messages: Vec<Message>,
}

impl From<&StateData> for Props {
    fn from(state: &StateData) -> Self {
        Props {
            room_id: state.room_id.clone(),
            full_name: state.full_name.clone(),
            messages: state.messages.clone(),
        }
    }
}

/// ChatPage shows the messages of the active room and sends new ones
pub struct ChatPage {
    /// State Mapped ChatPage Props
    props: Props,
    listener: Option<ListenerHandle>,
    /// Shared with the send task, which clears it once the message is accepted
    draft: Arc<Mutex<InputBox>>,
}

fn lock_draft(draft: &Mutex<InputBox>) -> MutexGuard<'_, InputBox> {
    draft.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatPage {
    pub fn new(state: &StateData) -> Self {
        ChatPage {
            props: Props::from(state),
            listener: None,
            draft: Arc::new(Mutex::new(InputBox::new())),
        }
    }

    fn send_message(&self, ctx: &AppContext) {
        let text = lock_draft(&self.draft).text().trim().to_string();
        if text.is_empty() {
            return;
        }

        let ctx = ctx.clone();
        let draft = Arc::clone(&self.draft);

        tokio::spawn(async move {
            match actions::push_message(&ctx.store, ctx.api.as_ref(), &text).await {
                Ok(_) => {
                    // keep whatever was typed while the message was in flight
                    let mut draft = lock_draft(&draft);
                    if draft.text().trim() == text {
                        draft.reset();
                    }
                }
                Err(err) => {
                    warn!(%err, "could not send the message");
                    ctx.notices.push(format!("Could not send the message: {err}"));
                }
            }

            ctx.request_redraw();
        });
    }
}

impl Page for ChatPage {
    fn name(&self) -> &str {
        "Chat Page"
    }

    fn mount(&mut self, ctx: &AppContext) {
        if let Some(previous) = self.listener.take() {
            previous.unsubscribe();
        }
        let redraw = ctx.redraw_signal();
        self.listener = Some(ctx.store.subscribe(move || redraw.notify_one()));

        let state = ctx.store.get_state();
        self.props = Props::from(state.as_ref());
        ctx.room_sync.access_to_room(&state.room_id, None);
    }

    fn unmount(&mut self, ctx: &AppContext) {
        if let Some(listener) = self.listener.take() {
            listener.unsubscribe();
        }
        ctx.room_sync.unsubscribe_from_room();
        lock_draft(&self.draft).reset();
    }

    fn move_with_state(self, state: &StateData) -> Self
    where
        Self: Sized,
    {
        ChatPage {
            props: Props::from(state),
            ..self
        }
    }

    fn handle_key_event(&mut self, ctx: &AppContext, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Esc => {
                if !ctx.navigator.back() {
                    ctx.navigator.navigate(WELCOME_PATH, &[]);
                }
            }
            KeyCode::Enter => self.send_message(ctx),
            _ => lock_draft(&self.draft).handle_key_event(key),
        }
    }
}

fn calculate_list_offset(height: u16, items_len: usize) -> usize {
    // go back by (container height - 2 for borders) to get the offset
    items_len.saturating_sub((height as usize).saturating_sub(2))
}

impl ComponentRender<Rect> for ChatPage {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let [middle, right] = *Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(75), Constraint::Percentage(25)].as_ref())
            .split(area)
        else {
            panic!("The main layout should have 2 chunks")
        };

        let [container_header, container_messages, container_input] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Min(1),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(middle)
        else {
            panic!("The middle layout should have 3 chunks")
        };

        let header = Paragraph::new(Line::from(vec![
            "Chat".bold(),
            "  room id: ".into(),
            Span::from(self.props.room_id.clone()).bold().yellow(),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, container_header);

        let message_offset =
            calculate_list_offset(container_messages.height, self.props.messages.len());
        let messages: Vec<ListItem> = self
            .props
            .messages
            .iter()
            .skip(message_offset)
            .map(|message| {
                let line = if message.from == self.props.full_name {
                    Line::from(vec![
                        Span::from(format!("{}: ", message.from)).bold().cyan(),
                        Span::raw(message.message.clone()),
                    ])
                    .alignment(Alignment::Right)
                } else {
                    Line::from(vec![
                        Span::from(format!("{}: ", message.from)).bold(),
                        Span::raw(message.message.clone()),
                    ])
                };

                ListItem::new(line)
            })
            .collect();

        let messages =
            List::new(messages).block(Block::default().borders(Borders::ALL).title("Messages"));
        frame.render_widget(messages, container_messages);

        lock_draft(&self.draft).render(
            frame,
            input_box::RenderProps {
                title: "Message".into(),
                area: container_input,
                border_color: Color::Yellow,
                show_cursor: true,
            },
        );

        let usage = Paragraph::new(widget_usage_to_text(self.usage_info()))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Usage"));
        frame.render_widget(usage, right);
    }
}

impl HasUsageInfo for ChatPage {
    fn usage_info(&self) -> UsageInfo {
        UsageInfo::new("Type your message to send it to the room")
            .line(&["Enter"], "to send your message")
            .line(&["Esc"], "to leave the room")
            .line(&["Ctrl+C"], "to exit")
    }
}
