use crossterm::event::KeyEvent;
use ratatui::{prelude::Backend, Frame};

pub trait Component {
    fn handle_key_event(&mut self, key: KeyEvent);
}

pub trait ComponentRender<Props> {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: Props);
}
