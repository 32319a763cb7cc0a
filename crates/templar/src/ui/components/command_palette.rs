//! Command palette overlay for builder commands.

use std::time::{Duration, Instant};

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Commands understood by the palette, shown as a hint under the prompt.
pub const COMMANDS: &[&str] = &["generate", "export [path]", "drop <n>", "prune", "help", "quit"];

/// Input buffer and feedback line of the palette.
#[derive(Debug, Default, Clone)]
pub struct CommandPaletteState {
    visible: bool,
    input: String,
    message: Option<PaletteMessage>,
}

impl CommandPaletteState {
    /// Reveal the palette with an empty input buffer.
    pub fn open(&mut self) {
        self.visible = true;
        self.input.clear();
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Consume the current input, leaving the buffer empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub fn push_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Show `message` beneath the prompt for a few seconds.
    pub fn set_message<S: Into<String>>(&mut self, level: PaletteMessageLevel, message: S) {
        self.message = Some(PaletteMessage::new(level, message.into()));
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|message| message.text.as_str())
    }

    pub fn purge_expired_messages(&mut self) {
        if let Some(message) = &self.message
            && message.is_expired()
        {
            self.message = None;
        }
    }
}

/// Draws the palette at the bottom of the screen while it is open.
#[derive(Debug, Default)]
pub struct CommandPalette;

impl CommandPalette {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &CommandPaletteState) {
        if !state.is_open() {
            return;
        }

        let width = area.width.saturating_sub(10).min(80);
        let height = 5_u16.min(area.height);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(height + 1),
            width,
            height,
        };
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title("Commands")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        let prompt = Line::from(vec![
            Span::styled(":", Style::default().fg(Color::Cyan)),
            Span::raw(state.input().to_owned()),
        ]);
        frame.render_widget(Paragraph::new(prompt), layout[0]);

        let feedback = match &state.message {
            Some(message) => {
                let style = match message.level {
                    PaletteMessageLevel::Info => Style::default().fg(Color::Gray),
                    PaletteMessageLevel::Error => {
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                    }
                };
                Line::styled(message.text.clone(), style)
            }
            None => Line::styled(COMMANDS.join(" · "), Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(
            Paragraph::new(feedback).wrap(Wrap { trim: true }),
            layout[1],
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteMessageLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
struct PaletteMessage {
    level: PaletteMessageLevel,
    text: String,
    expires_at: Instant,
}

impl PaletteMessage {
    fn new(level: PaletteMessageLevel, text: String) -> Self {
        Self {
            level,
            text,
            expires_at: Instant::now() + Duration::from_secs(4),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn input_editing() {
        let mut state = CommandPaletteState::default();
        state.open();
        for ch in "dropx".chars() {
            state.push_char(ch);
        }
        state.pop_char();
        assert_eq!(state.input(), "drop");
        assert_eq!(state.take_input(), "drop");
        assert_eq!(state.input(), "");
    }

    #[test]
    fn renders_message_instead_of_hint() {
        let backend = TestBackend::new(60, 8);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut state = CommandPaletteState::default();
        state.open();
        state.set_message(PaletteMessageLevel::Error, "unknown command 'frob'");
        terminal
            .draw(|frame| {
                let area = frame.size();
                CommandPalette.render(frame, area, &state);
            })
            .unwrap();
        let rendered: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("unknown command 'frob'"));
        assert_eq!(state.message(), Some("unknown command 'frob'"));
    }
}
