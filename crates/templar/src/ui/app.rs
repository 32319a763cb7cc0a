//! Application loop for the TUI.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{error, info, warn};

use crate::app::export::{ExportOptions, Exporter};
use crate::app::store::ParameterStore;
use crate::app::template::placeholder;
use crate::domain::position::{Position, char_len};
use crate::infra::config::Config;
use crate::ui::components::command_palette::{
    COMMANDS, CommandPalette, CommandPaletteState, PaletteMessageLevel,
};
use crate::ui::components::editor::{Editor, EditorState, splice};
use crate::ui::components::parameters::ParameterList;
use crate::ui::components::popup::{
    ConfirmPopup, ConfirmPopupState, TemplatePopup, TemplatePopupState,
};

const TICK_RATE: Duration = Duration::from_millis(120);

/// Interactive template builder: an editable buffer, its parameters, and the popups around them.
pub struct UiApp {
    config: Config,
    store: ParameterStore,
    editor: EditorState,
    editor_component: Editor,
    parameter_list: ParameterList,
    confirm: ConfirmPopupState,
    confirm_component: ConfirmPopup,
    template_view: TemplatePopupState,
    template_component: TemplatePopup,
    palette_state: CommandPaletteState,
    palette_component: CommandPalette,
    exporter: Exporter,
    status: Option<StatusMessage>,
    focus: FocusTarget,
    should_quit: bool,
}

impl UiApp {
    /// Builder over `buffer` exporting through the system clipboard.
    pub fn new(config: Config, buffer: String) -> Result<Self> {
        Ok(Self::with_exporter(config, buffer, Exporter::new()?))
    }

    pub fn with_exporter(config: Config, buffer: String, exporter: Exporter) -> Self {
        let store = ParameterStore::with_colors(buffer, config.palette.allocator());
        Self {
            config,
            store,
            editor: EditorState::default(),
            editor_component: Editor,
            parameter_list: ParameterList,
            confirm: ConfirmPopupState::default(),
            confirm_component: ConfirmPopup,
            template_view: TemplatePopupState::default(),
            template_component: TemplatePopup,
            palette_state: CommandPaletteState::default(),
            palette_component: CommandPalette,
            exporter,
            status: None,
            focus: FocusTarget::Editor,
            should_quit: false,
        }
    }

    /// Launch the terminal UI and enter the event loop.
    pub fn run(&mut self) -> Result<()> {
        info!(chars = char_len(self.store.buffer()), "starting template builder");

        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;

        let event_loop_result = self.event_loop(&mut terminal);

        disable_raw_mode().ok();
        let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
        let _ = terminal.show_cursor();

        event_loop_result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|frame| self.render(frame))?;
            self.tick();

            if self.should_quit {
                break;
            }

            if event::poll(TICK_RATE)? {
                let ev = event::read()?;
                self.handle_event(ev)?;
            }
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame<'_>) {
        let size = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(2)])
            .split(size);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(40), Constraint::Length(36)])
            .split(layout[0]);

        let right_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(6)])
            .split(main_chunks[1]);

        self.editor.scroll_to_cursor(
            self.store.buffer(),
            main_chunks[0].height.saturating_sub(2),
            main_chunks[0].width.saturating_sub(2),
        );
        let segments = self.store.render();
        self.editor_component.render(
            frame,
            main_chunks[0],
            self.store.buffer(),
            &segments,
            &self.editor,
            matches!(self.focus, FocusTarget::Editor),
        );

        self.parameter_list
            .render(frame, right_chunks[0], self.store.parameters());
        render_hints(frame, right_chunks[1]);
        self.render_status(frame, layout[1]);

        self.confirm_component.render(
            frame,
            size,
            &self.confirm,
            self.store.parameters(),
            self.store.pending_text().unwrap_or_default(),
        );
        self.template_component
            .render(frame, size, &self.template_view);
        self.palette_component
            .render(frame, size, &self.palette_state);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let line = match &self.status {
            Some(status) => {
                let style = match status.level {
                    StatusLevel::Info => Style::default().fg(Color::Gray),
                    StatusLevel::Success => Style::default().fg(Color::Green),
                    StatusLevel::Error => Style::default().fg(Color::Red),
                };
                Line::styled(status.text.clone(), style)
            }
            None => Line::styled(
                format!(
                    "Ready · {} parameters · ctrl+p for commands",
                    self.store.parameters().len()
                ),
                Style::default().fg(Color::DarkGray),
            ),
        };
        frame.render_widget(Paragraph::new(line), inner);
    }

    fn tick(&mut self) {
        if let Some(status) = &self.status
            && status.is_expired()
        {
            self.status = None;
        }
        self.palette_state.purge_expired_messages();
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(key)?,
            Event::Paste(text) if matches!(self.focus, FocusTarget::Editor) => {
                self.insert_text(&text);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        match self.focus {
            FocusTarget::CommandPalette => return self.handle_palette_key(key),
            FocusTarget::ConfirmPopup => {
                self.handle_confirm_key(key);
                return Ok(());
            }
            FocusTarget::TemplatePopup => {
                self.handle_template_key(key);
                return Ok(());
            }
            FocusTarget::Editor => {}
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('q') => {
                    self.should_quit = true;
                }
                KeyCode::Char('a') => self.open_confirm(),
                KeyCode::Char('d') => self.remove_highlight_at_cursor(),
                KeyCode::Char('g') => self.show_template(),
                KeyCode::Char('e') => {
                    if let Err(err) = self.perform_export(None) {
                        error!(error = %err, "export failed");
                        self.set_status(StatusLevel::Error, format!("Export failed: {err:#}"));
                    }
                }
                KeyCode::Char('p') => {
                    self.palette_state.open();
                    self.focus = FocusTarget::CommandPalette;
                }
                _ => {}
            }
            return Ok(());
        }

        self.handle_editor_key(key);
        Ok(())
    }

    fn handle_editor_key(&mut self, key: KeyEvent) {
        let extend = key.modifiers.contains(KeyModifiers::SHIFT);
        let text = self.store.buffer();
        match key.code {
            KeyCode::Left => self.editor.move_left(text, extend),
            KeyCode::Right => self.editor.move_right(text, extend),
            KeyCode::Up => self.editor.move_up(text, extend),
            KeyCode::Down => self.editor.move_down(text, extend),
            KeyCode::Home => self.editor.move_home(text, extend),
            KeyCode::End => self.editor.move_end(text, extend),
            KeyCode::Esc => self.editor.clear_anchor(),
            KeyCode::Enter => self.insert_text("\n"),
            KeyCode::Tab => self.insert_text("\t"),
            KeyCode::Backspace => self.delete(false),
            KeyCode::Delete => self.delete(true),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::ALT) => {
                let mut encoded = [0; 4];
                self.insert_text(ch.encode_utf8(&mut encoded));
            }
            _ => return,
        }
        self.sync_pending();
    }

    /// Mirror the editor's selection into the store's pending selection.
    fn sync_pending(&mut self) {
        match self.editor.selection() {
            Some(range) => self.store.set_pending_selection(range),
            None => self.store.cancel_pending_selection(),
        }
    }

    fn insert_text(&mut self, text: &str) {
        let cursor = self.editor.cursor();
        let range = self
            .editor
            .selection()
            .unwrap_or_else(|| Position::new(cursor, cursor));
        self.replace_range(range, text);
    }

    fn delete(&mut self, forward: bool) {
        let cursor = self.editor.cursor();
        let range = match self.editor.selection() {
            Some(range) => range,
            None if forward => Position::new(cursor, cursor + 1),
            None => Position::new(cursor.saturating_sub(1), cursor),
        };
        if range.is_empty() || range.start >= char_len(self.store.buffer()) {
            return;
        }
        self.replace_range(range, "");
    }

    fn replace_range(&mut self, range: Position, text: &str) {
        let updated = splice(self.store.buffer(), range, text);
        self.store.apply_edit(updated);
        let len = char_len(self.store.buffer());
        self.editor
            .set_cursor((range.start + char_len(text)).min(len));
    }

    fn open_confirm(&mut self) {
        if self.store.pending_is_offerable() {
            self.confirm.open(self.store.parameters().len());
            self.focus = FocusTarget::ConfirmPopup;
        } else {
            self.set_status(
                StatusLevel::Error,
                "Select text that is not highlighted yet, then press ctrl+a",
            );
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let count = self.store.parameters().len();
        match key.code {
            KeyCode::Esc => {
                self.confirm.close();
                self.focus = FocusTarget::Editor;
            }
            KeyCode::Down | KeyCode::Char('j') => self.confirm.select_next(count),
            KeyCode::Up | KeyCode::Char('k') => self.confirm.select_previous(),
            KeyCode::Char('n') => self.confirm_pending(None),
            KeyCode::Enter => self.confirm_pending(self.confirm.target(count)),
            _ => {}
        }
    }

    fn confirm_pending(&mut self, target: Option<usize>) {
        self.confirm.close();
        self.focus = FocusTarget::Editor;
        self.editor.clear_anchor();

        match self.store.confirm_selection(target) {
            Ok(Some(added)) => {
                self.set_status(
                    StatusLevel::Success,
                    format!("Marked as {}", placeholder(added.parameter_index)),
                );
            }
            Ok(None) => self.set_status(StatusLevel::Info, "Nothing to confirm"),
            Err(err) => {
                error!(error = %err, "failed to confirm selection");
                self.set_status(StatusLevel::Error, err.to_string());
            }
        }
    }

    /// Remove the highlight under the cursor, or the one ending just before it.
    fn remove_highlight_at_cursor(&mut self) {
        let cursor = self.editor.cursor();
        let found = self.store.selection_at(cursor).or_else(|| {
            cursor
                .checked_sub(1)
                .and_then(|index| self.store.selection_at(index))
        });
        let removed = found.and_then(|at| {
            self.store
                .remove_selection(at.parameter_index, at.selection_index)
                .map(|selection| (at.parameter_index, selection))
        });
        match removed {
            Some((parameter_index, selection)) => {
                self.sync_pending();
                self.set_status(
                    StatusLevel::Info,
                    format!(
                        "Removed \"{}\" from {}",
                        selection.text,
                        placeholder(parameter_index)
                    ),
                );
            }
            None => self.set_status(StatusLevel::Error, "No highlight under the cursor"),
        }
    }

    fn show_template(&mut self) {
        let template = self.store.generate(self.config.defaults.script_name());
        self.template_view.open(template);
        self.focus = FocusTarget::TemplatePopup;
    }

    fn handle_template_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') => {
                let Some(script) = self
                    .template_view
                    .template()
                    .map(|template| template.script.clone())
                else {
                    return;
                };
                match self.exporter.copy_to_clipboard(&script) {
                    Ok(()) => self.set_status(StatusLevel::Success, "Script copied to clipboard"),
                    Err(err) => {
                        error!(error = %err, "clipboard copy failed");
                        self.set_status(StatusLevel::Error, format!("Copy failed: {err:#}"));
                    }
                }
            }
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                self.template_view.close();
                self.focus = FocusTarget::Editor;
            }
            _ => {}
        }
    }

    fn handle_palette_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.palette_state.close();
                self.focus = FocusTarget::Editor;
            }
            KeyCode::Enter => {
                let input = self.palette_state.take_input();
                let command = input.trim();
                self.palette_state.close();
                self.focus = FocusTarget::Editor;
                if let Err(err) = self.execute_command(command) {
                    warn!(command, error = %err, "command failed");
                    self.palette_state.open();
                    self.palette_state
                        .set_message(PaletteMessageLevel::Error, format!("{err:#}"));
                    self.focus = FocusTarget::CommandPalette;
                }
            }
            KeyCode::Backspace => {
                self.palette_state.pop_char();
            }
            KeyCode::Char(ch) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.palette_state.push_char(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn execute_command(&mut self, command: &str) -> Result<()> {
        if command.is_empty() {
            return Ok(());
        }

        let verb = command.split_whitespace().next().unwrap_or_default();
        let rest = command[verb.len()..].trim();

        match verb {
            "generate" => self.show_template(),
            "export" => {
                let target = (!rest.is_empty()).then(|| PathBuf::from(rest));
                self.perform_export(target)?;
            }
            "drop" => {
                let index: usize = rest
                    .parse()
                    .map_err(|_| anyhow!("drop needs a parameter number, e.g. 'drop 0'"))?;
                let removed = self
                    .store
                    .remove_parameter(index)
                    .ok_or_else(|| anyhow!("no parameter {}", placeholder(index)))?;
                self.sync_pending();
                self.set_status(
                    StatusLevel::Info,
                    format!(
                        "Dropped {} with {} selections",
                        placeholder(index),
                        removed.selections.len()
                    ),
                );
            }
            "prune" => {
                let pruned = self.store.prune_empty_parameters();
                self.set_status(
                    StatusLevel::Info,
                    format!("Pruned {pruned} empty parameters"),
                );
            }
            "help" => {
                self.set_status(
                    StatusLevel::Info,
                    format!("Commands: {}", COMMANDS.join(", ")),
                );
            }
            "quit" | "q" => {
                self.should_quit = true;
            }
            other => bail!("unknown command '{other}'"),
        }
        Ok(())
    }

    fn perform_export(&mut self, target: Option<PathBuf>) -> Result<()> {
        let mut options = ExportOptions::from_config(&self.config);
        let path = match target {
            Some(path) => path,
            None => options.timestamped_path(&self.config.export.directory())?,
        };
        options.output_path = Some(path.clone());

        let template = self.store.generate(self.config.defaults.script_name());
        let result = self
            .exporter
            .export(&template, self.store.parameters(), &options)?;

        let mut message = format!("Exported template to {}", path.display());
        if result.copied_to_clipboard {
            message.push_str(" and copied the script");
        }
        self.set_status(StatusLevel::Success, message);
        Ok(())
    }

    fn set_status<S: Into<String>>(&mut self, level: StatusLevel, message: S) {
        self.status = Some(StatusMessage::new(level, message.into()));
    }
}

fn render_hints(frame: &mut Frame<'_>, area: Rect) {
    let key = |label: &'static str| Span::styled(label, Style::default().fg(Color::Cyan));
    let hints = Paragraph::new(Line::from(vec![
        key("shift+arrows"),
        Span::raw(" select · "),
        key("ctrl+a"),
        Span::raw(" mark · "),
        key("ctrl+d"),
        Span::raw(" unmark · "),
        key("ctrl+g"),
        Span::raw(" generate · "),
        key("ctrl+e"),
        Span::raw(" export · "),
        key("ctrl+p"),
        Span::raw(" commands · "),
        key("ctrl+q"),
        Span::raw(" quit"),
    ]))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Keys"))
    .style(Style::default().fg(Color::Gray));
    frame.render_widget(hints, area);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Editor,
    ConfirmPopup,
    TemplatePopup,
    CommandPalette,
}

#[derive(Debug)]
struct StatusMessage {
    level: StatusLevel,
    text: String,
    expires_at: Instant,
}

impl StatusMessage {
    fn new(level: StatusLevel, text: String) -> Self {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusLevel {
    Info,
    Success,
    Error,
}
