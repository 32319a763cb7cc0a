//! Modal popups: assigning a pending selection and viewing a generated template.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::template::{Template, placeholder};
use crate::domain::model::Parameter;
use crate::ui::components::editor::{readable_foreground, swatch};
use crate::ui::components::parameters::describe;

/// Choice between the existing parameters and a trailing "new parameter" entry.
#[derive(Debug, Default, Clone)]
pub struct ConfirmPopupState {
    visible: bool,
    choice: usize,
}

impl ConfirmPopupState {
    /// Show the popup with "new parameter" preselected.
    pub fn open(&mut self, parameter_count: usize) {
        self.visible = true;
        self.choice = parameter_count;
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    pub fn is_open(&self) -> bool {
        self.visible
    }

    pub fn choice(&self) -> usize {
        self.choice
    }

    pub fn select_next(&mut self, parameter_count: usize) {
        self.choice = (self.choice + 1).min(parameter_count);
    }

    pub fn select_previous(&mut self) {
        self.choice = self.choice.saturating_sub(1);
    }

    /// Existing parameter index to join, or `None` for a new parameter.
    pub fn target(&self, parameter_count: usize) -> Option<usize> {
        (self.choice < parameter_count).then_some(self.choice)
    }
}

/// Generated template waiting to be shown.
#[derive(Debug, Default, Clone)]
pub struct TemplatePopupState {
    template: Option<Template>,
}

impl TemplatePopupState {
    pub fn open(&mut self, template: Template) {
        self.template = Some(template);
    }

    pub fn close(&mut self) {
        self.template = None;
    }

    pub fn is_open(&self) -> bool {
        self.template.is_some()
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct ConfirmPopup;

impl ConfirmPopup {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        state: &ConfirmPopupState,
        parameters: &[Parameter],
        selected_text: &str,
    ) {
        if !state.is_open() {
            return;
        }

        let height = (parameters.len() as u16).saturating_add(6).min(area.height);
        let popup = centered(area, 60, height);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title("Add selection to parameter")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let heading = Line::from(vec![
            Span::styled("Selection: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("\"{}\"", selected_text.replace('\n', "⏎"))),
        ]);
        frame.render_widget(Paragraph::new(heading), layout[0]);

        let mut items: Vec<ListItem<'static>> = parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!(" {} ", placeholder(index)),
                        Style::default()
                            .bg(swatch(&parameter.color))
                            .fg(readable_foreground(&parameter.color)),
                    ),
                    Span::raw(format!(" {}", describe(parameter))),
                ]))
            })
            .collect();
        items.push(ListItem::new(Line::styled(
            "+ new parameter",
            Style::default().fg(Color::Green),
        )));

        let list = List::new(items)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut list_state = ListState::default().with_selected(Some(state.choice()));
        frame.render_stateful_widget(list, layout[1], &mut list_state);

        let hints = Paragraph::new("j/k choose · enter confirm · n new · esc cancel")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hints, layout[2]);
    }
}

#[derive(Debug, Default)]
pub struct TemplatePopup;

impl TemplatePopup {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, state: &TemplatePopupState) {
        let Some(template) = state.template() else {
            return;
        };

        let popup = centered(area, area.width.saturating_sub(8), area.height.saturating_sub(4));
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(format!(
                "Template ({} parameters)",
                template.parameter_count
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(2),
                Constraint::Length(1),
            ])
            .split(inner);

        let script = Paragraph::new(template.script.as_str()).wrap(Wrap { trim: false });
        frame.render_widget(script, layout[0]);

        let usage = Paragraph::new(Line::from(vec![
            Span::styled("Usage: ", Style::default().fg(Color::Gray)),
            Span::styled(
                template.usage.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]))
        .block(Block::default().borders(Borders::TOP));
        frame.render_widget(usage, layout[1]);

        let hints = Paragraph::new("c copy script · esc close")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(hints, layout[2]);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
