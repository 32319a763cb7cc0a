//! Parameter list panel.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use crate::app::template::placeholder;
use crate::domain::model::Parameter;
use crate::ui::components::editor::{readable_foreground, swatch};

/// Lists every parameter with its placeholder, color, and captured texts.
#[derive(Debug, Default)]
pub struct ParameterList;

impl ParameterList {
    pub fn render(&self, frame: &mut Frame<'_>, area: Rect, parameters: &[Parameter]) {
        let block = Block::default()
            .title(format!("Parameters ({})", parameters.len()))
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if parameters.is_empty() {
            let placeholder = Paragraph::new(
                "No parameters yet. Select text with shift+arrows, then press ctrl+a.",
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(placeholder, inner);
            return;
        }

        let items: Vec<ListItem<'static>> = parameters
            .iter()
            .enumerate()
            .map(|(index, parameter)| ListItem::new(parameter_line(index, parameter)))
            .collect();
        frame.render_widget(List::new(items), inner);
    }
}

fn parameter_line(index: usize, parameter: &Parameter) -> Line<'static> {
    let label = Span::styled(
        format!(" {} ", placeholder(index)),
        Style::default()
            .bg(swatch(&parameter.color))
            .fg(readable_foreground(&parameter.color))
            .add_modifier(Modifier::BOLD),
    );
    let detail = if parameter.is_empty() {
        Span::styled(" (no selections)", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(format!(" {}", describe(parameter)))
    };
    Line::from(vec![label, detail])
}

/// Quoted selection texts of `parameter`, newlines shown as `⏎`.
pub(crate) fn describe(parameter: &Parameter) -> String {
    parameter
        .selections
        .iter()
        .map(|selection| format!("\"{}\"", selection.text.replace('\n', "⏎")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::domain::color::Color as Swatch;
    use crate::domain::model::{ParameterId, Selection};
    use crate::domain::position::Position;

    fn parameter(texts: &[&str]) -> Parameter {
        Parameter {
            id: ParameterId(0),
            color: Swatch::rgb(0x2A, 0x9D, 0x8F),
            selections: texts
                .iter()
                .enumerate()
                .map(|(i, text)| Selection {
                    text: (*text).into(),
                    position: Position::new(i * 10, i * 10 + text.len()),
                })
                .collect(),
        }
    }

    #[test]
    fn describe_quotes_each_selection() {
        assert_eq!(describe(&parameter(&["foo", "a\nb"])), "\"foo\", \"a⏎b\"");
        assert_eq!(describe(&parameter(&[])), "");
    }

    #[test]
    fn renders_empty_state() {
        let backend = TestBackend::new(40, 6);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.size();
                ParameterList.render(frame, area, &[]);
            })
            .unwrap();
    }

    #[test]
    fn renders_placeholders() {
        let backend = TestBackend::new(40, 6);
        let mut terminal = Terminal::new(backend).unwrap();
        let parameters = vec![parameter(&["foo"]), parameter(&[])];
        terminal
            .draw(|frame| {
                let area = frame.size();
                ParameterList.render(frame, area, &parameters);
            })
            .unwrap();
        let rendered: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(rendered.contains("${0}"));
        assert!(rendered.contains("\"foo\""));
        assert!(rendered.contains("(no selections)"));
    }
}
