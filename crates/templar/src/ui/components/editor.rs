//! Buffer editor rendering the store's highlight segments.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::render::Segment;
use crate::domain::color::Color as Swatch;
use crate::domain::position::{Position, byte_offset, char_len};

const PENDING_BACKGROUND: Color = Color::Rgb(32, 52, 70);

/// Cursor, selection anchor, and scroll offsets of the editor. Offsets are char indices.
#[derive(Debug, Default, Clone)]
pub struct EditorState {
    cursor: usize,
    anchor: Option<usize>,
    scroll: u16,
    column_scroll: u16,
}

impl EditorState {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn column_scroll(&self) -> u16 {
        self.column_scroll
    }

    /// Range between the anchor and the cursor, if one is being extended and is non-empty.
    pub fn selection(&self) -> Option<Position> {
        let anchor = self.anchor?;
        let range = Position::between(anchor, self.cursor);
        (!range.is_empty()).then_some(range)
    }

    pub fn clear_anchor(&mut self) {
        self.anchor = None;
    }

    /// Place the cursor at `cursor`, dropping any selection.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.anchor = None;
    }

    pub fn move_left(&mut self, text: &str, extend: bool) {
        let target = self.cursor.min(char_len(text)).saturating_sub(1);
        self.move_to(target, extend);
    }

    pub fn move_right(&mut self, text: &str, extend: bool) {
        let target = (self.cursor + 1).min(char_len(text));
        self.move_to(target, extend);
    }

    pub fn move_up(&mut self, text: &str, extend: bool) {
        let (line, column) = line_col(text, self.cursor);
        let target = match line.checked_sub(1) {
            Some(previous) => index_at(text, previous, column),
            None => 0,
        };
        self.move_to(target, extend);
    }

    pub fn move_down(&mut self, text: &str, extend: bool) {
        let (line, column) = line_col(text, self.cursor);
        let target = if line + 1 >= line_count(text) {
            char_len(text)
        } else {
            index_at(text, line + 1, column)
        };
        self.move_to(target, extend);
    }

    pub fn move_home(&mut self, text: &str, extend: bool) {
        let (line, _) = line_col(text, self.cursor);
        self.move_to(index_at(text, line, 0), extend);
    }

    pub fn move_end(&mut self, text: &str, extend: bool) {
        let (line, _) = line_col(text, self.cursor);
        self.move_to(index_at(text, line, usize::MAX), extend);
    }

    /// Adjust both scroll offsets so the cursor is inside a `height` by `width` viewport.
    pub fn scroll_to_cursor(&mut self, text: &str, height: u16, width: u16) {
        let (line, column) = line_col(text, self.cursor);
        self.scroll = follow(self.scroll, line, height);
        self.column_scroll = follow(self.column_scroll, column, width);
    }

    fn move_to(&mut self, target: usize, extend: bool) {
        if extend {
            self.anchor.get_or_insert(self.cursor);
        } else {
            self.anchor = None;
        }
        self.cursor = target;
    }
}

/// Zero-based line and column of char index `index`.
pub fn line_col(text: &str, index: usize) -> (usize, usize) {
    text.chars()
        .take(index)
        .fold((0, 0), |(line, column), ch| {
            if ch == '\n' {
                (line + 1, 0)
            } else {
                (line, column + 1)
            }
        })
}

/// Char index of `column` on `line`, clamped to the end of that line.
pub fn index_at(text: &str, line: usize, column: usize) -> usize {
    let mut index = 0;
    for (current, content) in text.split('\n').enumerate() {
        let len = char_len(content);
        if current == line {
            return index + column.min(len);
        }
        index += len + 1;
    }
    char_len(text)
}

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Copy of `text` with the chars covered by `range` replaced by `insert`.
pub fn splice(text: &str, range: Position, insert: &str) -> String {
    let start = byte_offset(text, range.start);
    let end = byte_offset(text, range.end.max(range.start));
    let mut result = String::with_capacity(text.len() + insert.len());
    result.push_str(&text[..start]);
    result.push_str(insert);
    result.push_str(&text[end..]);
    result
}

/// Ratatui component drawing the buffer with parameter colors and the cursor.
#[derive(Debug, Default)]
pub struct Editor;

impl Editor {
    pub fn render(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        text: &str,
        segments: &[Segment],
        state: &EditorState,
        has_focus: bool,
    ) {
        let block = Block::default()
            .title("Buffer")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if has_focus {
                Color::Cyan
            } else {
                Color::DarkGray
            }));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let paragraph = Paragraph::new(build_lines(segments))
            .scroll((state.scroll, state.column_scroll));
        frame.render_widget(paragraph, inner);

        if has_focus {
            let (line, column) = line_col(text, state.cursor);
            let row = line.saturating_sub(usize::from(state.scroll));
            let column = column.saturating_sub(usize::from(state.column_scroll));
            if row < usize::from(inner.height) && column < usize::from(inner.width) {
                frame.set_cursor(inner.x + column as u16, inner.y + row as u16);
            }
        }
    }
}

/// Smallest change to `offset` that keeps `target` within `extent` cells.
fn follow(offset: u16, target: usize, extent: u16) -> u16 {
    if extent == 0 {
        return offset;
    }
    let target = u16::try_from(target).unwrap_or(u16::MAX);
    if target < offset {
        target
    } else if target >= offset.saturating_add(extent) {
        target - extent + 1
    } else {
        offset
    }
}

/// Split segments into display lines. Tabs are shown as a single space so columns match chars.
pub fn build_lines(segments: &[Segment]) -> Vec<Line<'static>> {
    let mut lines = vec![Line::default()];
    for segment in segments {
        let style = segment_style(segment);
        for (index, piece) in segment.text().split('\n').enumerate() {
            if index > 0 {
                lines.push(Line::default());
            }
            if piece.is_empty() {
                continue;
            }
            if let Some(line) = lines.last_mut() {
                line.spans
                    .push(Span::styled(piece.replace('\t', " "), style));
            }
        }
    }
    lines
}

fn segment_style(segment: &Segment) -> Style {
    match segment {
        Segment::Plain { .. } => Style::default(),
        Segment::Confirmed { color, .. } => Style::default()
            .bg(swatch(color))
            .fg(readable_foreground(color)),
        Segment::Pending { .. } => Style::default()
            .bg(PENDING_BACKGROUND)
            .add_modifier(Modifier::UNDERLINED),
    }
}

/// Terminal color for a parameter color.
pub fn swatch(color: &Swatch) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Black or white, whichever reads better on `color`.
pub fn readable_foreground(color: &Swatch) -> Color {
    if color.luminance() > 0.5 {
        Color::Black
    } else {
        Color::White
    }
}
