//! Segment rendering for highlighted display of the buffer.

use crate::app::store::is_offerable;
use crate::domain::color::Color;
use crate::domain::model::Parameter;
use crate::domain::position::{Position, compare_by_start};

/// One contiguous run of the buffer, either plain or highlighted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain {
        text: String,
    },
    Confirmed {
        text: String,
        color: Color,
        parameter_index: usize,
        selection_index: usize,
    },
    /// The pending selection, present only while it can still be confirmed.
    Pending {
        text: String,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain { text } | Segment::Confirmed { text, .. } | Segment::Pending { text } => {
                text
            }
        }
    }

    pub fn is_highlighted(&self) -> bool {
        !matches!(self, Segment::Plain { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum Highlight {
    Confirmed {
        color: Color,
        parameter_index: usize,
        selection_index: usize,
    },
    Pending,
}

/// Split `buffer` into plain and highlighted segments ordered by position.
///
/// Concatenating the texts of the result yields `buffer` exactly. The prefix before the first
/// highlight is only emitted when non-empty; gaps between highlights and the trailing suffix are
/// always emitted, even when empty.
pub fn render(buffer: &str, parameters: &[Parameter], pending: Option<&Position>) -> Vec<Segment> {
    let mut highlights: Vec<(Position, Highlight)> = parameters
        .iter()
        .enumerate()
        .flat_map(|(parameter_index, parameter)| {
            parameter
                .selections
                .iter()
                .enumerate()
                .map(move |(selection_index, selection)| {
                    (
                        selection.position,
                        Highlight::Confirmed {
                            color: parameter.color,
                            parameter_index,
                            selection_index,
                        },
                    )
                })
        })
        .collect();

    if let Some(pending) = pending.filter(|pending| is_offerable(parameters, pending)) {
        highlights.push((*pending, Highlight::Pending));
    }
    highlights.sort_by(|(a, _), (b, _)| compare_by_start(a, b));

    let chars: Vec<char> = buffer.chars().collect();
    let text_between = |start: usize, end: usize| -> String {
        let end = end.min(chars.len());
        let start = start.min(end);
        chars[start..end].iter().collect()
    };

    let mut segments = Vec::with_capacity(highlights.len() * 2 + 1);
    let mut cursor = 0;
    for (index, (position, highlight)) in highlights.iter().enumerate() {
        if index > 0 || position.start > 0 {
            segments.push(Segment::Plain {
                text: text_between(cursor, position.start),
            });
        }

        let text = text_between(position.start, position.end);
        segments.push(match *highlight {
            Highlight::Confirmed {
                color,
                parameter_index,
                selection_index,
            } => Segment::Confirmed {
                text,
                color,
                parameter_index,
                selection_index,
            },
            Highlight::Pending => Segment::Pending { text },
        });
        cursor = position.end;
    }

    segments.push(Segment::Plain {
        text: text_between(cursor, chars.len()),
    });
    segments
}
