//! Character ranges anchored inside the builder buffer.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` range of `char` indices into a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

impl Position {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Build a range from an anchor and a cursor given in either order.
    pub fn between(anchor: usize, cursor: usize) -> Self {
        Self {
            start: anchor.min(cursor),
            end: anchor.max(cursor),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether `index` falls inside the range.
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Whether the two ranges share at least one character.
    pub fn overlaps(&self, other: &Position) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Borrow the characters covered by this range, clamped to the end of `text`.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        let start = byte_offset(text, self.start);
        let end = byte_offset(text, self.end.max(self.start));
        &text[start..end]
    }
}

/// Orders ranges by ascending start. Confirmed ranges never overlap, so this is total over them.
pub fn compare_by_start(a: &Position, b: &Position) -> Ordering {
    a.start.cmp(&b.start)
}

/// Number of `char`s in `text`; every offset in the crate is expressed in this unit.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `index`-th char, or `text.len()` past the end.
pub fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
