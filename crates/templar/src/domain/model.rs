//! Domain models for selections and parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::color::Color;
use crate::domain::position::Position;

/// Stable identity of a parameter for the lifetime of a store.
///
/// Placeholder numbers are positional and change when earlier parameters are removed; the id never
/// does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterId(pub u64);

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A marked range of the buffer together with a snapshot of its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub text: String,
    pub position: Position,
}

impl Selection {
    /// Capture the text currently covered by `position` in `buffer`.
    pub fn capture(buffer: &str, position: Position) -> Self {
        Self {
            text: position.slice(buffer).to_owned(),
            position,
        }
    }
}

/// A group of selections sharing one placeholder and one display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: ParameterId,
    pub color: Color,
    pub selections: Vec<Selection>,
}

impl Parameter {
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

/// Location of a confirmed selection inside the parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionRef {
    pub parameter_index: usize,
    pub selection_index: usize,
}
