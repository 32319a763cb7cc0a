//! The parameter store: buffer, parameters, and the pending selection.

use tracing::{debug, warn};

use crate::app::diff::first_difference;
use crate::app::render::{self, Segment};
use crate::app::template::{self, Template};
use crate::domain::color::ColorAllocator;
use crate::domain::errors::DomainError;
use crate::domain::model::{Parameter, ParameterId, Selection, SelectionRef};
use crate::domain::position::{Position, char_len};

/// Buffer shown when a builder session starts without input.
pub const DEFAULT_BUFFER: &str = include_str!("../../assets/sample.txt");

/// Owns the editable buffer and every parameter anchored to it.
///
/// All mutation goes through the methods below, each of which leaves the store satisfying its
/// invariants: selections lie inside the buffer, never overlap, cache the text they cover, and are
/// never empty.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    buffer: String,
    parameters: Vec<Parameter>,
    pending: Option<Position>,
    colors: ColorAllocator,
    next_id: u64,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl ParameterStore {
    /// Create a store over `buffer` with generated parameter colors.
    pub fn new(buffer: impl Into<String>) -> Self {
        Self::with_colors(buffer, ColorAllocator::default())
    }

    /// Create a store that draws parameter colors from `colors`.
    pub fn with_colors(buffer: impl Into<String>, colors: ColorAllocator) -> Self {
        Self {
            buffer: buffer.into(),
            parameters: Vec::new(),
            pending: None,
            colors,
            next_id: 0,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn pending_selection(&self) -> Option<Position> {
        self.pending
    }

    /// Text covered by the pending selection, if any.
    pub fn pending_text(&self) -> Option<&str> {
        self.pending.map(|position| position.slice(&self.buffer))
    }

    /// Current index of the parameter with the given identity.
    pub fn position_of(&self, id: ParameterId) -> Option<usize> {
        self.parameters
            .iter()
            .position(|parameter| parameter.id == id)
    }

    /// Record a prospective selection. An empty range clears the pending selection instead.
    pub fn set_pending_selection(&mut self, position: Position) {
        let len = char_len(&self.buffer);
        let start = position.start.min(len);
        let clamped = Position::new(start, position.end.clamp(start, len));
        self.pending = (!clamped.is_empty()).then_some(clamped);
    }

    /// Whether `position` could be confirmed as a new selection.
    pub fn is_offerable(&self, position: &Position) -> bool {
        is_offerable(&self.parameters, position)
    }

    /// Whether a pending selection exists and could be confirmed.
    pub fn pending_is_offerable(&self) -> bool {
        self.pending
            .is_some_and(|pending| self.is_offerable(&pending))
    }

    pub fn cancel_pending_selection(&mut self) {
        self.pending = None;
    }

    /// Materialize the pending selection into a parameter.
    ///
    /// With `Some(index)` the selection joins the existing parameter at that index; with `None` a
    /// new parameter is created with a fresh color. The pending selection is consumed whether or
    /// not the confirm succeeds. Returns `Ok(None)` when there was nothing confirmable pending.
    pub fn confirm_selection(
        &mut self,
        parameter_index: Option<usize>,
    ) -> Result<Option<SelectionRef>, DomainError> {
        let Some(position) = self.pending.take() else {
            return Ok(None);
        };
        if !self.is_offerable(&position) {
            warn!(
                start = position.start,
                end = position.end,
                "discarding pending selection that overlaps an existing one"
            );
            return Ok(None);
        }

        let selection = Selection::capture(&self.buffer, position);
        match parameter_index {
            Some(index) => {
                let len = self.parameters.len();
                let parameter = self
                    .parameters
                    .get_mut(index)
                    .ok_or(DomainError::IndexOutOfRange { index, len })?;
                debug!(parameter = index, text = %selection.text, "added selection to parameter");
                parameter.selections.push(selection);
                Ok(Some(SelectionRef {
                    parameter_index: index,
                    selection_index: parameter.selections.len() - 1,
                }))
            }
            None => {
                let id = ParameterId(self.next_id);
                self.next_id += 1;
                let color = self.colors.next_color();
                debug!(%id, %color, text = %selection.text, "created parameter");
                self.parameters.push(Parameter {
                    id,
                    color,
                    selections: vec![selection],
                });
                Ok(Some(SelectionRef {
                    parameter_index: self.parameters.len() - 1,
                    selection_index: 0,
                }))
            }
        }
    }

    /// Remove one selection. Indices that do not exist leave the store untouched.
    pub fn remove_selection(
        &mut self,
        parameter_index: usize,
        selection_index: usize,
    ) -> Option<Selection> {
        let parameter = self.parameters.get_mut(parameter_index)?;
        if selection_index >= parameter.selections.len() {
            return None;
        }
        let removed = parameter.selections.remove(selection_index);
        debug!(
            parameter = parameter_index,
            selection = selection_index,
            text = %removed.text,
            "removed selection"
        );
        Some(removed)
    }

    /// Remove a whole parameter. Later parameters move down one placeholder number.
    pub fn remove_parameter(&mut self, parameter_index: usize) -> Option<Parameter> {
        if parameter_index >= self.parameters.len() {
            return None;
        }
        let removed = self.parameters.remove(parameter_index);
        debug!(parameter = parameter_index, id = %removed.id, "removed parameter");
        Some(removed)
    }

    /// Drop every parameter left without selections. Returns how many were dropped.
    pub fn prune_empty_parameters(&mut self) -> usize {
        let before = self.parameters.len();
        self.parameters.retain(|parameter| !parameter.is_empty());
        before - self.parameters.len()
    }

    /// The confirmed selection covering buffer index `index`.
    pub fn selection_at(&self, index: usize) -> Option<SelectionRef> {
        self.parameters
            .iter()
            .enumerate()
            .find_map(|(parameter_index, parameter)| {
                parameter
                    .selections
                    .iter()
                    .position(|selection| selection.position.contains(index))
                    .map(|selection_index| SelectionRef {
                        parameter_index,
                        selection_index,
                    })
            })
    }

    /// Replace the buffer, shifting every selection to follow the edit.
    ///
    /// The edit is located as the first differing character and is assumed to be one contiguous
    /// insertion, deletion, or replacement. Selections emptied by the edit are removed; their
    /// parameters stay. Any pending selection is cleared because its offsets are stale.
    ///
    /// Text inserted at a boundary shared by two adjacent selections joins the right-hand one so
    /// the pair stays disjoint.
    pub fn apply_edit(&mut self, new_buffer: impl Into<String>) {
        let new_buffer = new_buffer.into();
        self.pending = None;

        if let Some(pivot) = first_difference(&self.buffer, &new_buffer) {
            let new_len = char_len(&new_buffer);
            let delta = new_len as isize - char_len(&self.buffer) as isize;
            let grow_at_end = !self
                .parameters
                .iter()
                .flat_map(|parameter| parameter.selections.iter())
                .any(|selection| selection.position.start == pivot);
            let mut dropped = 0;
            for parameter in &mut self.parameters {
                for selection in &mut parameter.selections {
                    selection.position =
                        rebase(selection.position, pivot, delta, new_len, grow_at_end);
                    selection.text = selection.position.slice(&new_buffer).to_owned();
                }
                let before = parameter.selections.len();
                parameter
                    .selections
                    .retain(|selection| !selection.text.is_empty());
                dropped += before - parameter.selections.len();
            }
            debug!(pivot, delta, dropped, "rebased selections after edit");
        }

        self.buffer = new_buffer;
    }

    /// Segments for displaying the buffer with its highlights.
    pub fn render(&self) -> Vec<Segment> {
        render::render(&self.buffer, &self.parameters, self.pending.as_ref())
    }

    /// Generate the positional template for the current buffer.
    pub fn generate(&self, script_name: &str) -> Template {
        template::generate(&self.buffer, &self.parameters, script_name)
    }
}

/// Whether `position` is non-empty and clear of every confirmed selection.
pub fn is_offerable(parameters: &[Parameter], position: &Position) -> bool {
    !position.is_empty()
        && parameters
            .iter()
            .flat_map(|parameter| parameter.selections.iter())
            .all(|selection| !selection.position.overlaps(position))
}

/// Shift one range across an edit at `pivot` that changed the length by `delta`.
///
/// An insertion exactly at the end of a range grows it unless `grow_at_end` is off; a deletion
/// right after it does not shrink it. Offsets inside a deleted region land on the edit point, so a
/// range whose text was deleted collapses to empty instead of moving in front of the edit.
fn rebase(
    position: Position,
    pivot: usize,
    delta: isize,
    new_len: usize,
    grow_at_end: bool,
) -> Position {
    let shift = |offset: usize| offset.saturating_add_signed(delta).max(pivot).min(new_len);
    let start = if position.start > pivot {
        shift(position.start)
    } else {
        position.start.min(new_len)
    };
    let end = if position.end > pivot || (grow_at_end && position.end >= pivot && delta > 0) {
        shift(position.end)
    } else {
        position.end.min(new_len)
    };
    Position::new(start, end.max(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::color::Color;

    fn store_with(buffer: &str, ranges: &[(usize, usize)]) -> ParameterStore {
        let mut store = ParameterStore::new(buffer);
        for &(start, end) in ranges {
            store.set_pending_selection(Position::new(start, end));
            store.confirm_selection(None).unwrap();
        }
        store
    }

    fn texts(store: &ParameterStore, parameter_index: usize) -> Vec<&str> {
        store.parameters()[parameter_index]
            .selections
            .iter()
            .map(|selection| selection.text.as_str())
            .collect()
    }

    #[test]
    fn default_store_uses_sample_buffer() {
        let store = ParameterStore::default();
        assert_eq!(store.buffer(), DEFAULT_BUFFER);
        assert!(store.parameters().is_empty());
        assert!(store.pending_selection().is_none());
    }

    #[test]
    fn empty_pending_selection_is_cleared() {
        let mut store = ParameterStore::new("echo foo");
        store.set_pending_selection(Position::new(5, 8));
        assert_eq!(store.pending_text(), Some("foo"));
        store.set_pending_selection(Position::new(3, 3));
        assert!(store.pending_selection().is_none());
    }

    #[test]
    fn pending_selection_is_clamped_to_buffer() {
        let mut store = ParameterStore::new("echo foo");
        store.set_pending_selection(Position::new(5, 40));
        assert_eq!(store.pending_selection(), Some(Position::new(5, 8)));
    }

    #[test]
    fn confirm_without_index_creates_parameter() {
        let mut store = ParameterStore::new("echo foo bar");
        store.set_pending_selection(Position::new(5, 8));
        let placed = store.confirm_selection(None).unwrap();
        assert_eq!(
            placed,
            Some(SelectionRef {
                parameter_index: 0,
                selection_index: 0
            })
        );
        assert_eq!(store.parameters().len(), 1);
        assert_eq!(texts(&store, 0), vec!["foo"]);
        assert!(store.pending_selection().is_none());
    }

    #[test]
    fn confirm_to_existing_parameter_appends() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.set_pending_selection(Position::new(9, 12));
        let placed = store.confirm_selection(Some(0)).unwrap();
        assert_eq!(
            placed,
            Some(SelectionRef {
                parameter_index: 0,
                selection_index: 1
            })
        );
        assert_eq!(store.parameters().len(), 1);
        assert_eq!(texts(&store, 0), vec!["foo", "bar"]);
    }

    #[test]
    fn confirm_without_index_adds_second_parameter() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.set_pending_selection(Position::new(9, 12));
        store.confirm_selection(None).unwrap();
        assert_eq!(store.parameters().len(), 2);
        assert_ne!(store.parameters()[0].id, store.parameters()[1].id);
    }

    #[test]
    fn confirm_at_length_is_out_of_range_and_consumes_pending() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.set_pending_selection(Position::new(9, 12));
        let err = store.confirm_selection(Some(1)).unwrap_err();
        assert_eq!(err, DomainError::IndexOutOfRange { index: 1, len: 1 });
        assert!(store.pending_selection().is_none());
        assert_eq!(store.parameters().len(), 1);
        assert_eq!(texts(&store, 0), vec!["foo"]);
    }

    #[test]
    fn confirm_into_empty_store_with_index_fails() {
        let mut store = ParameterStore::new("echo foo");
        store.set_pending_selection(Position::new(5, 8));
        assert!(matches!(
            store.confirm_selection(Some(0)),
            Err(DomainError::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(store.parameters().is_empty());
    }

    #[test]
    fn confirm_without_pending_is_noop() {
        let mut store = ParameterStore::new("echo foo");
        assert_eq!(store.confirm_selection(None).unwrap(), None);
        assert!(store.parameters().is_empty());
    }

    #[test]
    fn overlapping_pending_is_not_offerable_and_not_confirmed() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        assert!(!store.is_offerable(&Position::new(6, 7)));
        assert!(!store.is_offerable(&Position::new(3, 6)));
        assert!(!store.is_offerable(&Position::new(0, 12)));
        assert!(store.is_offerable(&Position::new(8, 9)));

        store.set_pending_selection(Position::new(7, 10));
        assert!(!store.pending_is_offerable());
        assert_eq!(store.confirm_selection(None).unwrap(), None);
        assert_eq!(store.parameters().len(), 1);
        assert!(store.pending_selection().is_none());
    }

    #[test]
    fn cancel_clears_pending_only() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.set_pending_selection(Position::new(9, 12));
        store.cancel_pending_selection();
        assert!(store.pending_selection().is_none());
        assert_eq!(store.parameters().len(), 1);
    }

    #[test]
    fn colors_are_assigned_once_per_parameter() {
        let palette = vec![Color::rgb(10, 20, 30), Color::rgb(40, 50, 60)];
        let mut store =
            ParameterStore::with_colors("echo foo bar", ColorAllocator::new(palette.clone()));
        store.set_pending_selection(Position::new(5, 8));
        store.confirm_selection(None).unwrap();
        store.set_pending_selection(Position::new(9, 12));
        store.confirm_selection(Some(0)).unwrap();
        assert_eq!(store.parameters()[0].color, palette[0]);

        store.remove_selection(0, 1);
        store.set_pending_selection(Position::new(9, 12));
        store.confirm_selection(None).unwrap();
        assert_eq!(store.parameters()[1].color, palette[1]);
    }

    #[test]
    fn remove_selection_keeps_empty_parameter() {
        let mut store = store_with("echo foo", &[(5, 8)]);
        let removed = store.remove_selection(0, 0).unwrap();
        assert_eq!(removed.text, "foo");
        assert_eq!(store.parameters().len(), 1);
        assert!(store.parameters()[0].is_empty());
        assert!(store.remove_selection(0, 0).is_none());
        assert!(store.remove_selection(3, 0).is_none());
    }

    #[test]
    fn removing_parameter_renumbers_placeholders() {
        let mut store = store_with("a b c", &[(0, 1), (2, 3), (4, 5)]);
        let id_of_last = store.parameters()[2].id;
        assert_eq!(store.generate("./script").script, "printf \"${0} ${1} ${2}\"");

        store.remove_parameter(0).unwrap();
        assert_eq!(store.generate("./script").script, "printf \"a ${0} ${1}\"");
        assert_eq!(store.position_of(id_of_last), Some(1));
        assert!(store.remove_parameter(5).is_none());
    }

    #[test]
    fn prune_drops_only_empty_parameters() {
        let mut store = store_with("a b c", &[(0, 1), (2, 3), (4, 5)]);
        store.remove_selection(1, 0);
        assert_eq!(store.prune_empty_parameters(), 1);
        assert_eq!(store.parameters().len(), 2);
        assert_eq!(texts(&store, 1), vec!["c"]);
    }

    #[test]
    fn selection_at_finds_covering_range() {
        let store = store_with("echo foo bar", &[(5, 8), (9, 12)]);
        assert_eq!(
            store.selection_at(6),
            Some(SelectionRef {
                parameter_index: 0,
                selection_index: 0
            })
        );
        assert_eq!(store.selection_at(8), None);
        assert_eq!(store.selection_at(11).map(|r| r.parameter_index), Some(1));
    }

    #[test]
    fn insertion_after_selection_leaves_it_alone() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.apply_edit("echo foo qbar");
        let selection = &store.parameters()[0].selections[0];
        assert_eq!(selection.position, Position::new(5, 8));
        assert_eq!(selection.text, "foo");
    }

    #[test]
    fn insertion_before_selection_shifts_it() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.apply_edit("xx echo foo bar");
        let selection = &store.parameters()[0].selections[0];
        assert_eq!(selection.position, Position::new(8, 11));
        assert_eq!(selection.text, "foo");
    }

    #[test]
    fn insertion_at_end_boundary_grows_selection() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.apply_edit("echo fooz bar");
        let selection = &store.parameters()[0].selections[0];
        assert_eq!(selection.position, Position::new(5, 9));
        assert_eq!(selection.text, "fooz");
    }

    #[test]
    fn insertion_between_adjacent_selections_joins_the_right_one() {
        let mut store = store_with("foobar", &[(0, 3), (3, 6)]);
        store.apply_edit("fooXbar");
        assert_eq!(texts(&store, 0), vec!["foo"]);
        assert_eq!(texts(&store, 1), vec!["Xbar"]);
        assert_eq!(store.parameters()[1].selections[0].position, Position::new(3, 7));
    }

    #[test]
    fn insertion_inside_selection_grows_it() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.apply_edit("echo fXoo bar");
        assert_eq!(store.parameters()[0].selections[0].text, "fXoo");
    }

    #[test]
    fn deletion_after_end_does_not_shrink() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.apply_edit("echo foobar");
        let selection = &store.parameters()[0].selections[0];
        assert_eq!(selection.position, Position::new(5, 8));
        assert_eq!(selection.text, "foo");
    }

    #[test]
    fn deletion_inside_selection_shrinks_it() {
        let mut store = store_with("echo foo bar", &[(5, 8), (9, 12)]);
        store.apply_edit("echo fo bar");
        assert_eq!(texts(&store, 0), vec!["fo"]);
        assert_eq!(store.parameters()[1].selections[0].position, Position::new(8, 11));
        assert_eq!(texts(&store, 1), vec!["bar"]);
    }

    #[test]
    fn erasing_selection_removes_it() {
        let mut store = store_with("echo foo bar", &[(5, 8), (9, 12)]);
        store.apply_edit("echo  bar");
        assert!(store.parameters()[0].is_empty());
        assert_eq!(store.parameters().len(), 2);
        assert_eq!(texts(&store, 1), vec!["bar"]);
        assert_eq!(store.parameters()[1].selections[0].position, Position::new(6, 9));
    }

    #[test]
    fn deleting_across_a_selection_start_collapses_it() {
        let mut store = store_with("echo foo bar", &[(9, 12)]);
        store.apply_edit("echo ");
        assert!(store.parameters()[0].is_empty());
        assert_eq!(store.buffer(), "echo ");
    }

    #[test]
    fn identical_edit_is_noop_and_clears_pending() {
        let mut store = store_with("echo foo", &[(5, 8)]);
        store.set_pending_selection(Position::new(0, 4));
        store.apply_edit("echo foo");
        assert!(store.pending_selection().is_none());
        assert_eq!(store.parameters()[0].selections[0].position, Position::new(5, 8));
    }

    #[test]
    fn render_includes_pending_highlight() {
        let mut store = store_with("echo foo bar", &[(5, 8)]);
        store.set_pending_selection(Position::new(9, 12));
        let segments = store.render();
        assert!(segments.iter().any(|segment| matches!(
            segment,
            Segment::Pending { text } if text == "bar"
        )));
    }
}
