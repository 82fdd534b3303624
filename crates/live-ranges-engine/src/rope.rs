//! Bridge from xi-rope deltas to tree edits.

use xi_rope::delta::DeltaElement;
use xi_rope::{Delta, RopeInfo};

use crate::error::RangeError;
use crate::tree::{IntervalTree, TextEdit};

/// Split a delta into replacements that can be applied one after another.
///
/// A delta describes the new document in terms of the old one, as a sequence of
/// `Copy(from, to)` and `Insert(text)` elements. Gaps between copies are deletions.
/// Each returned edit is expressed in the coordinates of the document after all the
/// edits before it have been applied, which is what [`IntervalTree::accept_replace`]
/// expects.
pub fn edits_from_delta(delta: &Delta<RopeInfo>) -> Vec<TextEdit> {
    let mut edits = Vec::new();
    // Position in the old document.
    let mut old_pos = 0;
    // Net length change of the edits emitted so far.
    let mut shift = 0isize;
    let mut pending: Option<TextEdit> = None;

    for op in &delta.els {
        match op {
            DeltaElement::Copy(from, to) => {
                if old_pos < *from {
                    pending_at(&mut pending, old_pos, shift).range.end += from - old_pos;
                }
                if let Some(edit) = pending.take() {
                    shift += edit.len_delta();
                    edits.push(edit);
                }
                old_pos = *to;
            }
            DeltaElement::Insert(text) => {
                pending_at(&mut pending, old_pos, shift).inserted_len += text.len();
            }
        }
    }

    if old_pos < delta.base_len {
        pending_at(&mut pending, old_pos, shift).range.end += delta.base_len - old_pos;
    }
    edits.extend(pending);
    edits
}

/// The edit being accumulated at `old_pos`, started empty if there is none yet.
fn pending_at(pending: &mut Option<TextEdit>, old_pos: usize, shift: isize) -> &mut TextEdit {
    pending.get_or_insert_with(|| {
        let at = old_pos.saturating_add_signed(shift);
        TextEdit::new(at..at, 0)
    })
}

impl IntervalTree {
    /// Apply every change in an xi-rope delta, in order.
    pub fn accept_delta(
        &mut self,
        delta: &Delta<RopeInfo>,
        force_move_markers: bool,
    ) -> Result<(), RangeError> {
        for edit in edits_from_delta(delta) {
            self.accept_edit(&edit, force_move_markers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xi_rope::Rope;
    use xi_rope::delta::Builder;

    fn edits(base_len: usize, build: impl FnOnce(&mut Builder<RopeInfo>)) -> Vec<TextEdit> {
        let mut builder = Builder::new(base_len);
        build(&mut builder);
        edits_from_delta(&builder.build())
    }

    #[test]
    fn simple_insertion() {
        let edits = edits(11, |b| b.replace(5..5, Rope::from(" there")));
        assert_eq!(edits, vec![TextEdit::new(5..5, 6)]);
    }

    #[test]
    fn simple_deletion() {
        let edits = edits(11, |b| b.delete(5..11));
        assert_eq!(edits, vec![TextEdit::new(5..11, 0)]);
    }

    #[test]
    fn replacement_is_one_edit() {
        let edits = edits(11, |b| b.replace(6..11, Rope::from("Universe")));
        assert_eq!(edits, vec![TextEdit::new(6..11, 8)]);
    }

    #[test]
    fn later_edits_are_shifted_by_earlier_ones() {
        let edits = edits(20, |b| {
            b.delete(2..4);
            b.replace(10..10, Rope::from("abc"));
            b.replace(15..17, Rope::from("z"));
        });
        assert_eq!(
            edits,
            vec![
                TextEdit::new(2..4, 0),
                TextEdit::new(8..8, 3),
                TextEdit::new(16..18, 1),
            ]
        );
    }

    #[test]
    fn empty_delta_has_no_edits() {
        let edits = edits(11, |_| {});
        assert!(edits.is_empty());
    }
}
