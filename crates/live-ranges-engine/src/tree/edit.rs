/*!
# Edit projection

Applies a text replacement to every tracked range.

Ranges touching the replaced span are pulled out of the tree, moved one at a time by
[`node_accept_edit`] and re-inserted. Ranges that start after the span are shifted
wholesale by adjusting deltas on the way down, so the cost is O(log n + k) for k
touching ranges. Ranges ending before the span are never visited.
*/

use std::ops::Range;

use super::node::to_position;
use super::{IntervalNode, IntervalTree, MAX_OFFSET, NodeId, Stickiness};
use crate::error::RangeError;

const SENTINEL: NodeId = NodeId::SENTINEL;

/// Replace `range` in the current document with `inserted_len` new characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub inserted_len: usize,
}

impl TextEdit {
    pub fn new(range: Range<usize>, inserted_len: usize) -> Self {
        TextEdit {
            range,
            inserted_len,
        }
    }

    /// Net change in document length.
    pub fn len_delta(&self) -> isize {
        let inserted = isize::try_from(self.inserted_len).unwrap_or(isize::MAX);
        let removed = isize::try_from(self.range.len()).unwrap_or(isize::MAX);
        inserted.saturating_sub(removed)
    }
}

/// How a boundary sitting exactly on a check offset resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerMove {
    /// The boundary's stickiness decides.
    MarkerDefined,
    /// The boundary is pushed past the check offset.
    ForceMove,
    /// The boundary stays at the check offset.
    ForceStay,
}

/// True if a boundary at `marker` stays where it is relative to `check`.
fn stays_before(marker: i64, sticks_to_previous: bool, check: i64, movement: MarkerMove) -> bool {
    if marker != check {
        return marker < check;
    }
    match movement {
        MarkerMove::ForceMove => false,
        MarkerMove::ForceStay => true,
        MarkerMove::MarkerDefined => sticks_to_previous,
    }
}

/// Bounds and policy of a single range during projection, in absolute offsets.
#[derive(Debug, Clone, Copy)]
struct Projection {
    start: i64,
    end: i64,
    stickiness: Stickiness,
    collapse_on_replace_edit: bool,
}

impl Projection {
    fn apply(self, edit_start: i64, edit_end: i64, inserted: i64, force: bool) -> (i64, i64) {
        let deleted = edit_end - edit_start;
        let common = deleted.min(inserted);
        let shift = inserted - deleted;

        if self.collapse_on_replace_edit && edit_start <= self.start && self.end <= edit_end {
            return (edit_start, edit_start);
        }

        // The replaced text ends on our start edge, so the whole range sits after it.
        if edit_start < edit_end && edit_end == self.start {
            let start = (self.start + shift).max(0);
            return (start, (self.end + shift).max(start));
        }

        let start_sticks = self.stickiness.start_sticks_to_previous();
        let end_sticks = self.stickiness.end_sticks_to_previous();
        let mut start = None;
        let mut end = None;

        // Boundaries before the edit stay put.
        let movement = if force {
            MarkerMove::ForceMove
        } else if deleted > 0 {
            MarkerMove::ForceStay
        } else {
            MarkerMove::MarkerDefined
        };
        if stays_before(self.start, start_sticks, edit_start, movement) {
            start = Some(self.start);
        }
        if stays_before(self.end, end_sticks, edit_start, movement) {
            end = Some(self.end);
        }

        // Boundaries inside the overwritten prefix stay put as well.
        if common > 0 && !force {
            let movement = if deleted > inserted {
                MarkerMove::ForceStay
            } else {
                MarkerMove::MarkerDefined
            };
            let check = edit_start + common;
            if start.is_none() && stays_before(self.start, start_sticks, check, movement) {
                start = Some(self.start);
            }
            if end.is_none() && stays_before(self.end, end_sticks, check, movement) {
                end = Some(self.end);
            }
        }

        // Boundaries inside the deleted tail land after the inserted text.
        let movement = if force {
            MarkerMove::ForceMove
        } else {
            MarkerMove::MarkerDefined
        };
        if start.is_none() && stays_before(self.start, start_sticks, edit_end, movement) {
            start = Some(edit_start + inserted);
        }
        if end.is_none() && stays_before(self.end, end_sticks, edit_end, movement) {
            end = Some(edit_start + inserted);
        }

        // Everything else is after the edit.
        let start = start.unwrap_or_else(|| (self.start + shift).max(0));
        let end = end.unwrap_or_else(|| (self.end + shift).max(0));
        (start, end.max(start))
    }
}

/// Move one detached node, holding absolute bounds, across the replacement of
/// `edit_start..edit_end` by `inserted_len` characters.
///
/// With `force_move_markers` set, boundaries on the edit are pushed after the inserted
/// text regardless of stickiness.
pub fn node_accept_edit(
    node: &mut IntervalNode,
    edit_start: usize,
    edit_end: usize,
    inserted_len: usize,
    force_move_markers: bool,
) {
    let projection = Projection {
        start: node.start,
        end: node.end,
        stickiness: node.stickiness,
        collapse_on_replace_edit: node.collapse_on_replace_edit,
    };
    let (start, end) = projection.apply(
        to_position(edit_start),
        to_position(edit_end),
        to_position(inserted_len),
        force_move_markers,
    );
    node.start = start;
    node.end = end;
}

impl IntervalTree {
    /// Replace `range` with `inserted_len` characters and move every range accordingly.
    pub fn accept_replace(
        &mut self,
        range: Range<usize>,
        inserted_len: usize,
        force_move_markers: bool,
    ) -> Result<(), RangeError> {
        if range.start > range.end {
            return Err(RangeError::InvalidEdit {
                start: range.start,
                end: range.end,
            });
        }
        if let Some(offset) = [range.end, inserted_len].into_iter().find(|&v| v > MAX_OFFSET) {
            return Err(RangeError::OffsetTooLarge { offset });
        }
        let (edit_start, edit_end) = (to_position(range.start), to_position(range.end));
        let shift = to_position(inserted_len) - (edit_end - edit_start);

        let touching = self.overlapping(edit_start, edit_end);
        for hit in &touching {
            self.rb_delete(hit.id);
        }

        self.shift_after(self.root, 0, edit_start, edit_end, shift);

        for hit in &touching {
            let node = self.node_mut(hit.id);
            node.start = hit.start;
            node.end = hit.end;
            node_accept_edit(
                node,
                range.start,
                range.end,
                inserted_len,
                force_move_markers,
            );
            node.max_end = node.end;
            self.rb_insert(hit.id);
        }

        log::trace!(
            "accept_replace {}..{} +{inserted_len}: {} ranges re-inserted",
            range.start,
            range.end,
            touching.len()
        );
        self.finish_mutation();
        Ok(())
    }

    pub fn accept_edit(
        &mut self,
        edit: &TextEdit,
        force_move_markers: bool,
    ) -> Result<(), RangeError> {
        self.accept_replace(edit.range.clone(), edit.inserted_len, force_move_markers)
    }

    /// Shift every range starting after `edit_end` by `shift`. Only ranges untouched by
    /// the edit remain in the tree at this point.
    fn shift_after(&mut self, id: NodeId, delta: i64, edit_start: i64, edit_end: i64, shift: i64) {
        if id == SENTINEL {
            return;
        }
        let (max_end, left) = {
            let node = self.node_ref(id);
            (node.max_end, node.left)
        };
        if delta + max_end < edit_start {
            return;
        }

        self.shift_after(left, delta, edit_start, edit_end, shift);

        let node = self.node_mut(id);
        if delta + node.start > edit_end {
            // Moving this node's frame moves its whole right subtree with it.
            node.start += shift;
            node.end += shift;
            node.delta += shift;
            let node_delta = node.delta;
            self.note_delta(node_delta);
        } else {
            let (right, right_delta) = (node.right, delta + node.delta);
            self.shift_after(right, right_delta, edit_start, edit_end, shift);
        }
        self.recompute_max_end(id);
    }

    /// Rewrite every node into absolute coordinates and zero all deltas.
    pub(crate) fn normalize_deltas(&mut self) {
        log::debug!("normalizing deltas across {} ranges", self.len());
        self.normalize_subtree(self.root, 0);
        self.needs_normalization = false;
    }

    fn normalize_subtree(&mut self, id: NodeId, delta: i64) {
        if id == SENTINEL {
            return;
        }
        let (left, right, node_delta) = {
            let node = self.node_ref(id);
            (node.left, node.right, node.delta)
        };
        self.normalize_subtree(left, delta);
        self.normalize_subtree(right, delta + node_delta);

        let node = self.node_mut(id);
        node.start += delta;
        node.end += delta;
        node.delta = 0;
        self.recompute_max_end(id);
    }
}
