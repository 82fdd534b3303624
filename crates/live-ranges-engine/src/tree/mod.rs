/*!
# Live range index

An augmented red-black interval tree holding half-open ranges over a text document.

Positions are delta-encoded: each node stores its bounds relative to the nearest
ancestors it hangs to the right of, and `delta` on a node shifts its whole right
subtree. Shifting every range after an edit therefore only touches the nodes on the
path to the edit, and `max_end` (relative to the node's own frame) lets searches skip
subtrees that end before the query.

Nodes live in an arena indexed by [`NodeId`]; slot 0 is a black sentinel used for
every missing link. Callers hold generational [`NodeHandle`]s.
*/

mod edit;
mod invariants;
mod node;
mod rb;
mod search;

use std::fmt;
use std::ops::Range;

use crate::error::RangeError;

pub use edit::{TextEdit, node_accept_edit};
pub use node::{
    IntervalNode, MAX_OFFSET, NodeColor, NodeHandle, RangeOptions, Stickiness, TrackedRange,
};
pub use search::InOrder;

pub(crate) use node::NodeId;

/// Default bound on `|delta|` before positions are rewritten to absolute form.
pub const DEFAULT_SAFE_DELTA_BOUND: i64 = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// Any node delta beyond this magnitude triggers a normalization pass.
    pub safe_delta_bound: i64,
    /// Run [`IntervalTree::assert_invariants`] after every mutation.
    pub verify_invariants: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        TreeOptions {
            safe_delta_bound: DEFAULT_SAFE_DELTA_BOUND,
            verify_invariants: false,
        }
    }
}

pub struct IntervalTree {
    pub(crate) nodes: Vec<IntervalNode>,
    free: Vec<NodeId>,
    pub(crate) root: NodeId,
    len: usize,
    options: TreeOptions,
    pub(crate) needs_normalization: bool,
}

impl Default for IntervalTree {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalTree {
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    pub fn with_options(options: TreeOptions) -> Self {
        IntervalTree {
            nodes: vec![IntervalNode::sentinel()],
            free: Vec::new(),
            root: NodeId::SENTINEL,
            len: 0,
            options,
            needs_normalization: false,
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Track `range` with the given edge policy.
    pub fn insert(
        &mut self,
        range: Range<usize>,
        stickiness: Stickiness,
    ) -> Result<NodeHandle, RangeError> {
        self.insert_with(range, stickiness.into())
    }

    pub fn insert_with(
        &mut self,
        range: Range<usize>,
        options: RangeOptions,
    ) -> Result<NodeHandle, RangeError> {
        check_range(&range)?;
        let id = self.alloc(IntervalNode::with_options(range.start, range.end, options));
        self.rb_insert(id);
        self.len += 1;
        self.finish_mutation();
        Ok(self.handle_of(id))
    }

    /// Stop tracking a range. The handle is invalid afterwards.
    pub fn delete(&mut self, handle: NodeHandle) -> Result<(), RangeError> {
        let id = self.live_id(handle)?;
        self.rb_delete(id);
        self.release(id);
        self.len -= 1;
        self.finish_mutation();
        Ok(())
    }

    /// Move a tracked range to a new absolute range, keeping its handle and options.
    pub fn change(&mut self, handle: NodeHandle, range: Range<usize>) -> Result<(), RangeError> {
        check_range(&range)?;
        let id = self.live_id(handle)?;
        self.rb_delete(id);
        self.node_mut(id).reset(0, range.start, range.end, NodeColor::Red);
        self.rb_insert(id);
        self.finish_mutation();
        Ok(())
    }

    /// Stickiness only matters during edits, so the node keeps its place in the tree.
    pub fn set_stickiness(
        &mut self,
        handle: NodeHandle,
        stickiness: Stickiness,
    ) -> Result<(), RangeError> {
        let id = self.live_id(handle)?;
        self.node_mut(id).stickiness = stickiness;
        Ok(())
    }

    pub fn node(&self, handle: NodeHandle) -> Result<&IntervalNode, RangeError> {
        let id = self.live_id(handle)?;
        Ok(self.node_ref(id))
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.live_id(handle).is_ok()
    }

    /// Drop every range. All outstanding handles become stale.
    pub fn clear(&mut self) {
        for index in 1..self.nodes.len() {
            let id = NodeId(index as u32);
            if self.node_ref(id).live {
                self.release(id);
            }
        }
        self.root = NodeId::SENTINEL;
        self.len = 0;
        self.needs_normalization = false;
    }

    #[inline]
    pub(crate) fn node_ref(&self, id: NodeId) -> &IntervalNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut IntervalNode {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn handle_of(&self, id: NodeId) -> NodeHandle {
        NodeHandle {
            id,
            generation: self.node_ref(id).generation,
        }
    }

    pub(crate) fn live_id(&self, handle: NodeHandle) -> Result<NodeId, RangeError> {
        match self.nodes.get(handle.id.index()) {
            Some(node)
                if handle.id != NodeId::SENTINEL
                    && node.live
                    && node.generation == handle.generation =>
            {
                Ok(handle.id)
            }
            _ => Err(RangeError::StaleHandle(handle)),
        }
    }

    fn alloc(&mut self, mut node: IntervalNode) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                node.generation = self.node_ref(id).generation;
                *self.node_mut(id) = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.live = false;
        node.generation = node.generation.wrapping_add(1);
        node.parent = NodeId::SENTINEL;
        node.left = NodeId::SENTINEL;
        node.right = NodeId::SENTINEL;
        self.free.push(id);
    }

    /// Records that a delta grew past the safe bound; the next mutation boundary normalizes.
    pub(crate) fn note_delta(&mut self, delta: i64) {
        if delta.abs() > self.options.safe_delta_bound {
            self.needs_normalization = true;
        }
    }

    fn finish_mutation(&mut self) {
        if self.needs_normalization {
            self.normalize_deltas();
        }
        if self.options.verify_invariants {
            self.assert_invariants();
        }
    }
}

fn check_range(range: &Range<usize>) -> Result<(), RangeError> {
    if range.start > range.end {
        return Err(RangeError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    if range.end > MAX_OFFSET {
        return Err(RangeError::OffsetTooLarge { offset: range.end });
    }
    Ok(())
}

impl fmt::Debug for IntervalTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.all_in_order()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ranges(tree: &IntervalTree) -> Vec<(usize, usize)> {
        tree.all_in_order().map(|r| (r.start, r.end)).collect()
    }

    #[test]
    fn insert_and_delete_track_len() {
        let mut tree = IntervalTree::new();
        assert!(tree.is_empty());

        let a = tree.insert(5..8, Stickiness::default()).unwrap();
        let b = tree.insert(1..2, Stickiness::default()).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(ranges(&tree), vec![(1, 2), (5, 8)]);

        tree.delete(a).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(ranges(&tree), vec![(1, 2)]);
        assert!(tree.contains(b));
        assert!(!tree.contains(a));
        tree.assert_invariants();
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut tree = IntervalTree::new();
        #[allow(clippy::reversed_empty_ranges)]
        let err = tree.insert(8..5, Stickiness::default()).unwrap_err();
        assert_eq!(err, RangeError::InvalidRange { start: 8, end: 5 });
        assert!(tree.is_empty());
    }

    #[test]
    fn offsets_past_the_limit_are_rejected() {
        let mut tree = IntervalTree::new();
        let err = tree.insert(0..usize::MAX, Stickiness::default()).unwrap_err();
        assert_eq!(err, RangeError::OffsetTooLarge { offset: usize::MAX });

        let handle = tree.insert(0..MAX_OFFSET, Stickiness::default()).unwrap();
        let err = tree.change(handle, 5..MAX_OFFSET + 1).unwrap_err();
        assert_eq!(err, RangeError::OffsetTooLarge { offset: MAX_OFFSET + 1 });
        assert_eq!(tree.resolve(handle).unwrap().range(), 0..MAX_OFFSET);
    }

    #[test]
    fn stale_handles_are_rejected_after_slot_reuse() {
        let mut tree = IntervalTree::new();
        let old = tree.insert(0..4, Stickiness::default()).unwrap();
        tree.delete(old).unwrap();

        let new = tree.insert(10..12, Stickiness::default()).unwrap();
        assert_eq!(old.id, new.id);
        assert_ne!(old, new);

        assert_eq!(tree.delete(old), Err(RangeError::StaleHandle(old)));
        assert!(tree.node(old).is_err());
        assert_eq!(tree.resolve(new).unwrap().range(), 10..12);
    }

    #[test]
    fn change_moves_range_and_keeps_handle() {
        let mut tree = IntervalTree::new();
        let handles: Vec<_> = (0..10)
            .map(|i| tree.insert(i * 10..i * 10 + 5, Stickiness::default()).unwrap())
            .collect();

        tree.change(handles[2], 95..99).unwrap();
        tree.assert_invariants();

        assert_eq!(tree.resolve(handles[2]).unwrap().range(), 95..99);
        let last = tree.all_in_order().last().unwrap();
        assert_eq!(last.handle, handles[2]);
    }

    #[test]
    fn set_stickiness_updates_node() {
        let mut tree = IntervalTree::new();
        let handle = tree.insert(0..4, Stickiness::default()).unwrap();
        tree.set_stickiness(handle, Stickiness::NeverGrowsWhenTypingAtEdges)
            .unwrap();
        assert_eq!(
            tree.node(handle).unwrap().stickiness(),
            Stickiness::NeverGrowsWhenTypingAtEdges
        );
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut tree = IntervalTree::new();
        let handles: Vec<_> = (0..5)
            .map(|i| tree.insert(i..i + 1, Stickiness::default()).unwrap())
            .collect();
        tree.clear();

        assert!(tree.is_empty());
        assert!(ranges(&tree).is_empty());
        assert!(handles.iter().all(|h| !tree.contains(*h)));

        let fresh = tree.insert(3..4, Stickiness::default()).unwrap();
        assert!(!handles.contains(&fresh));
        tree.assert_invariants();
    }

    #[test]
    fn verify_invariants_option_runs_checks() {
        let mut tree = IntervalTree::with_options(TreeOptions {
            verify_invariants: true,
            ..TreeOptions::default()
        });
        for i in 0..50 {
            tree.insert((i * 7) % 31..(i * 7) % 31 + i % 5, Stickiness::default())
                .unwrap();
        }
        assert_eq!(tree.len(), 50);
        assert!(tree.options().verify_invariants);
    }
}
