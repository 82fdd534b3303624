//! Queries over absolute positions.
//!
//! Every traversal carries the accumulated delta of the path it is on and writes the
//! absolute bounds it computes into the node's offset cache.

use std::iter::FusedIterator;

use super::node::{to_offset, to_position};
use super::{IntervalTree, NodeHandle, NodeId, TrackedRange};
use crate::error::RangeError;

const SENTINEL: NodeId = NodeId::SENTINEL;

/// A node reached by a search, with the absolute bounds computed on the way.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Hit {
    pub(crate) id: NodeId,
    pub(crate) start: i64,
    pub(crate) end: i64,
}

impl IntervalTree {
    /// All ranges touching `[lo, hi]`, endpoints inclusive, in document order.
    ///
    /// A range ending exactly at `lo` or starting exactly at `hi` is reported.
    pub fn interval_search(&self, lo: usize, hi: usize) -> Vec<TrackedRange> {
        self.overlapping(to_position(lo), to_position(hi))
            .into_iter()
            .map(|hit| self.tracked(hit))
            .collect()
    }

    /// Like [`interval_search`](Self::interval_search), hiding ranges that belong to another owner.
    pub fn interval_search_owned(&self, lo: usize, hi: usize, owner: u32) -> Vec<TrackedRange> {
        self.overlapping(to_position(lo), to_position(hi))
            .into_iter()
            .filter(|hit| self.node_ref(hit.id).visible_to(owner))
            .map(|hit| self.tracked(hit))
            .collect()
    }

    /// Handles of every range tagged with exactly `owner`, in document order.
    pub fn owned_by(&self, owner: u32) -> Vec<NodeHandle> {
        self.all_in_order()
            .filter(|range| self.node_ref(range.handle.id).owner == owner)
            .map(|range| range.handle)
            .collect()
    }

    /// Lazy in-order traversal; each call starts over from the root.
    pub fn all_in_order(&self) -> InOrder<'_> {
        InOrder::new(self)
    }

    /// Absolute bounds of a single range, found by walking up to the root.
    pub fn resolve(&self, handle: NodeHandle) -> Result<TrackedRange, RangeError> {
        let id = self.live_id(handle)?;
        let mut delta = 0;
        let mut current = id;
        while current != self.root {
            let parent = self.node_ref(current).parent;
            if self.node_ref(parent).right == current {
                delta += self.node_ref(parent).delta;
            }
            current = parent;
        }
        let node = self.node_ref(id);
        Ok(self.tracked(Hit {
            id,
            start: node.start + delta,
            end: node.end + delta,
        }))
    }

    pub(crate) fn overlapping(&self, lo: i64, hi: i64) -> Vec<Hit> {
        let mut hits = Vec::new();
        self.collect_overlapping(self.root, 0, lo, hi, &mut hits);
        hits
    }

    fn collect_overlapping(&self, id: NodeId, delta: i64, lo: i64, hi: i64, hits: &mut Vec<Hit>) {
        if id == SENTINEL {
            return;
        }
        let node = self.node_ref(id);
        if delta + node.max_end < lo {
            // Nothing in this subtree reaches the query.
            return;
        }

        self.collect_overlapping(node.left, delta, lo, hi, hits);

        let start = delta + node.start;
        if start > hi {
            // Everything to the right starts even later.
            return;
        }
        let end = delta + node.end;
        if end >= lo {
            node.set_cached_offsets(start, end);
            hits.push(Hit { id, start, end });
        }

        self.collect_overlapping(node.right, delta + node.delta, lo, hi, hits);
    }

    fn tracked(&self, hit: Hit) -> TrackedRange {
        TrackedRange {
            handle: self.handle_of(hit.id),
            start: to_offset(hit.start),
            end: to_offset(hit.end),
        }
    }
}

/// In-order iterator over a tree, yielding absolute ranges.
pub struct InOrder<'a> {
    tree: &'a IntervalTree,
    stack: Vec<(NodeId, i64)>,
}

impl<'a> InOrder<'a> {
    fn new(tree: &'a IntervalTree) -> Self {
        let mut iter = InOrder {
            tree,
            stack: Vec::new(),
        };
        iter.push_left_spine(tree.root, 0);
        iter
    }

    fn push_left_spine(&mut self, mut id: NodeId, delta: i64) {
        while id != SENTINEL {
            self.stack.push((id, delta));
            id = self.tree.node_ref(id).left;
        }
    }
}

impl Iterator for InOrder<'_> {
    type Item = TrackedRange;

    fn next(&mut self) -> Option<TrackedRange> {
        let (id, delta) = self.stack.pop()?;
        let node = self.tree.node_ref(id);
        self.push_left_spine(node.right, delta + node.delta);

        let (start, end) = (delta + node.start, delta + node.end);
        node.set_cached_offsets(start, end);
        Some(self.tree.tracked(Hit { id, start, end }))
    }
}

impl FusedIterator for InOrder<'_> {}

impl<'a> IntoIterator for &'a IntervalTree {
    type Item = TrackedRange;
    type IntoIter = InOrder<'a>;

    fn into_iter(self) -> InOrder<'a> {
        self.all_in_order()
    }
}
