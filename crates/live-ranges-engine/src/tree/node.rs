use std::cell::Cell;
use std::fmt;
use std::ops::Range;

/// Index of a node slot in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub(crate) u32);

impl NodeId {
    /// Slot 0 is the shared black sentinel standing in for every missing child or parent.
    pub(crate) const SENTINEL: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable reference to a tracked range.
///
/// A handle stays valid until its range is deleted or the tree is cleared. Slots are
/// recycled, so every handle carries the generation it was issued under and stale
/// handles are rejected instead of aliasing a newer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(crate) id: NodeId,
    pub(crate) generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeColor {
    Black,
    Red,
}

/// How a range's edges react to text inserted exactly on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stickiness {
    /// Both edges absorb text typed on them.
    #[default]
    AlwaysGrowsWhenTypingAtEdges,
    /// Neither edge absorbs text typed on it.
    NeverGrowsWhenTypingAtEdges,
    /// Only the start edge absorbs text typed on it.
    GrowsOnlyWhenTypingBefore,
    /// Only the end edge absorbs text typed on it.
    GrowsOnlyWhenTypingAfter,
}

impl Stickiness {
    pub const ALL: [Stickiness; 4] = [
        Stickiness::AlwaysGrowsWhenTypingAtEdges,
        Stickiness::NeverGrowsWhenTypingAtEdges,
        Stickiness::GrowsOnlyWhenTypingBefore,
        Stickiness::GrowsOnlyWhenTypingAfter,
    ];

    /// Whether the start edge stays put when text is inserted exactly at it.
    pub(crate) fn start_sticks_to_previous(self) -> bool {
        matches!(
            self,
            Stickiness::AlwaysGrowsWhenTypingAtEdges | Stickiness::GrowsOnlyWhenTypingBefore
        )
    }

    /// Whether the end edge stays put when text is inserted exactly at it.
    pub(crate) fn end_sticks_to_previous(self) -> bool {
        matches!(
            self,
            Stickiness::NeverGrowsWhenTypingAtEdges | Stickiness::GrowsOnlyWhenTypingBefore
        )
    }
}

/// Per-range settings fixed at insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeOptions {
    pub stickiness: Stickiness,
    /// Owner tag used by owner-filtered searches. `0` means the range has no owner.
    pub owner: u32,
    /// Collapse to the edit start when an edit replaces the whole range.
    pub collapse_on_replace_edit: bool,
}

impl From<Stickiness> for RangeOptions {
    fn from(stickiness: Stickiness) -> Self {
        RangeOptions {
            stickiness,
            ..RangeOptions::default()
        }
    }
}

/// One tracked range as stored in the tree.
///
/// `start`, `end` and `max_end` are relative: a node's absolute offsets are its own
/// values plus the `delta` of every ancestor whose right subtree contains it. `delta`
/// itself shifts only this node's right subtree.
#[derive(Debug, Clone)]
pub struct IntervalNode {
    pub(crate) parent: NodeId,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,

    pub(crate) start: i64,
    pub(crate) end: i64,
    pub(crate) delta: i64,
    pub(crate) max_end: i64,
    pub(crate) color: NodeColor,

    pub(crate) stickiness: Stickiness,
    pub(crate) owner: u32,
    pub(crate) collapse_on_replace_edit: bool,

    pub(crate) generation: u32,
    pub(crate) live: bool,

    cached_start: Cell<usize>,
    cached_end: Cell<usize>,
}

impl IntervalNode {
    /// A detached red node covering the absolute range `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self::with_options(start, end, RangeOptions::default())
    }

    pub fn with_options(start: usize, end: usize, options: RangeOptions) -> Self {
        IntervalNode {
            parent: NodeId::SENTINEL,
            left: NodeId::SENTINEL,
            right: NodeId::SENTINEL,
            start: to_position(start),
            end: to_position(end),
            delta: 0,
            max_end: to_position(end),
            color: NodeColor::Red,
            stickiness: options.stickiness,
            owner: options.owner,
            collapse_on_replace_edit: options.collapse_on_replace_edit,
            generation: 0,
            live: true,
            cached_start: Cell::new(start),
            cached_end: Cell::new(end),
        }
    }

    pub(crate) fn sentinel() -> Self {
        IntervalNode {
            color: NodeColor::Black,
            live: false,
            ..IntervalNode::new(0, 0)
        }
    }

    /// Overwrite the node's position in place. The node must be detached from any tree.
    pub fn reset(&mut self, delta: i64, start: usize, end: usize, color: NodeColor) {
        self.delta = delta;
        self.start = to_position(start);
        self.end = to_position(end);
        self.max_end = to_position(end);
        self.color = color;
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    pub fn max_end(&self) -> i64 {
        self.max_end
    }

    pub fn color(&self) -> NodeColor {
        self.color
    }

    pub fn stickiness(&self) -> Stickiness {
        self.stickiness
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn collapses_on_replace_edit(&self) -> bool {
        self.collapse_on_replace_edit
    }

    /// Absolute start as of the last search or traversal that visited this node.
    pub fn cached_absolute_start(&self) -> usize {
        self.cached_start.get()
    }

    /// Absolute end as of the last search or traversal that visited this node.
    pub fn cached_absolute_end(&self) -> usize {
        self.cached_end.get()
    }

    pub(crate) fn set_cached_offsets(&self, start: i64, end: i64) {
        self.cached_start.set(to_offset(start));
        self.cached_end.set(to_offset(end));
    }

    /// Owner-filter rule: unowned ranges are visible to everyone.
    pub(crate) fn visible_to(&self, owner: u32) -> bool {
        owner == 0 || self.owner == 0 || self.owner == owner
    }
}

/// Largest offset a range or edit may name, leaving room for one edit's shift in `i64`.
pub const MAX_OFFSET: usize = (i64::MAX / 2) as usize;

pub(crate) fn to_offset(value: i64) -> usize {
    value.max(0) as usize
}

/// Saturates offsets beyond `i64::MAX`.
pub(crate) fn to_position(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// A range resolved to absolute document offsets.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackedRange {
    pub handle: NodeHandle,
    pub start: usize,
    pub end: usize,
}

impl TrackedRange {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Debug for TrackedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_node_is_detached_and_red() {
        let node = IntervalNode::new(3, 7);
        assert_eq!(node.color(), NodeColor::Red);
        assert_eq!((node.start(), node.end(), node.max_end()), (3, 7, 7));
        assert_eq!(node.delta(), 0);
        assert_eq!(node.parent, NodeId::SENTINEL);
        assert_eq!(node.stickiness(), Stickiness::AlwaysGrowsWhenTypingAtEdges);
    }

    #[test]
    fn reset_overwrites_position_and_color() {
        let mut node = IntervalNode::new(3, 7);
        node.reset(4, 10, 12, NodeColor::Black);
        assert_eq!(
            (node.delta(), node.start(), node.end(), node.max_end()),
            (4, 10, 12, 12)
        );
        assert_eq!(node.color(), NodeColor::Black);
    }

    #[test]
    fn stickiness_edges() {
        use Stickiness::*;
        let edges: Vec<(bool, bool)> = Stickiness::ALL
            .iter()
            .map(|s| (s.start_sticks_to_previous(), s.end_sticks_to_previous()))
            .collect();
        assert_eq!(
            edges,
            vec![(true, false), (false, true), (true, true), (false, false)]
        );
        assert_eq!(RangeOptions::from(NeverGrowsWhenTypingAtEdges).owner, 0);
    }

    #[test]
    fn owner_visibility() {
        let owned = IntervalNode::with_options(
            0,
            1,
            RangeOptions {
                owner: 7,
                ..RangeOptions::default()
            },
        );
        let unowned = IntervalNode::new(0, 1);
        assert!(owned.visible_to(7));
        assert!(owned.visible_to(0));
        assert!(!owned.visible_to(8));
        assert!(unowned.visible_to(8));
    }

    #[test]
    fn tracked_range_debug() {
        let range = TrackedRange {
            handle: NodeHandle {
                id: NodeId(1),
                generation: 0,
            },
            start: 5,
            end: 8,
        };
        assert_eq!(format!("{range:?}"), "[5, 8)");
        assert_eq!(range.range(), 5..8);
    }
}
