use std::cmp::Ordering;

use super::rb::interval_compare;
use super::{IntervalTree, NodeColor, NodeId};

const SENTINEL: NodeId = NodeId::SENTINEL;

impl IntervalTree {
    /// Full O(n) structural check, panicking on the first violation.
    ///
    /// Intended for tests and for [`TreeOptions::verify_invariants`](super::TreeOptions).
    pub fn assert_invariants(&self) {
        let sentinel = self.node_ref(SENTINEL);
        assert_eq!(sentinel.color, NodeColor::Black, "sentinel must be black");
        assert_eq!(
            (sentinel.start, sentinel.end, sentinel.delta),
            (0, 0, 0),
            "sentinel bounds must stay zero"
        );
        assert_eq!(sentinel.parent, SENTINEL, "sentinel parent left dirty");
        assert_eq!(sentinel.left, SENTINEL, "sentinel grew a left child");
        assert_eq!(sentinel.right, SENTINEL, "sentinel grew a right child");

        if self.root == SENTINEL {
            assert_eq!(self.len(), 0, "empty tree reports ranges");
            return;
        }

        let root = self.node_ref(self.root);
        assert_eq!(root.color, NodeColor::Black, "root must be black");
        assert_eq!(root.parent, SENTINEL, "root has a parent");

        let mut previous = None;
        let (count, _) = self.check_subtree(self.root, 0, &mut previous);
        assert_eq!(count, self.len(), "live node count mismatch");
    }

    /// Returns (node count, black height) of the subtree at `id`, whose frame offset is `delta`.
    ///
    /// `previous` carries the absolute bounds of the last node visited in order.
    fn check_subtree(
        &self,
        id: NodeId,
        delta: i64,
        previous: &mut Option<(i64, i64)>,
    ) -> (usize, usize) {
        if id == SENTINEL {
            return (0, 1);
        }
        let node = self.node_ref(id);
        assert!(node.live, "freed node {id:?} is still linked");
        assert!(
            node.start <= node.end,
            "node {id:?} has start {} after end {}",
            node.start,
            node.end
        );
        assert!(delta + node.start >= 0, "node {id:?} starts before 0");
        assert_eq!(
            node.max_end,
            self.compute_max_end(id),
            "stale max_end on node {id:?}"
        );

        for child in [node.left, node.right] {
            if child == SENTINEL {
                continue;
            }
            let child_node = self.node_ref(child);
            assert_eq!(child_node.parent, id, "broken parent link under {id:?}");
            if node.color == NodeColor::Red {
                assert_eq!(
                    child_node.color,
                    NodeColor::Black,
                    "red node {id:?} has a red child"
                );
            }
        }

        let (left_count, left_height) = self.check_subtree(node.left, delta, previous);

        let (start, end) = (delta + node.start, delta + node.end);
        if let Some((prev_start, prev_end)) = *previous {
            assert_ne!(
                interval_compare(prev_start, prev_end, start, end),
                Ordering::Greater,
                "node {id:?} is out of order"
            );
        }
        *previous = Some((start, end));

        let (right_count, right_height) =
            self.check_subtree(node.right, delta + node.delta, previous);
        assert_eq!(
            left_height, right_height,
            "black height differs under {id:?}"
        );

        let own = usize::from(node.color == NodeColor::Black);
        (left_count + right_count + 1, left_height + own)
    }

    /// Longest root-to-leaf path, counted in nodes.
    pub fn height(&self) -> usize {
        fn depth(tree: &IntervalTree, id: NodeId) -> usize {
            if id == SENTINEL {
                return 0;
            }
            let node = tree.node_ref(id);
            1 + depth(tree, node.left).max(depth(tree, node.right))
        }
        depth(self, self.root)
    }
}
