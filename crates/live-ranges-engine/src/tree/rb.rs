//! Red-black maintenance with delta-aware rotations.
//!
//! Every routine here keeps each node's absolute position unchanged while links move:
//! whenever a node changes which ancestors it hangs to the right of, its relative
//! `start`, `end` and `delta` are adjusted by the deltas it gained or lost.

use std::cmp::Ordering;

use super::{IntervalTree, NodeColor, NodeId};

const SENTINEL: NodeId = NodeId::SENTINEL;

/// Order by start, then by end.
pub(crate) fn interval_compare(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> Ordering {
    a_start.cmp(&b_start).then(a_end.cmp(&b_end))
}

impl IntervalTree {
    #[inline]
    fn parent_of(&self, id: NodeId) -> NodeId {
        self.node_ref(id).parent
    }

    #[inline]
    fn left_of(&self, id: NodeId) -> NodeId {
        self.node_ref(id).left
    }

    #[inline]
    fn right_of(&self, id: NodeId) -> NodeId {
        self.node_ref(id).right
    }

    #[inline]
    fn color_of(&self, id: NodeId) -> NodeColor {
        self.node_ref(id).color
    }

    #[inline]
    fn set_color(&mut self, id: NodeId, color: NodeColor) {
        if id != SENTINEL {
            self.node_mut(id).color = color;
        }
    }

    /// Move a node into a frame `by` lower: its bounds and its right subtree shift up by `by`.
    fn shift_frame(&mut self, id: NodeId, by: i64) {
        if id == SENTINEL {
            return;
        }
        let node = self.node_mut(id);
        node.start += by;
        node.end += by;
        node.delta += by;
        let delta = node.delta;
        self.note_delta(delta);
    }

    pub(crate) fn compute_max_end(&self, id: NodeId) -> i64 {
        let node = self.node_ref(id);
        let mut max_end = node.end;
        if node.left != SENTINEL {
            max_end = max_end.max(self.node_ref(node.left).max_end);
        }
        if node.right != SENTINEL {
            max_end = max_end.max(self.node_ref(node.right).max_end + node.delta);
        }
        max_end
    }

    pub(crate) fn recompute_max_end(&mut self, id: NodeId) {
        if id != SENTINEL {
            self.node_mut(id).max_end = self.compute_max_end(id);
        }
    }

    /// Walk up from `id`, stopping at the first ancestor whose `max_end` is unaffected.
    pub(crate) fn recompute_max_end_to_root(&mut self, mut id: NodeId) {
        while id != SENTINEL {
            let max_end = self.compute_max_end(id);
            if self.node_ref(id).max_end == max_end {
                return;
            }
            self.node_mut(id).max_end = max_end;
            id = self.parent_of(id);
        }
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while self.left_of(id) != SENTINEL {
            id = self.left_of(id);
        }
        id
    }

    /// Replace `old` with `new` in the child slot of `parent`, or as root.
    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if parent == SENTINEL {
            self.root = new;
        } else if self.left_of(parent) == old {
            self.node_mut(parent).left = new;
        } else {
            self.node_mut(parent).right = new;
        }
    }

    fn rotate_left(&mut self, x: NodeId) {
        let y = self.right_of(x);

        // y leaves x's right subtree, so it absorbs x's delta.
        let x_delta = self.node_ref(x).delta;
        self.shift_frame(y, x_delta);

        let y_left = self.left_of(y);
        self.node_mut(x).right = y_left;
        if y_left != SENTINEL {
            self.node_mut(y_left).parent = x;
        }

        let x_parent = self.parent_of(x);
        self.node_mut(y).parent = x_parent;
        self.replace_child(x_parent, x, y);

        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;

        self.recompute_max_end(x);
        self.recompute_max_end(y);
    }

    fn rotate_right(&mut self, y: NodeId) {
        let x = self.left_of(y);

        // y moves into x's right subtree and must not count x's delta twice.
        let x_delta = self.node_ref(x).delta;
        self.shift_frame(y, -x_delta);

        let x_right = self.right_of(x);
        self.node_mut(y).left = x_right;
        if x_right != SENTINEL {
            self.node_mut(x_right).parent = y;
        }

        let y_parent = self.parent_of(y);
        self.node_mut(x).parent = y_parent;
        self.replace_child(y_parent, y, x);

        self.node_mut(x).right = y;
        self.node_mut(y).parent = x;

        self.recompute_max_end(y);
        self.recompute_max_end(x);
    }

    /// Plain BST descent. `z` holds absolute bounds and leaves with bounds relative to its parent.
    fn tree_insert(&mut self, z: NodeId) {
        let (z_start, z_end) = {
            let node = self.node_ref(z);
            (node.start, node.end)
        };

        let mut delta = 0;
        let mut x = self.root;
        let (parent, frame) = loop {
            let node = self.node_ref(x);
            let (x_left, x_right, x_delta) = (node.left, node.right, node.delta);
            let cmp = interval_compare(z_start, z_end, node.start + delta, node.end + delta);
            if cmp == Ordering::Less {
                if x_left == SENTINEL {
                    self.node_mut(x).left = z;
                    break (x, delta);
                }
                x = x_left;
            } else {
                if x_right == SENTINEL {
                    self.node_mut(x).right = z;
                    break (x, delta + x_delta);
                }
                delta += x_delta;
                x = x_right;
            }
        };

        let node = self.node_mut(z);
        node.start -= frame;
        node.end -= frame;
        node.max_end -= frame;
        node.parent = parent;
        node.left = SENTINEL;
        node.right = SENTINEL;
        node.color = NodeColor::Red;
    }

    pub(crate) fn rb_insert(&mut self, z: NodeId) {
        {
            let node = self.node_mut(z);
            node.delta = 0;
            node.max_end = node.end;
            node.left = SENTINEL;
            node.right = SENTINEL;
        }

        if self.root == SENTINEL {
            let node = self.node_mut(z);
            node.parent = SENTINEL;
            node.color = NodeColor::Black;
            self.root = z;
            return;
        }

        self.tree_insert(z);
        self.recompute_max_end_to_root(self.parent_of(z));

        let mut x = z;
        while x != self.root && self.color_of(self.parent_of(x)) == NodeColor::Red {
            let parent = self.parent_of(x);
            let grandparent = self.parent_of(parent);
            if parent == self.left_of(grandparent) {
                let uncle = self.right_of(grandparent);
                if self.color_of(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grandparent, NodeColor::Red);
                    x = grandparent;
                } else {
                    if x == self.right_of(parent) {
                        x = parent;
                        self.rotate_left(x);
                    }
                    let parent = self.parent_of(x);
                    let grandparent = self.parent_of(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grandparent, NodeColor::Red);
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.left_of(grandparent);
                if self.color_of(uncle) == NodeColor::Red {
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(uncle, NodeColor::Black);
                    self.set_color(grandparent, NodeColor::Red);
                    x = grandparent;
                } else {
                    if x == self.left_of(parent) {
                        x = parent;
                        self.rotate_right(x);
                    }
                    let parent = self.parent_of(x);
                    let grandparent = self.parent_of(parent);
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(grandparent, NodeColor::Red);
                    self.rotate_left(grandparent);
                }
            }
        }

        let root = self.root;
        self.set_color(root, NodeColor::Black);
    }

    /// Unlink `z`. The node itself is always the one removed; a successor takes its slot
    /// in the shape instead of swapping payloads, so handles to other nodes stay put.
    pub(crate) fn rb_delete(&mut self, z: NodeId) {
        let (z_left, z_right, z_delta) = {
            let node = self.node_ref(z);
            (node.left, node.right, node.delta)
        };

        let (x, y) = if z_left == SENTINEL {
            let x = z_right;
            // x moves up out of z's right subtree.
            self.shift_frame(x, z_delta);
            (x, z)
        } else if z_right == SENTINEL {
            (z_left, z)
        } else {
            let y = self.leftmost(z_right);
            let x = self.right_of(y);
            let y_delta = self.node_ref(y).delta;
            // x replaces y, leaving y's right subtree.
            self.shift_frame(x, y_delta);
            // y takes z's place and inherits z's frame and right-subtree offset.
            let node = self.node_mut(y);
            node.start += z_delta;
            node.end += z_delta;
            node.delta = z_delta;
            self.note_delta(z_delta);
            (x, y)
        };

        if y == self.root {
            self.root = x;
            self.set_color(x, NodeColor::Black);
            self.detach(z);
            self.reset_sentinel();
            self.recompute_max_end(x);
            if x != SENTINEL {
                self.node_mut(x).parent = SENTINEL;
            }
            return;
        }

        let y_was_red = self.color_of(y) == NodeColor::Red;

        let y_parent = self.parent_of(y);
        if y == self.left_of(y_parent) {
            self.node_mut(y_parent).left = x;
        } else {
            self.node_mut(y_parent).right = x;
        }

        // The sentinel's parent slot is scratch space here: the fix-up below reads it
        // when x is the sentinel. `reset_sentinel` clears it before `rb_delete` returns.
        if y == z {
            self.node_mut(x).parent = y_parent;
        } else {
            self.node_mut(x).parent = if y_parent == z { y } else { y_parent };

            let (left, right, parent, color) = {
                let node = self.node_ref(z);
                (node.left, node.right, node.parent, node.color)
            };
            {
                let node = self.node_mut(y);
                node.left = left;
                node.right = right;
                node.parent = parent;
                node.color = color;
            }
            self.replace_child(parent, z, y);
            if left != SENTINEL {
                self.node_mut(left).parent = y;
            }
            if right != SENTINEL {
                self.node_mut(right).parent = y;
            }
        }

        self.detach(z);

        if y_was_red {
            self.recompute_max_end_to_root(self.parent_of(x));
            if y != z {
                self.recompute_max_end_to_root(y);
                self.recompute_max_end_to_root(self.parent_of(y));
            }
            self.reset_sentinel();
            return;
        }

        self.recompute_max_end_to_root(x);
        self.recompute_max_end_to_root(self.parent_of(x));
        if y != z {
            self.recompute_max_end_to_root(y);
            self.recompute_max_end_to_root(self.parent_of(y));
        }

        self.delete_fixup(x);
        self.reset_sentinel();
    }

    fn delete_fixup(&mut self, mut x: NodeId) {
        while x != self.root && self.color_of(x) == NodeColor::Black {
            let parent = self.parent_of(x);
            if x == self.left_of(parent) {
                let mut w = self.right_of(parent);
                if self.color_of(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.rotate_left(parent);
                    w = self.right_of(self.parent_of(x));
                }

                if self.color_of(self.left_of(w)) == NodeColor::Black
                    && self.color_of(self.right_of(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = self.parent_of(x);
                } else {
                    if self.color_of(self.right_of(w)) == NodeColor::Black {
                        self.set_color(self.left_of(w), NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.rotate_right(w);
                        w = self.right_of(self.parent_of(x));
                    }
                    let parent = self.parent_of(x);
                    self.set_color(w, self.color_of(parent));
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(self.right_of(w), NodeColor::Black);
                    self.rotate_left(parent);
                    x = self.root;
                }
            } else {
                let mut w = self.left_of(parent);
                if self.color_of(w) == NodeColor::Red {
                    self.set_color(w, NodeColor::Black);
                    self.set_color(parent, NodeColor::Red);
                    self.rotate_right(parent);
                    w = self.left_of(self.parent_of(x));
                }

                if self.color_of(self.left_of(w)) == NodeColor::Black
                    && self.color_of(self.right_of(w)) == NodeColor::Black
                {
                    self.set_color(w, NodeColor::Red);
                    x = self.parent_of(x);
                } else {
                    if self.color_of(self.left_of(w)) == NodeColor::Black {
                        self.set_color(self.right_of(w), NodeColor::Black);
                        self.set_color(w, NodeColor::Red);
                        self.rotate_left(w);
                        w = self.left_of(self.parent_of(x));
                    }
                    let parent = self.parent_of(x);
                    self.set_color(w, self.color_of(parent));
                    self.set_color(parent, NodeColor::Black);
                    self.set_color(self.left_of(w), NodeColor::Black);
                    self.rotate_right(parent);
                    x = self.root;
                }
            }
        }
        self.set_color(x, NodeColor::Black);
    }

    fn detach(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.parent = SENTINEL;
        node.left = SENTINEL;
        node.right = SENTINEL;
    }

    fn reset_sentinel(&mut self) {
        self.node_mut(SENTINEL).parent = SENTINEL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Stickiness;
    use pretty_assertions::assert_eq;

    fn absolute(tree: &IntervalTree) -> Vec<(usize, usize)> {
        tree.all_in_order().map(|r| (r.start, r.end)).collect()
    }

    #[test]
    fn compare_orders_by_start_then_end() {
        assert_eq!(interval_compare(1, 5, 2, 3), Ordering::Less);
        assert_eq!(interval_compare(2, 5, 2, 3), Ordering::Greater);
        assert_eq!(interval_compare(2, 3, 2, 3), Ordering::Equal);
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree = IntervalTree::new();
        for i in 0..1000 {
            tree.insert(i..i + 3, Stickiness::default()).unwrap();
        }
        tree.assert_invariants();
        // Red-black height bound: 2 * log2(n + 1).
        assert!(tree.height() <= 20, "height {}", tree.height());
    }

    #[test]
    fn rotations_preserve_absolute_positions() {
        let mut tree = IntervalTree::new();
        let expected: Vec<(usize, usize)> = (0..64).map(|i| (i * 3, i * 3 + 10)).collect();
        for &(start, end) in expected.iter().rev() {
            tree.insert(start..end, Stickiness::default()).unwrap();
            tree.assert_invariants();
        }
        assert_eq!(absolute(&tree), expected);
    }

    #[test]
    fn delete_every_other_node() {
        let mut tree = IntervalTree::new();
        let handles: Vec<_> = (0..200)
            .map(|i| {
                tree.insert((i * 37) % 101..(i * 37) % 101 + i % 7, Stickiness::default())
                    .unwrap()
            })
            .collect();
        for handle in handles.iter().step_by(2) {
            tree.delete(*handle).unwrap();
            tree.assert_invariants();
        }
        assert_eq!(tree.len(), 100);
        for handle in handles.iter().skip(1).step_by(2) {
            assert!(tree.contains(*handle));
        }
    }

    #[test]
    fn delete_root_until_empty() {
        let mut tree = IntervalTree::new();
        for i in 0..40 {
            tree.insert(i..i * 2, Stickiness::default()).unwrap();
        }
        while !tree.is_empty() {
            let root = tree.handle_of(tree.root);
            tree.delete(root).unwrap();
            tree.assert_invariants();
        }
        assert_eq!(tree.root, SENTINEL);
        assert_eq!(tree.node_ref(SENTINEL).parent, SENTINEL);
    }
}
