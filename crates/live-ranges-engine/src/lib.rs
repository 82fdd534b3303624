pub mod error;
pub mod rope;
pub mod tree;

// Re-export key types for easier usage
pub use error::RangeError;
pub use rope::edits_from_delta;
pub use tree::{
    DEFAULT_SAFE_DELTA_BOUND, InOrder, IntervalNode, IntervalTree, MAX_OFFSET, NodeColor,
    NodeHandle, RangeOptions, Stickiness, TextEdit, TrackedRange, TreeOptions, node_accept_edit,
};
