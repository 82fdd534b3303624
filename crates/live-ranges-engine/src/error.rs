use crate::tree::NodeHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: usize, end: usize },
    #[error("Invalid edit: start {start} is after end {end}")]
    InvalidEdit { start: usize, end: usize },
    #[error("Offset {offset} is beyond the largest trackable offset")]
    OffsetTooLarge { offset: usize },
    #[error("Stale handle: {0:?} does not refer to a live range")]
    StaleHandle(NodeHandle),
}
