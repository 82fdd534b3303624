// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use live_ranges_engine::{IntervalTree, Stickiness};

/// Deterministic pseudo-random ranges: mostly short, every tenth one long.
#[allow(dead_code)]
pub fn generate_ranges(count: usize, doc_len: usize) -> Vec<(usize, usize)> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state as usize
    };
    (0..count)
        .map(|i| {
            let start = next() % doc_len;
            let max_len = if i % 10 == 0 { 400 } else { 20 };
            (start, (start + next() % max_len).min(doc_len))
        })
        .collect()
}

#[allow(dead_code)]
pub fn build_tree(ranges: &[(usize, usize)]) -> IntervalTree {
    let mut tree = IntervalTree::new();
    for (i, &(start, end)) in ranges.iter().enumerate() {
        tree.insert(start..end, Stickiness::ALL[i % 4]).unwrap();
    }
    tree
}
