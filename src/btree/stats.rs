use serde::Serialize;

/// Structural event counters, kept per tree instance.
///
/// `splits` and `fusions` count every event; the `internal_*` fields count the
/// subset that happened on internal nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub splits: usize,
    pub internal_splits: usize,
    pub fusions: usize,
    pub internal_fusions: usize,
    pub borrows: usize,
    pub internal_borrows: usize,
}

impl TreeStats {
    /// Leaf-level splits
    pub fn leaf_splits(&self) -> usize {
        self.splits - self.internal_splits
    }

    /// Leaf-level fusions
    pub fn leaf_fusions(&self) -> usize {
        self.fusions - self.internal_fusions
    }
}
