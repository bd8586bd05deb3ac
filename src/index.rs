//! Index trait for pluggable nearest-neighbor backends

use crate::error::Result;
use crate::vector::Vector;

/// A single hit from an index search.
///
/// `row` is a positional reference into the metadata store the index was
/// built alongside. It stays valid only while that store is not reloaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// A read-only k-NN index over row-ordered vectors.
///
/// Indexes are loaded once and never mutated, so implementations must be
/// safe to share between concurrent queries.
pub trait Index: Send + Sync {
    /// Search for the `k` nearest neighbors of `query` under L2 distance.
    /// Returns at most `k` neighbors sorted by distance ascending.
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<Neighbor>>;

    /// Retrieve a stored vector by row.
    fn get_vector(&self, row: usize) -> Option<&Vector>;

    /// Dimension every stored vector has.
    fn dimension(&self) -> usize;

    /// The number of vectors in this index.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
