//! Brute-force flat index: exact O(n) L2 search

use crate::distance::euclidean_distance;
use crate::error::{Result, RecommendError};
use crate::index::{Index, Neighbor};
use crate::vector::Vector;

/// A flat index that computes the distance to every stored vector.
///
/// Row `i` of the index corresponds to row `i` of the metadata store.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Vec<Vector>,
    dimension: usize,
}

impl FlatIndex {
    /// Build an index from row-ordered vectors that all share `dimension`.
    pub fn from_vectors(dimension: usize, vectors: Vec<Vector>) -> Result<Self> {
        if dimension == 0 {
            return Err(RecommendError::InvalidVector {
                reason: "Index dimension must be positive".to_string(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.dimension() != dimension) {
            return Err(RecommendError::DimensionMismatch {
                expected: dimension,
                actual: bad.dimension(),
            });
        }
        Ok(Self { vectors, dimension })
    }

    /// Iterate over `(row, vector)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Vector)> {
        self.vectors.iter().enumerate()
    }
}

impl Index for FlatIndex {
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<Neighbor>> {
        if query.dimension() != self.dimension {
            return Err(RecommendError::DimensionMismatch {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }

        let mut results: Vec<Neighbor> = self
            .iter()
            .map(|(row, vec)| Neighbor {
                row,
                distance: euclidean_distance(query, vec),
            })
            .collect();

        // Equal distances fall back to row order so rankings are deterministic.
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        results.truncate(k);
        Ok(results)
    }

    fn get_vector(&self, row: usize) -> Option<&Vector> {
        self.vectors.get(row)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}
