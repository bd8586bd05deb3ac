//! Distance and similarity measures

use crate::vector::Vector;

/// Compute Euclidean (L2) distance between two vectors
pub fn euclidean_distance(v1: &Vector, v2: &Vector) -> f32 {
    v1.as_slice()
        .iter()
        .zip(v2.as_slice().iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Map an L2 distance between unit vectors onto a bounded similarity.
///
/// Valid only when both vectors are unit-normalized, so that `d` lies in
/// `[0, 2]`. The result is clamped to `[0, 1]`.
pub fn l2_to_similarity(distance: f32) -> f32 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}
