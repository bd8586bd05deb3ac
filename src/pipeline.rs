//! Retrieval and normalization pipeline.
//!
//! `query text -> embedding -> k-NN search -> raw similarity -> min/max
//! normalization`, emitted nearest-first. Apart from the embedding call the
//! pipeline is pure over the loaded [`SearchState`].

use crate::distance::l2_to_similarity;
use crate::embedder::Embedder;
use crate::error::{RecommendError, Result};
use crate::flat_index::FlatIndex;
use crate::index::{Index, Neighbor};
use crate::metadata::MetadataStore;
use crate::state::SearchState;
use crate::vector::UNIT_NORM_TOLERANCE;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Number of recommendations returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 5;

/// Normalized similarity assigned to every entry when all raw similarities
/// in a result set are equal, including the single-result case.
pub const DEGENERATE_NORMALIZED_SIMILARITY: f32 = 1.0;

/// One recommended place, ready for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// Metadata row this result was read from.
    pub row: usize,
    pub name: String,
    pub address: String,
    pub review_text: String,
    /// L2 distance between the query and the stored review vector.
    pub distance: f32,
    /// `1 - distance / 2`, in [0, 1].
    pub raw_similarity: f32,
    /// Raw similarity rescaled to [0, 1] across this result set only.
    pub normalized_similarity: f32,
}

/// Min/max-normalize raw similarities within one result set.
///
/// Output is in [0, 1], order-preserving, and never NaN. When every value is
/// equal the result is [`DEGENERATE_NORMALIZED_SIMILARITY`] for all entries.
pub fn normalize_similarities(raw: &[f32]) -> Vec<f32> {
    let Some(&first) = raw.first() else {
        return Vec::new();
    };
    let (min, max) = raw
        .iter()
        .fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s)));

    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return vec![DEGENERATE_NORMALIZED_SIMILARITY; raw.len()];
    }

    raw.iter()
        .map(|&s| ((s - min) / range).clamp(0.0, 1.0))
        .collect()
}

/// Join neighbors with their metadata and attach similarities.
///
/// Neighbors are kept in the order given (nearest first). Neighbors whose
/// row has no metadata, such as index padding, are dropped before
/// normalization.
pub fn rank(neighbors: &[Neighbor], metadata: &MetadataStore) -> Vec<RankedResult> {
    let resolved: Vec<(&Neighbor, f32)> = neighbors
        .iter()
        .filter(|n| metadata.get(n.row).is_some())
        .map(|n| (n, l2_to_similarity(n.distance)))
        .collect();

    let raw: Vec<f32> = resolved.iter().map(|(_, s)| *s).collect();
    let normalized = normalize_similarities(&raw);

    resolved
        .into_iter()
        .zip(normalized)
        .filter_map(|((neighbor, raw_similarity), normalized_similarity)| {
            let record = metadata.get(neighbor.row)?;
            Some(RankedResult {
                row: neighbor.row,
                name: record.name.clone(),
                address: record.address.clone(),
                review_text: record.review_text.clone(),
                distance: neighbor.distance,
                raw_similarity,
                normalized_similarity,
            })
        })
        .collect()
}

/// Answers recommendation queries against a shared [`SearchState`].
pub struct Recommender<I: Index = FlatIndex> {
    state: Arc<SearchState<I>>,
    embedder: Arc<dyn Embedder>,
}

impl<I: Index> Clone for Recommender<I> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            embedder: Arc::clone(&self.embedder),
        }
    }
}

impl<I: Index> Recommender<I> {
    /// Pair a loaded state with an embedder; their dimensions must agree.
    pub fn new(state: Arc<SearchState<I>>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if embedder.dimension() != state.dimension() {
            return Err(RecommendError::configuration(format!(
                "Embedder produces {} dimensions but the index holds {}",
                embedder.dimension(),
                state.dimension()
            )));
        }
        Ok(Self { state, embedder })
    }

    pub fn state(&self) -> &SearchState<I> {
        &self.state
    }

    /// Return up to `k` places most similar to `query_text`, nearest first.
    ///
    /// Embedding failures surface as [`RecommendError::Embedding`] and are
    /// not retried here; the index is never searched in that case.
    pub async fn recommend(&self, query_text: &str, k: usize) -> Result<Vec<RankedResult>> {
        let query_text = query_text.trim();
        if query_text.is_empty() {
            return Err(RecommendError::InvalidQuery(
                "query text must not be empty".to_string(),
            ));
        }
        if k == 0 {
            return Err(RecommendError::InvalidQuery(
                "k must be positive".to_string(),
            ));
        }

        let mut query = self.embedder.embed(query_text).await.map_err(|e| match e {
            RecommendError::Embedding { .. } => e,
            other => RecommendError::embedding(other.to_string()),
        })?;

        if query.dimension() != self.state.dimension() {
            return Err(RecommendError::embedding(format!(
                "expected {} dimensions, embedder returned {}",
                self.state.dimension(),
                query.dimension()
            )));
        }

        if !query.is_unit_norm(UNIT_NORM_TOLERANCE) {
            debug!(norm = query.norm(), "normalizing query vector");
            query
                .normalize()
                .map_err(|e| RecommendError::embedding(e.to_string()))?;
        }

        let neighbors = self.state.index().search(&query, k)?;
        debug!(k, hits = neighbors.len(), "index search complete");

        Ok(rank(&neighbors, self.state.metadata()))
    }
}
