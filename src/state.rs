//! Process-wide search state: the index and its metadata, loaded once.

use crate::error::{RecommendError, Result};
use crate::flat_index::FlatIndex;
use crate::index::Index;
use crate::metadata::MetadataStore;
use crate::persistence::index_file;
use crate::vector::UNIT_NORM_TOLERANCE;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Where the persisted index and metadata live.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

/// Immutable index + metadata pair shared by every query.
///
/// Only constructible through validation, so a handle always satisfies:
/// non-empty, index dimension equals the embedder dimension, row counts
/// match, every stored vector is unit-normalized.
#[derive(Debug)]
pub struct SearchState<I: Index = FlatIndex> {
    index: I,
    metadata: MetadataStore,
}

impl SearchState<FlatIndex> {
    /// Load both files and validate them against the embedder dimension.
    pub fn init(paths: &StatePaths, embedding_dimension: usize) -> Result<Arc<Self>> {
        let index = index_file::load(&paths.index)?;
        let metadata = MetadataStore::load(&paths.metadata)?;
        let state = Self::from_parts(index, metadata, embedding_dimension)?;
        info!(
            rows = state.len(),
            dimension = state.dimension(),
            "search state ready"
        );
        Ok(Arc::new(state))
    }
}

impl<I: Index> SearchState<I> {
    /// Pair an index with its metadata, checking every load-time contract.
    pub fn from_parts(index: I, metadata: MetadataStore, embedding_dimension: usize) -> Result<Self> {
        if index.is_empty() {
            return Err(RecommendError::configuration("Index contains no vectors"));
        }

        if index.dimension() != embedding_dimension {
            return Err(RecommendError::configuration(format!(
                "Index dimension {} does not match embedder dimension {}",
                index.dimension(),
                embedding_dimension
            )));
        }

        if index.len() != metadata.len() {
            return Err(RecommendError::configuration(format!(
                "Index has {} vectors but metadata has {} rows",
                index.len(),
                metadata.len()
            )));
        }

        for row in 0..index.len() {
            let vector = index.get_vector(row).ok_or_else(|| {
                RecommendError::configuration(format!("Index row {} is missing", row))
            })?;
            if !vector.is_unit_norm(UNIT_NORM_TOLERANCE) {
                return Err(RecommendError::configuration(format!(
                    "Index row {} is not unit-normalized (norm {:.4})",
                    row,
                    vector.norm()
                )));
            }
        }

        Ok(Self { index, metadata })
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
