//! Serialization utilities: bincode for vectors, JSON for the manifest.

use crate::error::{Result, RecommendError};
use serde::{Deserialize, Serialize};

/// Serializable representation of a flat index, vectors in row order.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexPayload {
    pub dimension: usize,
    pub vectors: Vec<Vec<f32>>,
}

/// Human-readable summary written next to the index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub vector_count: usize,
    pub dimension: usize,
    pub format_version: u32,
}

/// Encode data to bincode bytes.
pub fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| RecommendError::SerializationError(e.to_string()))
}

/// Decode data from bincode bytes.
pub fn from_bincode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| RecommendError::SerializationError(e.to_string()))
}

/// Encode data to pretty JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| RecommendError::SerializationError(e.to_string()))
}

/// Decode data from JSON bytes.
pub fn from_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| RecommendError::SerializationError(e.to_string()))
}
