//! Error types for the recommender

use thiserror::Error;

/// Result type alias for recommender operations
pub type Result<T> = std::result::Result<T, RecommendError>;

/// Error types that can occur while loading state or answering a query
#[derive(Error, Debug)]
pub enum RecommendError {
    /// The embedding backend failed or returned something unusable.
    /// Terminal for the query that triggered it.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// Startup-time inconsistency between the index, the metadata and the embedder.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Corrupt index file: {0}")]
    CorruptIndex(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {reason}")]
    InvalidVector { reason: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RecommendError {
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
