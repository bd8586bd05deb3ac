//! # Place Recommender
//!
//! Review-based place recommendation over a pre-built embedding index.
//!
//! A free-text description of the place a user wants is embedded, matched
//! against unit-normalized review embeddings with exact L2 search, and the
//! nearest reviews are returned with their place name, address, and a
//! similarity score. Results can be geocoded and drawn on a map.
//!
//! This library provides:
//! - Loading and validating the persisted index and review metadata
//! - The retrieval and similarity normalization pipeline
//! - OpenAI embeddings and Google geocoding clients with retry policies
//! - HTML/map rendering and an HTTP server
//!
//! ## Example
//!
//! ```rust
//! use place_recommender::pipeline::{normalize_similarities, DEGENERATE_NORMALIZED_SIMILARITY};
//!
//! let normalized = normalize_similarities(&[0.9, 0.7, 0.5]);
//! assert_eq!(normalized[0], 1.0);
//! assert_eq!(normalized[2], 0.0);
//!
//! // A single result is assigned the degenerate constant.
//! assert_eq!(normalize_similarities(&[0.4]), vec![DEGENERATE_NORMALIZED_SIMILARITY]);
//! ```

pub mod config;
pub mod distance;
pub mod embedder;
pub mod error;
pub mod flat_index;
pub mod geocoder;
pub mod index;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod persistence;
pub mod pipeline;
pub mod render;
pub mod retry;
pub mod server;
pub mod state;
pub mod vector;

pub use config::AppConfig;
pub use embedder::{Embedder, OpenAiEmbedder};
pub use error::{RecommendError, Result};
pub use flat_index::FlatIndex;
pub use geocoder::{Coordinates, Geocoder, GoogleGeocoder, PlaceLocation};
pub use index::{Index, Neighbor};
pub use metadata::{MetadataStore, ReviewRecord};
pub use pipeline::{RankedResult, Recommender};
pub use state::{SearchState, StatePaths};
pub use vector::Vector;
