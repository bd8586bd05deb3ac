//! Integration tests for loading state and answering recommendations

use approx::assert_relative_eq;
use async_trait::async_trait;
use place_recommender::persistence::index_file;
use place_recommender::persistence::faiss;
use place_recommender::{
    AppConfig, Embedder, FlatIndex, Index, MetadataStore, Neighbor, RecommendError, Recommender,
    Result, SearchState, StatePaths, Vector,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Points on the unit circle at 0, 60, 90 and 180 degrees.
fn circle_vectors() -> Vec<Vector> {
    let at = |degrees: f32| {
        let r = degrees.to_radians();
        Vector::new(vec![r.cos(), r.sin()])
    };
    vec![at(90.0), at(0.0), at(180.0), at(60.0)]
}

const CSV: &str = "name,address,review_text
North Cafe,1 Up St,\"bright, airy\"
East Bakery,2 Right Rd,great croissants
West Bar,3 Left Ln,loud on weekends
Sunrise Tea,4 Dawn Ave,calm and quiet
";

fn write_fixture(dir: &TempDir) -> StatePaths {
    let paths = StatePaths {
        index: dir.path().join("data").join("index.bin"),
        metadata: dir.path().join("reviews.csv"),
    };
    let index = FlatIndex::from_vectors(2, circle_vectors()).unwrap();
    index_file::save(&paths.index, &index).unwrap();
    std::fs::write(&paths.metadata, CSV).unwrap();
    paths
}

struct FixedEmbedder {
    vector: Vec<f32>,
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vector> {
        Ok(Vector::new(self.vector.clone()))
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vector> {
        Err(RecommendError::embedding("rate limited"))
    }

    fn dimension(&self) -> usize {
        2
    }
}

/// Flat index that counts how often it is searched.
struct CountingIndex {
    inner: FlatIndex,
    searches: AtomicUsize,
}

impl Index for CountingIndex {
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<Neighbor>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(query, k)
    }

    fn get_vector(&self, row: usize) -> Option<&Vector> {
        self.inner.get_vector(row)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[tokio::test]
async fn test_recommend_from_files() {
    let dir = TempDir::new().unwrap();
    let paths = write_fixture(&dir);
    let state = SearchState::init(&paths, 2).unwrap();
    let embedder = Arc::new(FixedEmbedder {
        vector: vec![1.0, 0.0],
    });
    let recommender = Recommender::new(state, embedder).unwrap();

    let results = recommender.recommend("fresh pastries", 4).await.unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["East Bakery", "Sunrise Tea", "North Cafe", "West Bar"]);

    // Distances 0, 1, sqrt(2), 2 on the unit circle.
    let expected_raw = [1.0, 0.5, 1.0 - 2f32.sqrt() / 2.0, 0.0];
    for (result, want) in results.iter().zip(expected_raw) {
        assert_relative_eq!(result.raw_similarity, want, epsilon = 1e-5);
        // min 0 and max 1, so normalization is the identity here.
        assert_relative_eq!(result.normalized_similarity, want, epsilon = 1e-5);
    }
    assert_eq!(results[0].address, "2 Right Rd");
    assert_eq!(results[2].review_text, "bright, airy");
}

#[tokio::test]
async fn test_default_k_returns_top_five_capped_by_index() {
    let dir = TempDir::new().unwrap();
    let state = SearchState::init(&write_fixture(&dir), 2).unwrap();
    let recommender = Recommender::new(
        state,
        Arc::new(FixedEmbedder {
            vector: vec![0.0, 1.0],
        }),
    )
    .unwrap();

    let results = recommender.recommend("anything", 5).await.unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].name, "North Cafe");
    assert!(results
        .windows(2)
        .all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
async fn test_single_result_is_degenerate_constant() {
    let dir = TempDir::new().unwrap();
    let state = SearchState::init(&write_fixture(&dir), 2).unwrap();
    let recommender = Recommender::new(
        state,
        Arc::new(FixedEmbedder {
            vector: vec![-0.6, 0.8],
        }),
    )
    .unwrap();

    let results = recommender.recommend("somewhere", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].normalized_similarity,
        place_recommender::pipeline::DEGENERATE_NORMALIZED_SIMILARITY
    );
}

#[tokio::test]
async fn test_unnormalized_query_is_normalized() {
    let dir = TempDir::new().unwrap();
    let state = SearchState::init(&write_fixture(&dir), 2).unwrap();
    let recommender = Recommender::new(
        state,
        Arc::new(FixedEmbedder {
            vector: vec![5.0, 0.0],
        }),
    )
    .unwrap();

    let results = recommender.recommend("bread", 1).await.unwrap();
    assert_eq!(results[0].name, "East Bakery");
    assert_relative_eq!(results[0].distance, 0.0, epsilon = 1e-6);
}

#[tokio::test]
async fn test_embedding_failure_never_searches() {
    let index = CountingIndex {
        inner: FlatIndex::from_vectors(2, circle_vectors()).unwrap(),
        searches: AtomicUsize::new(0),
    };
    let metadata = MetadataStore::from_reader(CSV.as_bytes()).unwrap();
    let state = Arc::new(SearchState::from_parts(index, metadata, 2).unwrap());
    let recommender = Recommender::new(Arc::clone(&state), Arc::new(FailingEmbedder)).unwrap();

    let err = recommender.recommend("quiet cafe", 5).await.unwrap_err();
    assert!(matches!(err, RecommendError::Embedding { .. }));
    assert_eq!(state.index().searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_dimension_embedding_is_embedding_error() {
    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vector> {
            Ok(Vector::new(vec![1.0]))
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    let dir = TempDir::new().unwrap();
    let state = SearchState::init(&write_fixture(&dir), 2).unwrap();
    let recommender = Recommender::new(state, Arc::new(ShortEmbedder)).unwrap();
    assert!(matches!(
        recommender.recommend("x", 3).await,
        Err(RecommendError::Embedding { .. })
    ));
}

#[test]
fn test_embedder_dimension_mismatch_rejected() {
    let dir = TempDir::new().unwrap();
    let state = SearchState::init(&write_fixture(&dir), 2).unwrap();
    let result = Recommender::new(
        state,
        Arc::new(FixedEmbedder {
            vector: vec![0.0; 1536],
        }),
    );
    assert!(matches!(result, Err(RecommendError::Configuration(_))));
}

#[test]
fn test_init_rejects_wrong_embedding_dimension() {
    let dir = TempDir::new().unwrap();
    let paths = write_fixture(&dir);
    assert!(matches!(
        SearchState::init(&paths, 1536),
        Err(RecommendError::Configuration(_))
    ));
}

#[test]
fn test_corrupt_index_file() {
    let dir = TempDir::new().unwrap();
    let paths = write_fixture(&dir);
    let mut bytes = std::fs::read(&paths.index).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&paths.index, bytes).unwrap();

    assert!(matches!(
        SearchState::init(&paths, 2),
        Err(RecommendError::CorruptIndex(_))
    ));
}

#[test]
fn test_manifest_written_alongside_index() {
    let dir = TempDir::new().unwrap();
    let paths = write_fixture(&dir);
    let manifest = index_file::read_manifest(&paths.index).unwrap().unwrap();
    assert_eq!(manifest.vector_count, 4);
    assert_eq!(manifest.dimension, 2);
}

#[tokio::test]
async fn test_default_paths_load_faiss_index() {
    let dir = TempDir::new().unwrap();
    let defaults = AppConfig::default();
    let paths = StatePaths {
        index: dir.path().join(defaults.index_path.file_name().unwrap()),
        metadata: dir.path().join(defaults.metadata_path.file_name().unwrap()),
    };
    let index = FlatIndex::from_vectors(2, circle_vectors()).unwrap();
    std::fs::write(&paths.index, faiss::encode(&index)).unwrap();
    std::fs::write(&paths.metadata, CSV).unwrap();

    let state = SearchState::init(&paths, 2).unwrap();
    let recommender = Recommender::new(
        state,
        Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0],
        }),
    )
    .unwrap();

    let results = recommender.recommend("fresh pastries", 2).await.unwrap();
    assert_eq!(results[0].name, "East Bakery");
    // Euclidean distance 1 to the 60 degree point, not the squared value.
    assert_relative_eq!(results[1].distance, 1.0, epsilon = 1e-5);
    assert_relative_eq!(results[1].raw_similarity, 0.5, epsilon = 1e-5);
}

#[test]
fn test_converted_index_matches_faiss_source() {
    let dir = TempDir::new().unwrap();
    let faiss_path = dir.path().join("faiss_index.bin");
    let native_path = dir.path().join("index.bin");
    let index = FlatIndex::from_vectors(2, circle_vectors()).unwrap();
    std::fs::write(&faiss_path, faiss::encode(&index)).unwrap();

    let loaded = index_file::load(&faiss_path).unwrap();
    index_file::save(&native_path, &loaded).unwrap();
    let (converted, format) = index_file::load_with_format(&native_path).unwrap();

    assert_eq!(format, index_file::IndexFormat::Native);
    assert_eq!(converted.len(), index.len());
    for row in 0..index.len() {
        assert_eq!(converted.get_vector(row), index.get_vector(row));
    }
}
