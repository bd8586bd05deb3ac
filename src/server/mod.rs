//! HTTP front end: search form, results page with map, JSON API.

pub mod routes;

use crate::geocoder::Geocoder;
use crate::metrics::MetricsCollector;
use crate::pipeline::Recommender;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Shared application state for the HTTP server.
///
/// The recommender's index and metadata are immutable and shared without
/// locking; only the metrics are mutable.
pub struct AppState {
    pub recommender: Recommender,
    /// None when no maps key is configured; results are then list-only.
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub maps_api_key: Option<String>,
    pub default_k: usize,
    pub metrics: RwLock<MetricsCollector>,
}

impl AppState {
    pub fn new(
        recommender: Recommender,
        geocoder: Option<Arc<dyn Geocoder>>,
        maps_api_key: Option<String>,
        default_k: usize,
    ) -> Self {
        Self {
            recommender,
            geocoder,
            maps_api_key,
            default_k,
            metrics: RwLock::new(MetricsCollector::new()),
        }
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn start(addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = routes::create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
