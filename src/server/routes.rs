//! HTTP route handlers.

use crate::error::RecommendError;
use crate::geocoder::{locate_all, PlaceLocation};
use crate::pipeline::RankedResult;
use crate::render;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

// --- Request/Response types ---

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct RecommendationItem {
    #[serde(flatten)]
    pub result: RankedResult,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize)]
pub struct RecommendResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<RecommendationItem>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub rows: usize,
    pub dimension: usize,
    pub geocoding_enabled: bool,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub total_queries: u64,
    pub embedding_failures: u64,
    pub geocode_lookups: u64,
    pub geocode_misses: u64,
    pub latency_samples: usize,
    pub avg_query_latency_us: f64,
    pub p50_query_latency_us: f64,
    pub p95_query_latency_us: f64,
    pub p99_query_latency_us: f64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Router ---

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/search", get(search_page))
        .route("/api/recommend", get(recommend))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

pub fn status_for(err: &RecommendError) -> StatusCode {
    match err {
        RecommendError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        RecommendError::Embedding { .. } | RecommendError::Geocoding(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run the pipeline, then geocode if enabled. Geocoding never fails the
/// request; unresolved places are simply absent from the locations.
async fn run_query(
    state: &AppState,
    query: &str,
    k: Option<usize>,
) -> Result<(Vec<RankedResult>, Vec<PlaceLocation>), RecommendError> {
    let k = k.unwrap_or(state.default_k);
    let start = Instant::now();

    let results = match state.recommender.recommend(query, k).await {
        Ok(results) => results,
        Err(e) => {
            if matches!(e, RecommendError::Embedding { .. }) {
                if let Ok(mut metrics) = state.metrics.write() {
                    metrics.record_embedding_failure();
                }
            }
            error!(query, error = %e, "recommendation failed");
            return Err(e);
        }
    };

    let elapsed = start.elapsed();
    if let Ok(mut metrics) = state.metrics.write() {
        metrics.record_query(elapsed);
    }

    let locations = match &state.geocoder {
        Some(geocoder) => {
            let locations = locate_all(geocoder.as_ref(), &results).await;
            if let Ok(mut metrics) = state.metrics.write() {
                metrics.record_geocoding(results.len(), locations.len());
            }
            locations
        }
        None => Vec::new(),
    };

    info!(
        query,
        k,
        results = results.len(),
        located = locations.len(),
        "query answered"
    );
    Ok((results, locations))
}

// --- Handlers ---

async fn index_page() -> Html<String> {
    Html(render::render_search_page())
}

async fn search_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.unwrap_or_default();
    if query.trim().is_empty() {
        return Html(render::render_search_page()).into_response();
    }

    match run_query(&state, &query, params.k).await {
        Ok((results, locations)) => {
            let map = match state.maps_api_key.as_deref() {
                Some(key) => render::map_fragment(&locations, key).unwrap_or_else(|e| {
                    error!(error = %e, "map rendering failed");
                    None
                }),
                None => None,
            };
            Html(render::render_results_page(&query, &results, map.as_deref())).into_response()
        }
        Err(e) => (
            status_for(&e),
            Html(format!(
                "<!DOCTYPE html><html><body><p>Search failed: {}</p><p><a href=\"/\">Back</a></p></body></html>",
                render::escape_html(&e.to_string())
            )),
        )
            .into_response(),
    }
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<RecommendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let query = params.q.unwrap_or_default();
    let (results, locations) = run_query(&state, &query, params.k).await.map_err(|e| {
        (
            status_for(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let items: Vec<RecommendationItem> = results
        .into_iter()
        .map(|result| {
            let coordinates = locations
                .iter()
                .find(|l| l.result.row == result.row)
                .map(|l| l.coordinates);
            RecommendationItem {
                latitude: coordinates.map(|c| c.latitude),
                longitude: coordinates.map(|c| c.longitude),
                result,
            }
        })
        .collect();

    Ok(Json(RecommendResponse {
        query,
        count: items.len(),
        results: items,
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let search_state = state.recommender.state();
    Json(HealthResponse {
        status: "ok".to_string(),
        rows: search_state.len(),
        dimension: search_state.dimension(),
        geocoding_enabled: state.geocoder.is_some(),
    })
}

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MetricsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let metrics = state.metrics.read().map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Lock poisoned".to_string(),
            }),
        )
    })?;

    Ok(Json(MetricsResponse {
        total_queries: metrics.total_queries(),
        embedding_failures: metrics.embedding_failures(),
        geocode_lookups: metrics.geocode_lookups(),
        geocode_misses: metrics.geocode_misses(),
        latency_samples: metrics.latency_sample_count(),
        avg_query_latency_us: metrics.avg_query_latency_us(),
        p50_query_latency_us: metrics.percentile_query_latency_us(50.0),
        p95_query_latency_us: metrics.percentile_query_latency_us(95.0),
        p99_query_latency_us: metrics.percentile_query_latency_us(99.0),
    }))
}
