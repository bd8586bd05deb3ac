//! Geocoding of recommended places.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{RecommendError, Result};
use crate::pipeline::RankedResult;
use crate::retry::RetryPolicy;

pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Resolves a place to coordinates.
///
/// `Ok(None)` means the service answered but had no usable location.
/// `Err` is reserved for transport failures that outlasted the retry policy.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, name: &str, address: &str) -> Result<Option<Coordinates>>;
}

/// A ranked result that could be placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceLocation {
    #[serde(flatten)]
    pub result: RankedResult,
    #[serde(flatten)]
    pub coordinates: Coordinates,
}

/// Geocode every result in order, keeping only the ones that resolve.
///
/// Failures are logged and skipped so the ranked list never depends on
/// geocoding succeeding.
pub async fn locate_all(geocoder: &dyn Geocoder, results: &[RankedResult]) -> Vec<PlaceLocation> {
    let mut locations = Vec::with_capacity(results.len());
    for result in results {
        match geocoder.geocode(&result.name, &result.address).await {
            Ok(Some(coordinates)) => locations.push(PlaceLocation {
                result: result.clone(),
                coordinates,
            }),
            Ok(None) => debug!(name = %result.name, "no location for place"),
            Err(e) => warn!(name = %result.name, error = %e, "geocoding failed"),
        }
    }
    locations
}

/// A [`Geocoder`] backed by the Google Maps Geocoding API.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GoogleGeocoder {
    /// Create a geocoder with a per-request timeout and the default
    /// policy of 3 attempts, 2 seconds apart.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RecommendError::configuration(
                "Google Maps API key must not be empty",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                RecommendError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_GEOCODE_URL.to_string(),
            retry: RetryPolicy::fixed(3, Duration::from_secs(2)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch(&self, query: &str) -> std::result::Result<GeocodeResponse, reqwest::Error> {
        self.client
            .get(&self.base_url)
            .query(&[("address", query), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, name: &str, address: &str) -> Result<Option<Coordinates>> {
        let query = format!("{}, {}", name, address);

        // Only transport and HTTP-level failures are worth retrying; a parsed
        // body with a bad status is a definitive answer.
        let response = self
            .retry
            .run("Geocoding request", || self.fetch(&query), |e| !e.is_decode())
            .await
            .map_err(|e| RecommendError::Geocoding(format!("{}: {}", query, e)))?;

        match response.status.as_str() {
            "OK" => Ok(response.results.into_iter().next().map(|r| Coordinates {
                latitude: r.geometry.location.lat,
                longitude: r.geometry.location.lng,
            })),
            "ZERO_RESULTS" => {
                warn!(place = %query, "location not found");
                Ok(None)
            }
            status => {
                error!(
                    place = %query,
                    status,
                    message = response.error_message.as_deref().unwrap_or(""),
                    "geocoding API error"
                );
                Ok(None)
            }
        }
    }
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/geocode", addr)
    }

    fn geocoder(base: String) -> GoogleGeocoder {
        GoogleGeocoder::new("maps-key", Duration::from_secs(5))
            .unwrap()
            .with_base_url(base)
            .with_retry(RetryPolicy::fixed(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_ok_status_returns_first_location() {
        let router = Router::new().route(
            "/geocode",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["address"], "Cafe Onion, Seongsu-dong");
                assert_eq!(params["key"], "maps-key");
                Json(serde_json::json!({
                    "status": "OK",
                    "results": [
                        {"geometry": {"location": {"lat": 37.5446, "lng": 127.0559}}},
                        {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
                    ]
                }))
            }),
        );
        let g = geocoder(spawn_backend(router).await);
        let coords = g.geocode("Cafe Onion", "Seongsu-dong").await.unwrap().unwrap();
        assert_eq!(coords.latitude, 37.5446);
        assert_eq!(coords.longitude, 127.0559);
    }

    #[tokio::test]
    async fn test_zero_results_is_none() {
        let router = Router::new().route(
            "/geocode",
            get(|| async { Json(serde_json::json!({"status": "ZERO_RESULTS", "results": []})) }),
        );
        let g = geocoder(spawn_backend(router).await);
        assert_eq!(g.geocode("Nowhere", "Nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_api_error_status_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/geocode",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({
                        "status": "REQUEST_DENIED",
                        "error_message": "The provided API key is invalid."
                    }))
                }
            }),
        );
        let g = geocoder(spawn_backend(router).await);
        assert_eq!(g.geocode("A", "B").await.unwrap(), None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_errors_retried_up_to_ceiling() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/geocode",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }),
        );
        let g = geocoder(spawn_backend(router).await);
        assert!(matches!(
            g.geocode("A", "B").await,
            Err(RecommendError::Geocoding(_))
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    struct TableGeocoder;

    #[async_trait]
    impl Geocoder for TableGeocoder {
        async fn geocode(&self, name: &str, _address: &str) -> Result<Option<Coordinates>> {
            match name {
                "found" => Ok(Some(Coordinates {
                    latitude: 1.0,
                    longitude: 2.0,
                })),
                "missing" => Ok(None),
                _ => Err(RecommendError::Geocoding("down".to_string())),
            }
        }
    }

    fn result(row: usize, name: &str) -> RankedResult {
        RankedResult {
            row,
            name: name.to_string(),
            address: "addr".to_string(),
            review_text: "text".to_string(),
            distance: 0.0,
            raw_similarity: 1.0,
            normalized_similarity: 1.0,
        }
    }

    #[tokio::test]
    async fn test_locate_all_skips_unresolved() {
        let results = vec![
            result(0, "found"),
            result(1, "missing"),
            result(2, "broken"),
            result(3, "found"),
        ];
        let locations = locate_all(&TableGeocoder, &results).await;
        let rows: Vec<usize> = locations.iter().map(|l| l.result.row).collect();
        assert_eq!(rows, vec![0, 3]);
    }

    #[test]
    fn test_place_location_serializes_flat() {
        let location = PlaceLocation {
            result: result(0, "found"),
            coordinates: Coordinates {
                latitude: 1.5,
                longitude: 2.5,
            },
        };
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["name"], "found");
        assert_eq!(json["latitude"], 1.5);
        assert_eq!(json["normalized_similarity"], 1.0);
    }
}
