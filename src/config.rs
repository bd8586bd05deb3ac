//! Application configuration from the environment and `.env`.

use crate::embedder::{DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_OPENAI_BASE_URL};
use crate::error::{RecommendError, Result};
use crate::geocoder::DEFAULT_GEOCODE_URL;
use crate::pipeline::DEFAULT_TOP_K;
use crate::retry::RetryPolicy;
use crate::state::StatePaths;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Required to embed queries.
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Without it, results are shown without geocoding or a map.
    #[serde(skip_serializing)]
    pub google_maps_api_key: Option<String>,

    pub openai_base_url: String,
    pub geocode_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,

    pub index_path: PathBuf,
    pub metadata_path: PathBuf,

    pub top_k: usize,
    pub geocode_max_attempts: u32,
    pub geocode_retry_delay_ms: u64,
    pub http_timeout_secs: u64,

    pub log_level: String,
    pub server_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            google_maps_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            geocode_base_url: DEFAULT_GEOCODE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            // FAISS IndexFlatL2 or native layout, detected on load.
            index_path: PathBuf::from("./faiss_index.bin"),
            metadata_path: PathBuf::from("./reviews_embeddings.csv"),
            top_k: DEFAULT_TOP_K,
            geocode_max_attempts: 3,
            geocode_retry_delay_ms: 2000,
            http_timeout_secs: 10,
            log_level: "info".to_string(),
            server_addr: "0.0.0.0:8501".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from environment variables, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            google_maps_api_key: non_empty("GOOGLE_MAPS_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            geocode_base_url: non_empty("GEOCODE_BASE_URL").unwrap_or(defaults.geocode_base_url),
            embedding_model: non_empty("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_or(&non_empty, "EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            index_path: non_empty("INDEX_PATH").map(PathBuf::from).unwrap_or(defaults.index_path),
            metadata_path: non_empty("METADATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_path),
            top_k: parse_or(&non_empty, "TOP_K", defaults.top_k)?,
            geocode_max_attempts: parse_or(&non_empty, "GEOCODE_MAX_ATTEMPTS", defaults.geocode_max_attempts)?,
            geocode_retry_delay_ms: parse_or(
                &non_empty,
                "GEOCODE_RETRY_DELAY_MS",
                defaults.geocode_retry_delay_ms,
            )?,
            http_timeout_secs: parse_or(&non_empty, "HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            log_level: non_empty("LOG_LEVEL").unwrap_or(defaults.log_level),
            server_addr: non_empty("SERVER_ADDR").unwrap_or(defaults.server_addr),
        })
    }

    pub fn state_paths(&self) -> StatePaths {
        StatePaths {
            index: self.index_path.clone(),
            metadata: self.metadata_path.clone(),
        }
    }

    pub fn geocode_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.geocode_max_attempts,
            Duration::from_millis(self.geocode_retry_delay_ms),
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RecommendError::configuration("TOP_K must be positive"));
        }
        if self.embedding_dimension == 0 {
            return Err(RecommendError::configuration(
                "EMBEDDING_DIMENSION must be positive",
            ));
        }
        if self.geocode_max_attempts == 0 {
            return Err(RecommendError::configuration(
                "GEOCODE_MAX_ATTEMPTS must be at least 1",
            ));
        }
        for (name, url) in [
            ("OPENAI_BASE_URL", &self.openai_base_url),
            ("GEOCODE_BASE_URL", &self.geocode_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RecommendError::configuration(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            RecommendError::configuration(format!("{} has invalid value '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.embedding_dimension, 1536);
        assert_eq!(config.embedding_model, "text-embedding-ada-002");
        assert!(config.openai_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("TOP_K", "7"),
            ("INDEX_PATH", "/data/idx.bin"),
            ("GEOCODE_MAX_ATTEMPTS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-1"));
        assert_eq!(config.top_k, 7);
        assert_eq!(config.index_path, PathBuf::from("/data/idx.bin"));
        assert_eq!(config.geocode_retry().max_attempts, 5);
    }

    #[test]
    fn test_blank_key_treated_as_missing() {
        let config = AppConfig::from_lookup(lookup(&[("GOOGLE_MAPS_API_KEY", "  ")])).unwrap();
        assert!(config.google_maps_api_key.is_none());
    }

    #[test]
    fn test_unparseable_number() {
        let err = AppConfig::from_lookup(lookup(&[("TOP_K", "five")])).unwrap_err();
        assert!(err.to_string().contains("TOP_K"));
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        config.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.openai_base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_keys_not_serialized() {
        let mut config = AppConfig::default();
        config.openai_api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
