//! Runtime metrics: query latency, embedding failures, geocoding misses.

use std::collections::VecDeque;
use std::time::Duration;

/// Number of recent query latencies kept for averages and percentiles.
pub const LATENCY_WINDOW: usize = 1024;

/// Collects runtime metrics for the recommender.
#[derive(Debug)]
pub struct MetricsCollector {
    /// Most recent latencies only; `total_queries` counts the lifetime.
    query_latencies_us: VecDeque<f64>,
    total_queries: u64,
    embedding_failures: u64,
    geocode_lookups: u64,
    geocode_misses: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            query_latencies_us: VecDeque::with_capacity(LATENCY_WINDOW),
            total_queries: 0,
            embedding_failures: 0,
            geocode_lookups: 0,
            geocode_misses: 0,
        }
    }

    /// Record a successful query with its duration.
    pub fn record_query(&mut self, duration: Duration) {
        self.total_queries += 1;
        if self.query_latencies_us.len() == LATENCY_WINDOW {
            self.query_latencies_us.pop_front();
        }
        self.query_latencies_us.push_back(duration.as_micros() as f64);
    }

    /// Number of latency samples currently held.
    pub fn latency_sample_count(&self) -> usize {
        self.query_latencies_us.len()
    }

    pub fn record_embedding_failure(&mut self) {
        self.embedding_failures += 1;
    }

    /// Record a geocoding pass: how many places were looked up and how
    /// many of them could be placed on the map.
    pub fn record_geocoding(&mut self, attempted: usize, resolved: usize) {
        self.geocode_lookups += attempted as u64;
        self.geocode_misses += attempted.saturating_sub(resolved) as u64;
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }

    pub fn embedding_failures(&self) -> u64 {
        self.embedding_failures
    }

    pub fn geocode_lookups(&self) -> u64 {
        self.geocode_lookups
    }

    pub fn geocode_misses(&self) -> u64 {
        self.geocode_misses
    }

    /// Average query latency over the recent window, in microseconds.
    pub fn avg_query_latency_us(&self) -> f64 {
        if self.query_latencies_us.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.query_latencies_us.iter().sum();
        sum / self.query_latencies_us.len() as f64
    }

    /// Get a percentile of query latency (e.g., 50.0, 95.0, 99.0).
    pub fn percentile_query_latency_us(&self, percentile: f64) -> f64 {
        if self.query_latencies_us.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<f64> = self.query_latencies_us.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let index = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[index.min(sorted.len() - 1)]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
