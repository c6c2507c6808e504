//! Run Metrics Collection
//!
//! Counts generation calls, failures, and token usage for one orchestration
//! run. Thread-safe: targets record concurrently through a shared handle.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = create_shared_metrics("run-123");
//! metrics.record_generation(Some(1200), 850);
//! let summary = metrics.summary();
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

// =============================================================================
// Metrics Collector
// =============================================================================

pub struct MetricsCollector {
    run_id: String,
    started_at: DateTime<Utc>,
    start_time: Instant,
    generation_calls: AtomicU32,
    generation_failures: AtomicU32,
    timeouts: AtomicU32,
    validations: AtomicU32,
    retries: AtomicU32,
    tokens: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Point-in-time view of a run's metrics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub run_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// Every dispatched call, failed or not
    pub generation_calls: u32,
    /// Calls that errored, timeouts included
    pub generation_failures: u32,
    pub timeouts: u32,
    pub validations: u32,
    pub retries: u32,
    pub tokens: u64,
    pub avg_latency_ms: f64,
}

impl MetricsCollector {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            start_time: Instant::now(),
            generation_calls: AtomicU32::new(0),
            generation_failures: AtomicU32::new(0),
            timeouts: AtomicU32::new(0),
            validations: AtomicU32::new(0),
            retries: AtomicU32::new(0),
            tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    /// Record a completed generation call
    pub fn record_generation(&self, tokens: Option<u64>, latency_ms: u64) {
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
        self.tokens.fetch_add(tokens.unwrap_or(0), Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Record a generation call that failed or was unavailable
    pub fn record_failure(&self, latency_ms: u64) {
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn record_timeout(&self, latency_ms: u64) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        self.record_failure(latency_ms);
    }

    pub fn record_validation(&self) {
        self.validations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSummary {
        let calls = self.generation_calls.load(Ordering::Relaxed);
        let latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSummary {
            run_id: self.run_id.clone(),
            started_at: Some(self.started_at),
            duration_ms: self.start_time.elapsed().as_millis() as u64,
            generation_calls: calls,
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            validations: self.validations.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            tokens: self.tokens.load(Ordering::Relaxed),
            avg_latency_ms: if calls > 0 {
                latency as f64 / calls as f64
            } else {
                0.0
            },
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        self.snapshot()
    }
}

impl MetricsSummary {
    pub fn display(&self) -> String {
        format!(
            "Run: {}\n\
             Duration: {:.1}s\n\
             Generation calls: {} ({} failed, {} timed out)\n\
             Retries: {}\n\
             Tokens: {}\n\
             Avg latency: {:.0}ms",
            self.run_id,
            self.duration_ms as f64 / 1000.0,
            self.generation_calls,
            self.generation_failures,
            self.timeouts,
            self.retries,
            self.tokens,
            self.avg_latency_ms
        )
    }
}

// =============================================================================
// Shared Type
// =============================================================================

pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics(run_id: impl Into<String>) -> SharedMetrics {
    Arc::new(MetricsCollector::new(run_id))
}

// =============================================================================
// Tests
// =============================================================================
