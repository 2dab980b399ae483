//! Scrape cycle metrics collection and reporting
//!
//! Tracks a rolling latency window and lifetime success counts for the
//! update loop, reported through `/health`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples to keep for metrics calculation
const MAX_SAMPLES: usize = 100;

/// Point-in-time view of the update loop's performance
#[derive(Debug, Clone, Serialize)]
pub struct CycleMetrics {
    /// Name of the page fetcher in use
    pub fetcher_name: String,
    /// 50th percentile latency of successful cycles in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile latency of successful cycles in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of cycles run
    pub total_cycles: u64,
    /// Number of failed cycles
    pub failed_cycles: u64,
    /// Failures since the last successful cycle
    pub consecutive_failures: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl CycleMetrics {
    /// Creates metrics with no data
    pub fn empty(fetcher_name: &str) -> Self {
        Self {
            fetcher_name: fetcher_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_cycles: 0,
            failed_cycles: 0,
            consecutive_failures: 0,
            last_success_at: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    failed: u64,
    consecutive_failures: u64,
    last_success_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Collects and computes metrics for scrape cycles
pub struct MetricsCollector {
    fetcher_name: String,
    /// Rolling window of latency samples
    samples: Arc<RwLock<VecDeque<LatencySample>>>,
    counters: Arc<RwLock<Counters>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector for a fetcher
    pub fn new(fetcher_name: &str) -> Self {
        Self {
            fetcher_name: fetcher_name.to_string(),
            samples: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_SAMPLES))),
            counters: Arc::new(RwLock::new(Counters::default())),
        }
    }

    /// Records a successful cycle
    pub async fn record_success(&self, duration: Duration) {
        {
            let mut counters = self.counters.write().await;
            counters.total += 1;
            counters.consecutive_failures = 0;
            counters.last_success_at = Some(Utc::now());
        }
        self.push_sample(duration, true).await;
    }

    /// Records a failed cycle with its error message
    pub async fn record_failure(&self, duration: Duration, error: impl Into<String>) {
        {
            let mut counters = self.counters.write().await;
            counters.total += 1;
            counters.failed += 1;
            counters.consecutive_failures += 1;
            counters.last_error = Some(error.into());
        }
        self.push_sample(duration, false).await;
    }

    async fn push_sample(&self, duration: Duration, success: bool) {
        let mut samples = self.samples.write().await;
        if samples.len() >= MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from collected samples
    pub async fn get_metrics(&self) -> CycleMetrics {
        let samples = self.samples.read().await;
        let counters = self.counters.read().await;

        if counters.total == 0 {
            return CycleMetrics::empty(&self.fetcher_name);
        }

        // Only successful cycles count towards latency percentiles
        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();

        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        CycleMetrics {
            fetcher_name: self.fetcher_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate: (counters.total - counters.failed) as f64 / counters.total as f64,
            total_cycles: counters.total,
            failed_cycles: counters.failed,
            consecutive_failures: counters.consecutive_failures,
            last_success_at: counters.last_success_at,
            last_error: counters.last_error.clone(),
        }
    }
}

/// Calculate percentile from sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}
