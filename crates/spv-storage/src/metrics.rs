//! Commit/rollback counters and commit latency

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Histogram for tracking value distributions
pub struct Histogram {
    /// Bucket boundaries (in microseconds)
    buckets: Vec<f64>,
    counts: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create histogram with default buckets
    pub fn new() -> Self {
        Self::with_buckets(vec![
            50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 50000.0,
        ])
    }

    /// Create histogram with custom buckets
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Histogram {
            buckets,
            counts,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a value
    pub fn observe(&self, value: f64) {
        self.sum.fetch_add(value as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let slot = self
            .buckets
            .iter()
            .position(|boundary| value <= *boundary)
            .unwrap_or(self.buckets.len().saturating_sub(1));
        if let Some(counter) = self.counts.get(slot) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get mean value
    pub fn mean(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.sum.load(Ordering::Relaxed) as f64 / count as f64
    }

    /// Get total count
    pub fn total_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// `(upper bound, count)` per bucket
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(&self.counts)
            .map(|(b, c)| (*b, c.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-store batch statistics
#[derive(Default)]
pub struct StoreMetrics {
    commits: AtomicU64,
    rollbacks: AtomicU64,
    failed_commits: AtomicU64,
    height_deletions: AtomicU64,
    commit_latency: Histogram,
}

impl StoreMetrics {
    /// Create zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_commit(&self, elapsed: Duration) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.commit_latency.observe(elapsed.as_micros() as f64);
    }

    pub(crate) fn record_failed_commit(&self) {
        self.failed_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_height_deletions(&self, count: u64) {
        self.height_deletions.fetch_add(count, Ordering::Relaxed);
    }

    /// Committed batches
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Batches rolled back, explicitly or by drop
    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Commits the engine rejected
    pub fn failed_commits(&self) -> u64 {
        self.failed_commits.load(Ordering::Relaxed)
    }

    /// `del_all` fan-outs in committed batches
    pub fn height_deletions(&self) -> u64 {
        self.height_deletions.load(Ordering::Relaxed)
    }

    /// Commit latency distribution
    pub fn commit_latency(&self) -> &Histogram {
        &self.commit_latency
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commits: self.commits(),
            rollbacks: self.rollbacks(),
            failed_commits: self.failed_commits(),
            height_deletions: self.height_deletions(),
            commit_latency: HistogramSummary {
                mean: self.commit_latency.mean(),
                count: self.commit_latency.total_count(),
            },
        }
    }
}

/// Snapshot of store metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Committed batches
    pub commits: u64,
    /// Rolled back batches
    pub rollbacks: u64,
    /// Failed commits
    pub failed_commits: u64,
    /// Height deletions staged
    pub height_deletions: u64,
    /// Commit latency in microseconds
    pub commit_latency: HistogramSummary,
}

/// Summary of a histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Mean value
    pub mean: f64,
    /// Total observation count
    pub count: u64,
}

impl MetricsSnapshot {
    /// Export snapshot as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram() {
        let hist = Histogram::new();
        hist.observe(10.0);
        hist.observe(300.0);
        hist.observe(1_000_000.0);

        assert_eq!(hist.total_count(), 3);
        let buckets = hist.buckets();
        assert_eq!(buckets[0].1, 1);
        assert_eq!(buckets[3].1, 1);
        // overflow lands in the last bucket
        assert_eq!(buckets.last().unwrap().1, 1);
    }

    #[test]
    fn test_histogram_empty_mean() {
        assert_eq!(Histogram::new().mean(), 0.0);
    }

    #[test]
    fn test_counters_and_snapshot() {
        let metrics = StoreMetrics::new();
        metrics.record_commit(Duration::from_micros(200));
        metrics.record_commit(Duration::from_micros(400));
        metrics.record_rollback();
        metrics.record_failed_commit();
        metrics.record_height_deletions(1);

        let snap = metrics.snapshot();
        assert_eq!(snap.commits, 2);
        assert_eq!(snap.rollbacks, 1);
        assert_eq!(snap.failed_commits, 1);
        assert_eq!(snap.height_deletions, 1);
        assert_eq!(snap.commit_latency.count, 2);
        assert_eq!(snap.commit_latency.mean, 300.0);

        let json = snap.to_json().unwrap();
        assert!(json.contains("\"commits\": 2"));
        let back: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
