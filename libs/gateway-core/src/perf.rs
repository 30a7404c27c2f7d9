//! C9 Performance Tracker (SPEC_FULL.md §4 expansion). `spec.md` §4.7/§6
//! commits only to the `performance_*` tool's envelope shape and action
//! enum, leaving metric semantics an Open Question; SPEC_FULL resolves it
//! with a concrete, minimal tracker: a bounded per-database ring buffer of
//! query samples plus a configurable slow-query threshold.
//!
//! Grounded in `modkit::http::sse::SseBroadcaster`'s bounded,
//! drop-oldest-on-overflow posture — adapted from a broadcast channel to a
//! plain `Mutex<VecDeque<_>>` since nothing here needs publish/subscribe,
//! only "keep the last N and let readers poll".

use gateway_config::Dialect;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

const DEFAULT_CAPACITY: usize = 100;
const DEFAULT_THRESHOLD: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct QuerySample {
    pub db_id: String,
    pub query: String,
    pub duration: Duration,
    pub timestamp: SystemTime,
    pub rows_affected: i64,
}

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub sample_count: usize,
    pub slow_count: usize,
    pub avg_millis: f64,
    pub p95_millis: f64,
    pub max_millis: f64,
}

/// Ring buffer of recent query samples, bounded at `capacity` (default
/// 100), plus a mutable slow-query threshold (default 500ms).
pub struct PerformanceTracker {
    capacity: usize,
    samples: Mutex<VecDeque<QuerySample>>,
    threshold: Mutex<Duration>,
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_THRESHOLD)
    }
}

impl PerformanceTracker {
    pub fn new(capacity: usize, threshold: Duration) -> Self {
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            threshold: Mutex::new(threshold),
        }
    }

    /// Records one query's outcome, dropping the oldest sample when the
    /// buffer is full (spec's ring-buffer, drop-oldest semantics).
    pub fn record(&self, db_id: &str, query: &str, duration: Duration, rows_affected: i64) {
        let mut samples = self.samples.lock().unwrap();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(QuerySample {
            db_id: db_id.to_string(),
            query: query.to_string(),
            duration,
            timestamp: SystemTime::now(),
            rows_affected,
        });
    }

    pub fn threshold(&self) -> Duration {
        *self.threshold.lock().unwrap()
    }

    pub fn set_threshold(&self, threshold: Duration) {
        *self.threshold.lock().unwrap() = threshold;
    }

    /// Samples at or above the current threshold, most recent first.
    pub fn slow_queries(&self, db_id: Option<&str>) -> Vec<QuerySample> {
        let threshold = self.threshold();
        let samples = self.samples.lock().unwrap();
        samples
            .iter()
            .rev()
            .filter(|s| db_id.map(|id| s.db_id == id).unwrap_or(true))
            .filter(|s| s.duration >= threshold)
            .cloned()
            .collect()
    }

    /// Aggregate counts and latency percentiles over every retained sample
    /// (optionally scoped to one database).
    pub fn metrics(&self, db_id: Option<&str>) -> Metrics {
        let threshold = self.threshold();
        let samples = self.samples.lock().unwrap();
        let mut durations: Vec<f64> = samples
            .iter()
            .filter(|s| db_id.map(|id| s.db_id == id).unwrap_or(true))
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();

        if durations.is_empty() {
            return Metrics::default();
        }

        durations.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let sample_count = durations.len();
        let slow_count = durations
            .iter()
            .filter(|&&d| d >= threshold.as_secs_f64() * 1000.0)
            .count();
        let avg_millis = durations.iter().sum::<f64>() / sample_count as f64;
        let p95_idx = ((sample_count as f64) * 0.95).ceil() as usize;
        let p95_millis = durations[p95_idx.saturating_sub(1).min(sample_count - 1)];
        let max_millis = *durations.last().unwrap();

        Metrics {
            sample_count,
            slow_count,
            avg_millis,
            p95_millis,
            max_millis,
        }
    }

    pub fn reset(&self) {
        self.samples.lock().unwrap().clear();
    }

    /// `EXPLAIN`-family statement for `analyzeQuery`, dialect-dependent
    /// (spec's C9 expansion).
    pub fn explain_statement(dialect: Dialect, query: &str) -> String {
        match dialect {
            Dialect::Postgres => format!("EXPLAIN (FORMAT JSON) {query}"),
            Dialect::Mysql => format!("EXPLAIN {query}"),
            Dialect::Sqlite => format!("EXPLAIN QUERY PLAN {query}"),
            Dialect::Oracle => format!("EXPLAIN PLAN FOR {query}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_drops_oldest_past_capacity() {
        let tracker = PerformanceTracker::new(2, DEFAULT_THRESHOLD);
        tracker.record("a", "select 1", Duration::from_millis(1), 0);
        tracker.record("a", "select 2", Duration::from_millis(1), 0);
        tracker.record("a", "select 3", Duration::from_millis(1), 0);
        assert_eq!(tracker.metrics(None).sample_count, 2);
    }

    #[test]
    fn slow_queries_filtered_by_threshold() {
        let tracker = PerformanceTracker::new(10, Duration::from_millis(100));
        tracker.record("a", "fast", Duration::from_millis(10), 1);
        tracker.record("a", "slow", Duration::from_millis(200), 1);
        let slow = tracker.slow_queries(None);
        assert_eq!(slow.len(), 1);
        assert_eq!(slow[0].query, "slow");
    }

    #[test]
    fn set_threshold_changes_future_classification() {
        let tracker = PerformanceTracker::default();
        tracker.record("a", "q", Duration::from_millis(50), 1);
        assert!(tracker.slow_queries(None).is_empty());
        tracker.set_threshold(Duration::from_millis(10));
        assert_eq!(tracker.slow_queries(None).len(), 1);
    }

    #[test]
    fn reset_clears_buffer() {
        let tracker = PerformanceTracker::default();
        tracker.record("a", "q", Duration::from_millis(600), 1);
        assert_eq!(tracker.metrics(None).sample_count, 1);
        tracker.reset();
        assert_eq!(tracker.metrics(None).sample_count, 0);
    }

    #[test]
    fn metrics_scoped_by_database() {
        let tracker = PerformanceTracker::default();
        tracker.record("a", "q", Duration::from_millis(10), 1);
        tracker.record("b", "q", Duration::from_millis(20), 1);
        assert_eq!(tracker.metrics(Some("a")).sample_count, 1);
        assert_eq!(tracker.metrics(Some("b")).sample_count, 1);
        assert_eq!(tracker.metrics(None).sample_count, 2);
    }
}
