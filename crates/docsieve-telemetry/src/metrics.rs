//! Metrics collection and reporting

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Register descriptions for the facade metrics
///
/// Call once after installing a recorder; harmless without one.
pub fn describe_metrics() {
    ::metrics::describe_counter!("docsieve_items_total", "Items finished, by result");
    ::metrics::describe_counter!("docsieve_attempts_total", "Classifier calls made");
    ::metrics::describe_counter!("docsieve_retries_total", "Backoff waits scheduled");
    ::metrics::describe_counter!(
        "docsieve_failures_total",
        "Classifier failures by kind (transient, fatal)"
    );
    ::metrics::describe_counter!(
        "docsieve_backoff_wait_ms_total",
        ::metrics::Unit::Milliseconds,
        "Time spent waiting in backoff"
    );

    tracing::debug!("Metrics descriptions registered");
}

/// Run counters shared by every worker
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    items_started: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    transient_failures: AtomicU64,
    fatal_failures: AtomicU64,
    backoff_wait_ms: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Record a worker picking up an item
    pub fn record_item_started(&self) {
        self.inner.items_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one classifier call
    pub fn record_attempt(&self) {
        self.inner.attempts.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("docsieve_attempts_total").increment(1);
    }

    /// Record a transient failure
    pub fn record_transient(&self) {
        self.inner.transient_failures.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("docsieve_failures_total", "kind" => "transient").increment(1);
    }

    /// Record a fatal failure
    pub fn record_fatal(&self) {
        self.inner.fatal_failures.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("docsieve_failures_total", "kind" => "fatal").increment(1);
    }

    /// Record a completed backoff wait
    pub fn record_retry(&self, waited: Duration) {
        let ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
        self.inner.backoff_wait_ms.fetch_add(ms, Ordering::Relaxed);
        ::metrics::counter!("docsieve_retries_total").increment(1);
        ::metrics::counter!("docsieve_backoff_wait_ms_total").increment(ms);
    }

    /// Record an item's terminal result (`flagged`, `clear`, `failed`, ...)
    pub fn record_item_finished(&self, result: &'static str) {
        ::metrics::counter!("docsieve_items_total", "result" => result).increment(1);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_started: self.inner.items_started.load(Ordering::Relaxed),
            attempts: self.inner.attempts.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
            transient_failures: self.inner.transient_failures.load(Ordering::Relaxed),
            fatal_failures: self.inner.fatal_failures.load(Ordering::Relaxed),
            backoff_wait_ms: self.inner.backoff_wait_ms.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MetricsCollector").field(&self.snapshot()).finish()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub items_started: u64,
    pub attempts: u64,
    pub retries: u64,
    pub transient_failures: u64,
    pub fatal_failures: u64,
    pub backoff_wait_ms: u64,
}

impl MetricsSnapshot {
    /// Average classifier calls per started item
    pub fn attempts_per_item(&self) -> f64 {
        if self.items_started == 0 {
            0.0
        } else {
            self.attempts as f64 / self.items_started as f64
        }
    }

    /// Total backoff time
    pub fn backoff_wait(&self) -> Duration {
        Duration::from_millis(self.backoff_wait_ms)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempts over {} items ({:.2}/item), {} retries, {} transient / {} fatal failures, {:.1}s in backoff",
            self.attempts,
            self.items_started,
            self.attempts_per_item(),
            self.retries,
            self.transient_failures,
            self.fatal_failures,
            self.backoff_wait().as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        let metrics = MetricsCollector::new();

        metrics.record_item_started();
        metrics.record_attempt();
        metrics.record_transient();
        metrics.record_retry(Duration::from_secs(15));
        metrics.record_attempt();
        metrics.record_item_finished("clear");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.items_started, 1);
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.transient_failures, 1);
        assert_eq!(snapshot.fatal_failures, 0);
        assert_eq!(snapshot.backoff_wait(), Duration::from_secs(15));
        assert_eq!(snapshot.attempts_per_item(), 2.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = MetricsCollector::new();
        let worker_copy = metrics.clone();

        worker_copy.record_fatal();
        assert_eq!(metrics.snapshot().fatal_failures, 1);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsCollector::default().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        assert_eq!(snapshot.attempts_per_item(), 0.0);
        assert!(snapshot.to_string().contains("0 attempts over 0 items"));
    }
}
