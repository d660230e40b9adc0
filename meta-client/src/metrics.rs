//! Metrics collection for the session factory

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-factory counters
#[derive(Debug, Default)]
pub struct ClientMetrics {
    // Stats protocol metrics
    pub stats_requests: AtomicU64,
    pub stats_failures: AtomicU64,
    pub stats_latency_sum: AtomicU64,
    pub stats_latency_count: AtomicU64,

    // Session metrics
    pub producers_created: AtomicU64,
    pub consumers_created: AtomicU64,
    pub consumer_config_rejections: AtomicU64,

    // Connection metrics
    pub connections_created: AtomicU64,
    pub connections_failed: AtomicU64,
}

impl ClientMetrics {
    /// Record a stats reply received from a broker
    pub fn record_stats(&self, latency: Duration) {
        self.stats_requests.fetch_add(1, Ordering::Relaxed);
        self.stats_latency_sum
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.stats_latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stats request that failed or timed out
    pub fn record_stats_failure(&self) {
        self.stats_requests.fetch_add(1, Ordering::Relaxed);
        self.stats_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_producer_created(&self) {
        self.producers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumer_created(&self) {
        self.consumers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumer_config_rejected(&self) {
        self.consumer_config_rejections
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful connection
    pub fn record_connection_created(&self) {
        self.connections_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed connection
    pub fn record_connection_failed(&self) {
        self.connections_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get average stats latency in microseconds
    pub fn average_stats_latency_us(&self) -> f64 {
        let sum = self.stats_latency_sum.load(Ordering::Relaxed);
        let count = self.stats_latency_count.load(Ordering::Relaxed);

        if count == 0 {
            0.0
        } else {
            sum as f64 / count as f64
        }
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            stats_requests: self.stats_requests.load(Ordering::Relaxed),
            stats_failures: self.stats_failures.load(Ordering::Relaxed),
            average_stats_latency_us: self.average_stats_latency_us(),
            producers_created: self.producers_created.load(Ordering::Relaxed),
            consumers_created: self.consumers_created.load(Ordering::Relaxed),
            consumer_config_rejections: self.consumer_config_rejections.load(Ordering::Relaxed),
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_failed: self.connections_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub stats_requests: u64,
    pub stats_failures: u64,
    pub average_stats_latency_us: f64,
    pub producers_created: u64,
    pub consumers_created: u64,
    pub consumer_config_rejections: u64,
    pub connections_created: u64,
    pub connections_failed: u64,
}

/// Timing helper for measuring operation latency
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counters() {
        let metrics = ClientMetrics::default();
        metrics.record_stats(Duration::from_micros(100));
        metrics.record_stats(Duration::from_micros(300));
        metrics.record_stats_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.stats_requests, 3);
        assert_eq!(snapshot.stats_failures, 1);
        assert_eq!(snapshot.average_stats_latency_us, 200.0);
    }

    #[test]
    fn test_empty_average() {
        assert_eq!(ClientMetrics::default().average_stats_latency_us(), 0.0);
    }
}
