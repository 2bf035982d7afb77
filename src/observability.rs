use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Counters for one patrol.
#[derive(Debug, Default)]
pub struct PatrolMetrics {
    pub started: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub overlaps_skipped: AtomicU64,
}

impl PatrolMetrics {
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overlap_skipped(&self) {
        self.overlaps_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> PatrolStats {
        PatrolStats {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            overlaps_skipped: self.overlaps_skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatrolStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub overlaps_skipped: u64,
}

/// Metrics for every registered patrol, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct MetricsRegistry {
    patrols: BTreeMap<&'static str, Arc<PatrolMetrics>>,
}

impl MetricsRegistry {
    pub fn register(&mut self, patrol: &'static str) -> Arc<PatrolMetrics> {
        self.patrols.entry(patrol).or_default().clone()
    }

    pub fn stats(&self, patrol: &str) -> Option<PatrolStats> {
        self.patrols.get(patrol).map(|m| m.get_stats())
    }

    pub fn log_stats(&self) {
        for (name, metrics) in &self.patrols {
            let stats = metrics.get_stats();
            info!(
                patrol = name,
                started = stats.started,
                succeeded = stats.succeeded,
                failed = stats.failed,
                overlaps_skipped = stats.overlaps_skipped,
                "patrol metrics"
            );
        }
    }
}

/// Time an operation and log its duration when finished.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> u128 {
        let duration_ms = self.start.elapsed().as_millis();
        info!(
            operation = %self.operation,
            duration_ms,
            "Operation completed"
        );
        duration_ms
    }
}
