use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic counter bundle for one work queue's lifetime.
///
/// All increments happen worker-side, after the decisive event for a given
/// job, with one exception: `queue_rejections` is incremented by the enqueue
/// path itself (the only counter a producer ever touches). Ordering is
/// `Relaxed` — counters are independent of one another and only ever
/// increase, so no happens-before relationship needs to be established
/// between them.
#[derive(Debug, Default)]
pub struct Metrics {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    heartbeat_missed: AtomicU64,
    sensor_throttles: AtomicU64,
    sensor_aborts: AtomicU64,
    queue_rejections: AtomicU64,
}

/// A stable, monotonically-non-decreasing snapshot of [`Metrics`] at one
/// instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub heartbeat_missed: u64,
    pub sensor_throttles: u64,
    pub sensor_aborts: u64,
    pub queue_rejections: u64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_heartbeat_missed(&self) {
        self.heartbeat_missed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sensor_throttles(&self) {
        self.sensor_throttles.fetch_add(1, Ordering::Relaxed);
    }

    /// A sensor abort also counts as a failure (§3 invariant: `failed`
    /// includes sensor-aborts).
    pub fn inc_sensor_aborts(&self) {
        self.sensor_aborts.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_queue_rejections(&self) {
        self.queue_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            heartbeat_missed: self.heartbeat_missed.load(Ordering::Relaxed),
            sensor_throttles: self.sensor_throttles.load(Ordering::Relaxed),
            sensor_aborts: self.sensor_aborts.load(Ordering::Relaxed),
            queue_rejections: self.queue_rejections.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_abort_counts_as_failure() {
        let metrics = Metrics::new();
        metrics.inc_sensor_aborts();
        let snap = metrics.snapshot();
        assert_eq!(snap.sensor_aborts, 1);
        assert_eq!(snap.failed, 1);
    }

    #[test]
    fn snapshot_is_monotonic() {
        let metrics = Metrics::new();
        metrics.inc_started();
        let first = metrics.snapshot();
        metrics.inc_completed();
        let second = metrics.snapshot();
        assert!(second.started >= first.started);
        assert!(second.completed >= first.completed);
    }
}
