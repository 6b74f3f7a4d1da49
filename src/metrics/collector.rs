use crate::executor::Outcome;
use crate::metrics::snapshot::MetricsSnapshot;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

#[derive(Clone)]
pub struct MetricsCollector {
    requests_queued: Arc<AtomicU64>,
    requests_completed: Arc<AtomicU64>,
    requests_success: Arc<AtomicU64>,
    requests_failed: Arc<AtomicU64>,
    active_workers: Arc<AtomicU64>,
    peak_active_workers: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            requests_queued: Arc::new(AtomicU64::new(0)),
            requests_completed: Arc::new(AtomicU64::new(0)),
            requests_success: Arc::new(AtomicU64::new(0)),
            requests_failed: Arc::new(AtomicU64::new(0)),
            active_workers: Arc::new(AtomicU64::new(0)),
            peak_active_workers: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

/// Counts one active worker for as long as it is alive.
pub struct ActiveWorker {
    active_workers: Arc<AtomicU64>,
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests_queued(&self) {
        self.requests_queued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn track_active(&self) -> ActiveWorker {
        let active = self.active_workers.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active_workers.fetch_max(active, Ordering::SeqCst);
        ActiveWorker {
            active_workers: self.active_workers.clone(),
        }
    }

    pub fn record(&self, outcome: &Outcome) {
        self.requests_completed.fetch_add(1, Ordering::SeqCst);
        match outcome {
            Outcome::Status(200) => {
                self.requests_success.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::Status(_) => {}
            Outcome::Failure(_) => {
                self.requests_failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.requests_completed.load(Ordering::SeqCst);
        let success = self.requests_success.load(Ordering::SeqCst);

        let success_rate = if completed > 0 {
            (success as f64 / completed as f64) * 100.0
        } else {
            0.0
        };

        let elapsed = self.start_time.elapsed().as_secs_f64();

        MetricsSnapshot {
            requests_queued: self.requests_queued.load(Ordering::SeqCst),
            requests_completed: completed,
            requests_success: success,
            requests_failed: self.requests_failed.load(Ordering::SeqCst),
            active_workers: self.active_workers.load(Ordering::SeqCst),
            peak_active_workers: self.peak_active_workers.load(Ordering::SeqCst),
            success_rate,
            requests_per_second: if elapsed > 0.0 {
                completed as f64 / elapsed
            } else {
                0.0
            },
            elapsed_seconds: elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Failure, FailureKind};

    #[test]
    fn active_guard_tracks_peak_and_releases_on_drop() {
        let metrics = MetricsCollector::new();

        let first = metrics.track_active();
        let second = metrics.track_active();
        assert_eq!(metrics.snapshot().active_workers, 2);

        drop(first);
        drop(second);
        let _third = metrics.track_active();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_workers, 1);
        assert_eq!(snapshot.peak_active_workers, 2);
    }

    #[test]
    fn record_counts_only_exact_200_as_success() {
        let metrics = MetricsCollector::new();
        metrics.record(&Outcome::Status(200));
        metrics.record(&Outcome::Status(201));
        metrics.record(&Outcome::Status(500));
        metrics.record(&Outcome::Failure(Failure::new(FailureKind::Timeout, "slow")));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_completed, 4);
        assert_eq!(snapshot.requests_success, 1);
        assert_eq!(snapshot.requests_failed, 1);
        assert!((snapshot.success_rate - 25.0).abs() < f64::EPSILON);
    }
}
