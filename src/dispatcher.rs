use crate::error::{Error, Result};
use crate::executor::{Executor, Failure, FailureKind, Outcome};
use crate::metrics::collector::MetricsCollector;
use crate::metrics::snapshot::MetricsSnapshot;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, AcquireError, Mutex, Semaphore};

/// What to run: `requests` GETs against `url`, at most `workers` at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    url: String,
    requests: usize,
    workers: usize,
}

impl LoadPlan {
    pub fn new(url: impl Into<String>, requests: usize, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidPlan("workers must be at least 1".to_string()));
        }

        Ok(Self {
            url: url.into(),
            requests,
            workers,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

/// Every collected outcome of a batch plus its wall-clock duration.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub outcomes: Vec<Outcome>,
    pub elapsed: Duration,
}

pub struct Dispatcher {
    executor: Arc<dyn Executor>,
    metrics: Arc<MetricsCollector>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn Executor>, metrics: Option<Arc<MetricsCollector>>) -> Self {
        Self {
            executor,
            metrics: metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
        }
    }

    /// Runs the whole batch and returns once every invocation has settled.
    ///
    /// Individual request failures are recorded as [`Outcome::Failure`] and
    /// never abort the batch.
    pub async fn dispatch(&self, plan: &LoadPlan) -> Result<Dispatch> {
        let requests = plan.requests();
        let gate = Arc::new(Semaphore::new(plan.workers()));
        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(requests)));
        let url: Arc<str> = Arc::from(plan.url());

        let start = Instant::now();
        let mut handles = Vec::with_capacity(requests);

        for index in 0..requests {
            let gate = gate.clone();
            let outcomes = outcomes.clone();
            let executor = self.executor.clone();
            let metrics = self.metrics.clone();
            let url = url.clone();

            metrics.increment_requests_queued();
            handles.push(tokio::spawn(async move {
                let permit = gate.acquire_owned().await?;
                let outcome = {
                    let _active = metrics.track_active();
                    executor.execute(&url).await
                };
                drop(permit);

                metrics.record(&outcome);
                if let Outcome::Failure(failure) = &outcome {
                    log::warn!("Request #{} failed: {}", index, failure);
                }

                outcomes.lock().await.push(outcome);
                Ok::<_, AcquireError>(())
            }));
        }

        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            let cause = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            log::error!("Request #{} was abandoned: {}", index, cause);
            let outcome = Outcome::Failure(Failure::new(FailureKind::Aborted, cause));
            self.metrics.record(&outcome);
            outcomes.lock().await.push(outcome);
        }

        let elapsed = start.elapsed();

        let outcomes = match Arc::try_unwrap(outcomes) {
            Ok(outcomes) => outcomes.into_inner(),
            Err(shared) => std::mem::take(&mut *shared.lock().await),
        };

        log::info!(
            "Dispatched {} requests in {:.2}s",
            outcomes.len(),
            elapsed.as_secs_f64()
        );

        Ok(Dispatch { outcomes, elapsed })
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn watch_metrics(&self) -> watch::Receiver<MetricsSnapshot> {
        let (tx, rx) = watch::channel(self.metrics.snapshot());
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx.send(metrics.snapshot()).is_err() {
                    break;
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed status and records how many calls overlap.
    struct CountingExecutor {
        status: u16,
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl CountingExecutor {
        fn new(status: u16, delay: Duration) -> Self {
            Self {
                status,
                delay,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Executor for CountingExecutor {
        async fn execute(&self, _url: &str) -> Outcome {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(active, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Outcome::Status(self.status)
        }
    }

    /// Hands out statuses from a script, then fails.
    struct ScriptedExecutor {
        statuses: std::sync::Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn execute(&self, _url: &str) -> Outcome {
            let next = self.statuses.lock().unwrap().pop();
            match next {
                Some(status) => Outcome::Status(status),
                None => Outcome::Failure(Failure::new(FailureKind::Transport, "script exhausted")),
            }
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl Executor for PanickingExecutor {
        async fn execute(&self, _url: &str) -> Outcome {
            panic!("executor blew up");
        }
    }

    #[test]
    fn plan_rejects_zero_workers() {
        assert!(matches!(
            LoadPlan::new("http://localhost", 10, 0),
            Err(Error::InvalidPlan(_))
        ));
        assert!(LoadPlan::new("http://localhost", 0, 1).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn zero_requests_yield_empty_collection() {
        let executor = Arc::new(CountingExecutor::new(200, Duration::ZERO));
        let dispatcher = Dispatcher::new(executor.clone(), None);
        let plan = LoadPlan::new("http://localhost", 0, 3).unwrap();

        let dispatch = dispatcher.dispatch(&plan).await.unwrap();

        assert!(dispatch.outcomes.is_empty());
        assert!(dispatch.elapsed < Duration::from_secs(1));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn never_exceeds_worker_bound() {
        let executor = Arc::new(CountingExecutor::new(200, Duration::from_millis(20)));
        let metrics = Arc::new(MetricsCollector::new());
        let dispatcher = Dispatcher::new(executor.clone(), Some(metrics.clone()));
        let plan = LoadPlan::new("http://localhost", 40, 3).unwrap();

        let dispatch = dispatcher.dispatch(&plan).await.unwrap();

        assert_eq!(dispatch.outcomes.len(), 40);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 40);
        assert!(executor.peak.load(Ordering::SeqCst) <= 3);

        let snapshot = metrics.snapshot();
        assert!(snapshot.peak_active_workers <= 3);
        assert_eq!(snapshot.active_workers, 0);
        assert_eq!(snapshot.requests_queued, 40);
        assert_eq!(snapshot.requests_completed, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn workers_run_in_parallel() {
        let executor = Arc::new(CountingExecutor::new(200, Duration::from_millis(200)));
        let dispatcher = Dispatcher::new(executor.clone(), None);
        let plan = LoadPlan::new("http://localhost", 5, 5).unwrap();

        let dispatch = dispatcher.dispatch(&plan).await.unwrap();

        assert_eq!(dispatch.outcomes, vec![Outcome::Status(200); 5]);
        assert!(dispatch.elapsed < Duration::from_millis(900));
        assert!(dispatch.elapsed >= Duration::from_millis(200));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failures_are_collected_without_aborting_batch() {
        let executor = Arc::new(ScriptedExecutor {
            statuses: std::sync::Mutex::new(vec![200, 404, 503]),
        });
        let dispatcher = Dispatcher::new(executor, None);
        let plan = LoadPlan::new("http://localhost", 6, 2).unwrap();

        let dispatch = dispatcher.dispatch(&plan).await.unwrap();

        assert_eq!(dispatch.outcomes.len(), 6);
        let failures = dispatch.outcomes.iter().filter(|o| o.is_failure()).count();
        assert_eq!(failures, 3);
        let mut statuses: Vec<u16> = dispatch.outcomes.iter().filter_map(Outcome::status).collect();
        statuses.sort_unstable();
        assert_eq!(statuses, vec![200, 404, 503]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panicking_invocation_is_recorded_and_releases_its_slot() {
        let dispatcher = Dispatcher::new(Arc::new(PanickingExecutor), None);
        let plan = LoadPlan::new("http://localhost", 4, 1).unwrap();

        let dispatch = dispatcher.dispatch(&plan).await.unwrap();

        assert_eq!(dispatch.outcomes.len(), 4);
        assert!(dispatch.outcomes.iter().all(|outcome| matches!(
            outcome,
            Outcome::Failure(Failure { kind: FailureKind::Aborted, .. })
        )));
        assert_eq!(dispatcher.get_metrics().active_workers, 0);
    }
}
