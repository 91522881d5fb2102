use crate::{Category, CategoryResultMap, Probe, ProbeError, ProbeMetrics, ProbeResult, Target};
use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{debug, error, warn};

/// Bounded executor for probe invocations
///
/// All categories of a run share one pool, so the number of simultaneous
/// browser sessions, requests and audit processes never exceeds
/// `max_concurrent` no matter how many targets are configured. Tasks beyond
/// the cap wait for a permit in FIFO order.
///
/// Dropping a run future aborts every task it spawned, which drops any
/// browser session or audit process those tasks still hold.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    metrics: Arc<ProbeMetrics>,
    progress: ProgressTracker,
}

impl WorkerPool {
    pub fn new(max_concurrent: usize, metrics: Arc<ProbeMetrics>, expected_tasks: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            metrics,
            progress: ProgressTracker::new(expected_tasks),
        }
    }

    /// Run `probe` against every target concurrently (within the pool cap).
    ///
    /// The returned map holds exactly one entry per distinct target. A probe
    /// task that panics is recorded as a failure for its own target only.
    pub async fn run_category<T>(
        &self,
        category: Category,
        probe: Arc<dyn Probe<Output = T>>,
        targets: &[Target],
    ) -> CategoryResultMap<T>
    where
        T: Send + 'static,
    {
        debug!("Starting {} across {} targets", category, targets.len());

        let tasks: Vec<(Target, ProbeTask<ProbeResult<T>>)> = targets
            .iter()
            .map(|target| {
                let probe = probe.clone();
                let probe_target = target.clone();
                let task = self.spawn(category, target.to_string(), async move {
                    probe.analyze(&probe_target).await
                });
                (target.clone(), task)
            })
            .collect();

        let settled = join_all(
            tasks
                .into_iter()
                .map(|(target, task)| async move { (target, task.join().await) }),
        )
        .await;

        let mut results = CategoryResultMap::new();
        for (target, joined) in settled {
            let result = self.settle(category, &target.to_string(), joined);
            results.insert(target, result);
        }

        debug!(
            "Finished {}: {}/{} succeeded",
            category,
            results.values().filter(|r| r.is_success()).count(),
            results.len()
        );
        results
    }

    /// Run one unkeyed task under the pool cap, isolating panics the same
    /// way per-target probes are isolated.
    pub async fn run_single<T, F>(&self, category: Category, label: &str, task: F) -> ProbeResult<T>
    where
        T: Send + 'static,
        F: Future<Output = ProbeResult<T>> + Send + 'static,
    {
        let joined = self.spawn(category, label.to_string(), task).join().await;
        self.settle(category, label, joined)
    }

    fn spawn<T, F>(&self, category: Category, label: String, task: F) -> ProbeTask<ProbeResult<T>>
    where
        T: Send + 'static,
        F: Future<Output = ProbeResult<T>> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let in_flight = self.in_flight.clone();
        let peak = self.peak_in_flight.clone();
        let metrics = self.metrics.clone();
        let progress = self.progress.clone();

        ProbeTask::new(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return ProbeResult::failure(ProbeError::from(e)),
            };
            let _slot = InFlightSlot::enter(in_flight, &peak);

            let started = Instant::now();
            let result = task.await;
            let elapsed = started.elapsed();

            metrics.record_probe(category, elapsed, result.is_success());
            progress.record_completion(result.is_success());

            match &result {
                ProbeResult::Success(_) => {
                    debug!("{} probe for {} completed in {:?}", category, label, elapsed)
                }
                ProbeResult::Failure { error } => {
                    warn!("{} probe for {} failed: {}", category, label, error)
                }
            }
            result
        }))
    }

    fn settle<T>(
        &self,
        category: Category,
        label: &str,
        joined: Result<ProbeResult<T>, JoinError>,
    ) -> ProbeResult<T> {
        match joined {
            Ok(result) => result,
            Err(e) => {
                error!("{} probe task for {} aborted: {}", category, label, e);
                self.metrics.record_probe(category, Duration::ZERO, false);
                self.progress.record_completion(false);
                ProbeResult::failure(ProbeError::TaskFailed(e.to_string()))
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Highest number of tasks that held a permit at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> ProgressInfo {
        self.progress.get_progress()
    }
}

/// Aborts the spawned task when dropped.
struct AbortTaskOnDrop(AbortHandle);

impl Drop for AbortTaskOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A spawned probe task owned by the run that submitted it.
struct ProbeTask<T> {
    handle: JoinHandle<T>,
    _abort: AbortTaskOnDrop,
}

impl<T> ProbeTask<T> {
    fn new(handle: JoinHandle<T>) -> Self {
        let abort = AbortTaskOnDrop(handle.abort_handle());
        Self {
            handle,
            _abort: abort,
        }
    }

    async fn join(mut self) -> Result<T, JoinError> {
        (&mut self.handle).await
    }
}

/// Decrements the in-flight count on drop, including when the task panics.
struct InFlightSlot {
    in_flight: Arc<AtomicUsize>,
}

impl InFlightSlot {
    fn enter(in_flight: Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct ProgressTracker {
    total: usize,
    completed: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_completion(&self, success: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_progress(&self) -> ProgressInfo {
        let completed = self.completed.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { completed as f64 / secs } else { 0.0 };

        ProgressInfo {
            total: self.total,
            completed,
            errors,
            success: completed.saturating_sub(errors),
            elapsed,
            rate,
            eta: if completed > 0 && rate > 0.0 {
                let remaining = self.total.saturating_sub(completed);
                Some(Duration::from_secs_f64(remaining as f64 / rate))
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub total: usize,
    pub completed: usize,
    pub errors: usize,
    pub success: usize,
    pub elapsed: Duration,
    pub rate: f64,
    pub eta: Option<Duration>,
}

impl ProgressInfo {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}
