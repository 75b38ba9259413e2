use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;

use super::error::JobError;
use super::heartbeat::{Heartbeat, JobContext};
use super::metrics::{Metrics, MetricsSnapshot};
use super::sensor::SensorPolicy;

type JobFn<T> =
    Box<dyn FnOnce(JobContext) -> Pin<Box<dyn Future<Output = Result<T, String>> + Send>> + Send>;

struct JobRequest<T> {
    job: JobFn<T>,
    duration_limit: Option<Duration>,
    heartbeat_interval: Option<Duration>,
    completion: oneshot::Sender<Result<T, JobError>>,
}

enum QueueItem<T> {
    Job(JobRequest<T>),
    Sentinel,
}

/// The completion handle returned by `enqueue`. Resolved exactly once by the
/// worker that ran the job (or synchronously by `enqueue` itself, on
/// queue-full).
pub struct JobHandle<T> {
    rx: oneshot::Receiver<Result<T, JobError>>,
}

impl<T> JobHandle<T> {
    /// Awaits the job's outcome. If the producer side of the channel is
    /// dropped without resolving (should not happen in normal operation),
    /// this surfaces as a job failure rather than panicking.
    pub async fn result(self) -> Result<T, JobError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(JobError::JobFailure("handle dropped before resolution".into())))
    }
}

struct Inner<T> {
    tx: mpsc::Sender<QueueItem<T>>,
    rx: AsyncMutex<mpsc::Receiver<QueueItem<T>>>,
    concurrency: usize,
    sensor_policy: Option<Arc<SensorPolicy>>,
    metrics: Arc<Metrics>,
    workers: AsyncMutex<Vec<JoinHandle<()>>>,
    pending: AtomicUsize,
    idle: Notify,
}

impl<T: Send + 'static> Inner<T> {
    fn ack(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// A bounded FIFO plus a fixed pool of worker tasks that drain it,
/// coordinating sensor gating, deadline enforcement, heartbeat monitoring,
/// and completion reporting. Generic over the job's return type `T`, so
/// callers get a typed `Result<T, JobError>` instead of a dynamic value.
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> WorkQueue<T> {
    pub fn new(max_queue_size: usize, concurrency: usize) -> Self {
        Self::with_metrics(max_queue_size, concurrency, Metrics::new())
    }

    pub fn with_metrics(max_queue_size: usize, concurrency: usize, metrics: Arc<Metrics>) -> Self {
        let (tx, rx) = mpsc::channel(max_queue_size);
        Self {
            inner: Arc::new(Inner {
                tx,
                rx: AsyncMutex::new(rx),
                concurrency,
                sensor_policy: None,
                metrics,
                workers: AsyncMutex::new(Vec::new()),
                pending: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn with_sensor_policy(mut self, policy: Arc<SensorPolicy>) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("sensor policy must be attached before the queue is cloned")
            .sensor_policy = Some(policy);
        self
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Idempotent. Spawns `concurrency` worker tasks; no effect if workers
    /// are already running.
    pub async fn start(&self) {
        let mut workers = self.inner.workers.lock().await;
        if !workers.is_empty() {
            return;
        }
        for _ in 0..self.inner.concurrency {
            let inner = self.inner.clone();
            workers.push(tokio::spawn(Self::worker_loop(inner)));
        }
    }

    /// Graceful. Injects one sentinel per worker and awaits their
    /// termination. In-flight job bodies run to completion; admitted but
    /// not-yet-started requests may or may not run before their worker
    /// consumes a sentinel (unspecified beyond "handle is eventually
    /// resolved").
    pub async fn stop(&self) {
        let mut workers = self.inner.workers.lock().await;
        if workers.is_empty() {
            return;
        }
        for _ in 0..workers.len() {
            // Blocking send: mirrors the graceful drain — we wait for queue
            // capacity rather than dropping the stop signal.
            let _ = self.inner.tx.send(QueueItem::Sentinel).await;
        }
        for handle in workers.drain(..) {
            let _ = handle.await;
        }
    }

    /// Returns once the queue is empty and every admitted request has been
    /// processed.
    pub async fn join(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Enqueues a job. Never blocks the producer on capacity: if the bounded
    /// queue is full, the returned handle is already resolved with
    /// `queue-full` and `queue_rejections` is incremented.
    pub fn enqueue<F, Fut>(
        &self,
        job: F,
        duration_limit: Option<Duration>,
        heartbeat_interval: Option<Duration>,
    ) -> JobHandle<T>
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, String>> + Send + 'static,
    {
        let (completion_tx, completion_rx) = oneshot::channel();
        let boxed: JobFn<T> = Box::new(move |ctx| Box::pin(job(ctx)));
        let request = JobRequest {
            job: boxed,
            duration_limit,
            heartbeat_interval,
            completion: completion_tx,
        };

        match self.inner.tx.try_send(QueueItem::Job(request)) {
            Ok(()) => {
                self.inner.pending.fetch_add(1, Ordering::SeqCst);
            }
            Err(mpsc::error::TrySendError::Full(QueueItem::Job(request))) => {
                self.inner.metrics.inc_queue_rejections();
                let _ = request.completion.send(Err(JobError::QueueFull));
            }
            Err(mpsc::error::TrySendError::Closed(QueueItem::Job(request))) => {
                self.inner.metrics.inc_queue_rejections();
                let _ = request.completion.send(Err(JobError::QueueFull));
            }
            _ => unreachable!("only Job items are ever sent via enqueue"),
        }

        JobHandle { rx: completion_rx }
    }

    async fn worker_loop(inner: Arc<Inner<T>>) {
        loop {
            let item = {
                let mut rx = inner.rx.lock().await;
                rx.recv().await
            };
            let request = match item {
                None | Some(QueueItem::Sentinel) => break,
                Some(QueueItem::Job(request)) => request,
            };

            if let Some(policy) = &inner.sensor_policy
                && let Err(err) = policy.enforce().await
            {
                // `SensorPolicy::enforce` already recorded this as both a
                // sensor-abort and a failure; counting it again here would
                // double-count `failed` for every sensor-aborted job.
                let _ = request.completion.send(Err(err));
                inner.ack();
                continue;
            }

            inner.metrics.inc_started();

            let heartbeat = request.heartbeat_interval.map(Heartbeat::new);
            let ctx = JobContext::new(heartbeat.clone());
            let job_future = (request.job)(ctx);
            let duration_limit = request.duration_limit;

            let mut job_task: JoinHandle<Result<T, JobError>> = tokio::spawn(async move {
                match duration_limit {
                    Some(limit) => match tokio::time::timeout(limit, job_future).await {
                        Ok(result) => result.map_err(JobError::JobFailure),
                        Err(_) => Err(JobError::Timeout(limit)),
                    },
                    None => job_future.await.map_err(JobError::JobFailure),
                }
            });

            let outcome: Result<T, JobError> = if let Some(hb) = heartbeat {
                let mut monitor_task: JoinHandle<JobError> = tokio::spawn(hb.monitor());
                tokio::select! {
                    joined = &mut job_task => {
                        monitor_task.abort();
                        let _ = monitor_task.await;
                        joined.unwrap_or_else(|e| Err(JobError::JobFailure(e.to_string())))
                    }
                    hb_err = &mut monitor_task => {
                        job_task.abort();
                        let _ = job_task.await;
                        Err(hb_err.unwrap_or(JobError::HeartbeatMissed(Duration::default())))
                    }
                }
            } else {
                job_task
                    .await
                    .unwrap_or_else(|e| Err(JobError::JobFailure(e.to_string())))
            };

            match &outcome {
                Ok(_) => inner.metrics.inc_completed(),
                Err(JobError::Timeout(_)) => inner.metrics.inc_timed_out(),
                Err(JobError::HeartbeatMissed(_)) => inner.metrics.inc_heartbeat_missed(),
                Err(_) => inner.metrics.inc_failed(),
            }

            // The producer's handle may already be gone (external
            // cancellation); metrics are still updated, the send just
            // becomes a no-op.
            let _ = request.completion.send(outcome);
            inner.ack();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workqueue::sensor::{SensorPolicy, SensorReader, SensorSnapshot};
    use std::sync::atomic::{AtomicUsize as StdAtomicUsize, Ordering as StdOrdering};

    // S1 — Capacity rejection.
    #[tokio::test]
    async fn s1_capacity_rejection() {
        let queue: WorkQueue<i32> = WorkQueue::new(2, 2);
        queue.start().await;

        let mut handles = Vec::new();
        for i in 0..3 {
            let handle = queue.enqueue(
                move |_ctx| async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(i * 2)
                },
                None,
                None,
            );
            handles.push(handle);
        }

        let mut resolved = Vec::new();
        for handle in handles {
            resolved.push(handle.result().await);
        }

        let rejections = resolved
            .iter()
            .filter(|r| matches!(r, Err(JobError::QueueFull)))
            .count();
        assert_eq!(rejections, 1);
        assert_eq!(queue.metrics().queue_rejections, 1);

        queue.join().await;
        assert_eq!(queue.metrics().completed, 2);
        queue.stop().await;
    }

    // S2 — Duration limit.
    #[tokio::test]
    async fn s2_duration_limit() {
        let queue: WorkQueue<()> = WorkQueue::new(10, 1);
        queue.start().await;

        let handle = queue.enqueue(
            |_ctx| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            Some(Duration::from_millis(50)),
            None,
        );

        let result = handle.result().await;
        assert!(matches!(result, Err(JobError::Timeout(_))));
        assert_eq!(queue.metrics().timed_out, 1);
        assert_eq!(queue.metrics().completed, 0);
        queue.stop().await;
    }

    // S3 — Missed heartbeat.
    #[tokio::test]
    async fn s3_missed_heartbeat() {
        let queue: WorkQueue<()> = WorkQueue::new(10, 1);
        queue.start().await;

        let handle = queue.enqueue(
            |_ctx| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            None,
            Some(Duration::from_millis(50)),
        );

        let result = handle.result().await;
        assert!(matches!(result, Err(JobError::HeartbeatMissed(_))));
        assert_eq!(queue.metrics().heartbeat_missed, 1);
        queue.stop().await;
    }

    // S4 — Sensor throttle then pass.
    #[tokio::test]
    async fn s4_sensor_throttle_then_pass() {
        let metrics = Metrics::new();
        let calls = Arc::new(StdAtomicUsize::new(0));
        let calls_clone = calls.clone();
        let reader = move || {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, StdOrdering::SeqCst);
                let temps = [90.0, 85.0, 65.0];
                SensorSnapshot {
                    temperature_c: Some(temps[n.min(2)]),
                    battery_percent: None,
                }
            }
        };
        let policy = Arc::new(
            SensorPolicy::new(metrics.clone())
                .with_reader(Arc::new(reader))
                .with_max_temperature_c(70.0)
                .with_cooldown(Duration::from_millis(50)),
        );

        let queue: WorkQueue<&'static str> =
            WorkQueue::with_metrics(10, 1, metrics.clone()).with_sensor_policy(policy);
        queue.start().await;

        let start = std::time::Instant::now();
        let handle = queue.enqueue(|_ctx| async move { Ok("ok") }, None, None);
        let result = handle.result().await;

        assert_eq!(result.unwrap(), "ok");
        assert!(metrics.snapshot().sensor_throttles >= 1);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(metrics.snapshot().completed, 1);
        queue.stop().await;
    }

    // S5 — Sensor abort.
    #[tokio::test]
    async fn s5_sensor_abort() {
        let metrics = Metrics::new();
        let invoked = Arc::new(StdAtomicUsize::new(0));
        let reader = || async move {
            SensorSnapshot {
                temperature_c: Some(100.0),
                battery_percent: None,
            }
        };
        let policy = Arc::new(
            SensorPolicy::new(metrics.clone())
                .with_reader(Arc::new(reader))
                .with_max_temperature_c(80.0)
                .with_stop_on_violation(true),
        );

        let queue: WorkQueue<()> =
            WorkQueue::with_metrics(10, 1, metrics.clone()).with_sensor_policy(policy);
        queue.start().await;

        let invoked_clone = invoked.clone();
        let handle = queue.enqueue(
            move |_ctx| {
                invoked_clone.fetch_add(1, StdOrdering::SeqCst);
                async move { Ok(()) }
            },
            None,
            None,
        );

        let result = handle.result().await;
        assert!(matches!(result, Err(JobError::SensorLimitExceeded(_))));
        let snap = metrics.snapshot();
        assert_eq!(snap.sensor_aborts, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.completed, 0);
        assert_eq!(invoked.load(StdOrdering::SeqCst), 0);
        queue.stop().await;
    }

    // S6 — Post-stop stability.
    #[tokio::test]
    async fn s6_post_stop_stability() {
        let queue: WorkQueue<i32> = WorkQueue::new(10, 2);
        queue.start().await;

        let mut handles = Vec::new();
        for i in 0..5 {
            handles.push(queue.enqueue(move |_ctx| async move { Ok(i) }, None, None));
        }

        queue.join().await;
        queue.stop().await;

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.result().await.unwrap());
        }
        values.sort();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);

        let snap = queue.metrics();
        assert_eq!(snap.started, 5);
        assert_eq!(snap.completed, 5);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let queue: WorkQueue<()> = WorkQueue::new(10, 2);
        queue.start().await;
        queue.start().await;
        let handle = queue.enqueue(|_ctx| async move { Ok(()) }, None, None);
        assert!(handle.result().await.is_ok());
        queue.stop().await;
    }
}
