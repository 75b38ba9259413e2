use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use super::{EngineJob, EngineMetrics, EngineMetricsSnapshot};

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub metrics: EngineMetricsSnapshot,
    pub guardrail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadyReport {
    pub status: &'static str,
    pub reason: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticFlag {
    pub code: &'static str,
    pub severity: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub uptime_seconds: f64,
    pub flags: Vec<DiagnosticFlag>,
    pub cooldown_advice: &'static str,
    pub debug_mode: bool,
}

struct Session {
    active: bool,
    end_at: Option<Instant>,
}

/// CPU load generator with a guardrailed control loop. Each tick schedules
/// a spin job sized to the current target load, drains at most one job
/// from the internal queue, and updates an EMA-smoothed `actual_load`.
pub struct LoadEngine {
    control_interval: Duration,
    max_safe_load: f64,
    smoothing_factor: f64,
    queue_limit: usize,
    metrics: Mutex<EngineMetrics>,
    jobs: Mutex<VecDeque<EngineJob>>,
    session: Mutex<Session>,
    last_guardrail_trigger: StdMutex<Option<String>>,
    debug_mode: AtomicBool,
    running: AtomicBool,
    stop_notify: Arc<Notify>,
    start_time: StdMutex<Option<Instant>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LoadEngine {
    pub fn new(control_interval: Duration, max_safe_load: f64, queue_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            control_interval,
            max_safe_load,
            smoothing_factor: 0.35,
            queue_limit,
            metrics: Mutex::new(EngineMetrics::default()),
            jobs: Mutex::new(VecDeque::new()),
            session: Mutex::new(Session {
                active: false,
                end_at: None,
            }),
            last_guardrail_trigger: StdMutex::new(None),
            debug_mode: AtomicBool::new(false),
            running: AtomicBool::new(false),
            stop_notify: Arc::new(Notify::new()),
            start_time: StdMutex::new(None),
            task: Mutex::new(None),
        })
    }

    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.start_time.lock().expect("start_time mutex poisoned") = Some(Instant::now());
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                let tick_start = Instant::now();
                engine.run_cycle().await;
                if !engine.running.load(Ordering::SeqCst) {
                    break;
                }
                let elapsed = tick_start.elapsed();
                let sleep_for = engine.control_interval.saturating_sub(elapsed);
                tokio::select! {
                    _ = tokio::time::sleep(sleep_for) => {}
                    _ = engine.stop_notify.notified() => break,
                }
            }
        });
        *self.task.lock().await = Some(handle);
        tracing::info!(event = "session_start", "engine started");
    }

    pub async fn stop(self: &Arc<Self>) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
        if let Some(handle) = self.task.lock().await.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
        }
        tracing::info!(event = "session_end", "engine stopped");
    }

    pub async fn start_session(&self, duration: Option<Duration>) {
        let mut session = self.session.lock().await;
        session.active = true;
        session.end_at = duration.map(|d| Instant::now() + d);
        tracing::info!(event = "session_start", ?duration, "session started");
    }

    pub async fn stop_session(&self) {
        let mut session = self.session.lock().await;
        session.active = false;
        session.end_at = None;
        tracing::info!(event = "session_end", "session finished");
    }

    pub async fn set_target_load(&self, target: f64) -> f64 {
        let target = target.clamp(0.0, 1.0);
        let adjusted = if target > self.max_safe_load {
            self.record_safety_trip("max_safe_load", Some(target)).await;
            self.max_safe_load
        } else {
            target
        };
        self.metrics.lock().await.target_load = adjusted;
        adjusted
    }

    async fn record_safety_trip(&self, reason: &str, requested: Option<f64>) {
        {
            let mut metrics = self.metrics.lock().await;
            *metrics
                .safety_trip_counts
                .entry(reason.to_string())
                .or_insert(0) += 1;
        }
        *self
            .last_guardrail_trigger
            .lock()
            .expect("guardrail mutex poisoned") = Some(reason.to_string());
        tracing::warn!(event = "guardrail", reason, ?requested, "guardrail triggered");
    }

    pub async fn health(&self) -> HealthReport {
        let metrics = self.metrics.lock().await.snapshot();
        HealthReport {
            status: "ok",
            metrics,
            guardrail: self
                .last_guardrail_trigger
                .lock()
                .expect("guardrail mutex poisoned")
                .clone(),
        }
    }

    pub async fn ready(&self) -> ReadyReport {
        let metrics = self.metrics.lock().await;
        if metrics.safety_trip_counts.values().any(|&count| count > 0) {
            return ReadyReport {
                status: "degraded",
                reason: Some("safety_trip"),
            };
        }
        if metrics.queue_depth as f64 >= self.queue_limit as f64 * 0.9 {
            return ReadyReport {
                status: "degraded",
                reason: Some("backpressure"),
            };
        }
        ReadyReport {
            status: "ready",
            reason: None,
        }
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        let metrics = self.metrics.lock().await.snapshot();
        let uptime_seconds = self
            .start_time
            .lock()
            .expect("start_time mutex poisoned")
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        let mut flags = Vec::new();
        if metrics.actual_load > 0.82 {
            flags.push(DiagnosticFlag {
                code: "LOAD-HOT",
                severity: "warn",
                message: "Actual load above 82%; monitor closely.".to_string(),
            });
        }
        if metrics.queue_depth as f64 >= self.queue_limit as f64 * 0.75 {
            flags.push(DiagnosticFlag {
                code: "QUEUE-PRESSURE",
                severity: "warn",
                message: "Queue nearing capacity; throttling likely.".to_string(),
            });
        }
        if let Some(error) = &metrics.last_error {
            flags.push(DiagnosticFlag {
                code: "ERROR",
                severity: "error",
                message: error.clone(),
            });
        }

        let cooldown_advice = if metrics.throttling_events > 0
            || metrics.safety_trip_counts.get("overload").copied().unwrap_or(0) > 0
        {
            "Reduce load and allow cooldown"
        } else {
            "Stable"
        };

        Diagnostics {
            uptime_seconds: (uptime_seconds * 100.0).round() / 100.0,
            flags,
            cooldown_advice,
            debug_mode: self.debug_mode.load(Ordering::SeqCst),
        }
    }

    pub fn set_debug_mode(&self, enabled: bool) {
        self.debug_mode.store(enabled, Ordering::SeqCst);
        tracing::info!(event = "debug_mode", enabled, "debug mode toggled");
    }

    async fn run_cycle(&self) {
        self.maybe_schedule_work().await;
        let busy_time = self.process_one_job().await;
        if busy_time.is_none() {
            self.update_actual_load(Duration::ZERO).await;
        }
    }

    async fn maybe_schedule_work(&self) {
        {
            let mut session = self.session.lock().await;
            if session.active {
                if let Some(end_at) = session.end_at {
                    if Instant::now() >= end_at {
                        session.active = false;
                        session.end_at = None;
                        tracing::info!(event = "session_end", "session finished");
                    }
                }
            }
            if !session.active {
                return;
            }
        }

        let target_load = self.metrics.lock().await.target_load;
        let busy_duration = self.control_interval.mul_f64(target_load);
        if busy_duration.is_zero() {
            return;
        }

        let mut jobs = self.jobs.lock().await;
        if jobs.len() >= self.queue_limit {
            drop(jobs);
            self.increment_throttling().await;
            return;
        }
        jobs.push_back(EngineJob {
            duration: busy_duration,
            source: "control",
        });
    }

    async fn increment_throttling(&self) {
        let depth = self.jobs.lock().await.len();
        let mut metrics = self.metrics.lock().await;
        metrics.throttling_events += 1;
        metrics.queue_depth = depth;
        tracing::info!(event = "throttle", queue_depth = depth, "throttling");
    }

    async fn process_one_job(&self) -> Option<Duration> {
        let job = self.jobs.lock().await.pop_front()?;
        let start = Instant::now();
        tokio::task::spawn_blocking(move || spin(job.duration))
            .await
            .expect("spin task panicked");
        let busy_time = start.elapsed();
        self.update_actual_load(busy_time).await;
        Some(busy_time)
    }

    async fn update_actual_load(&self, busy_time: Duration) {
        let measured = (busy_time.as_secs_f64() / self.control_interval.as_secs_f64()).clamp(0.0, 1.0);
        let depth = self.jobs.lock().await.len();
        let updated = {
            let mut metrics = self.metrics.lock().await;
            let previous = metrics.actual_load;
            let updated = (1.0 - self.smoothing_factor) * previous + self.smoothing_factor * measured;
            metrics.actual_load = updated;
            metrics.queue_depth = depth;
            updated
        };
        if updated > self.max_safe_load {
            self.record_safety_trip("overload", Some(updated)).await;
        }
    }
}

/// Busy-spins for `duration`. Runs inside `spawn_blocking` so it never
/// starves the async executor.
fn spin(duration: Duration) {
    let end = Instant::now() + duration;
    while Instant::now() < end {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_target_load_clamps_to_max_safe_load() {
        let engine = LoadEngine::new(Duration::from_millis(50), 0.9, 8);
        let adjusted = engine.set_target_load(0.95).await;
        assert_eq!(adjusted, 0.9);
        let health = engine.health().await;
        assert_eq!(health.guardrail.as_deref(), Some("max_safe_load"));
    }

    #[tokio::test]
    async fn ready_reports_backpressure_when_queue_near_full() {
        let engine = LoadEngine::new(Duration::from_millis(50), 0.9, 4);
        {
            let mut jobs = engine.jobs.lock().await;
            jobs.push_back(EngineJob {
                duration: Duration::from_millis(1),
                source: "control",
            });
            jobs.push_back(EngineJob {
                duration: Duration::from_millis(1),
                source: "control",
            });
            jobs.push_back(EngineJob {
                duration: Duration::from_millis(1),
                source: "control",
            });
        }
        engine.metrics.lock().await.queue_depth = 3;
        let ready = engine.ready().await;
        assert_eq!(ready.status, "degraded");
        assert_eq!(ready.reason, Some("backpressure"));
    }

    #[tokio::test]
    async fn run_cycle_without_active_session_keeps_queue_empty() {
        let engine = LoadEngine::new(Duration::from_millis(20), 0.9, 8);
        engine.run_cycle().await;
        assert_eq!(engine.jobs.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn start_and_stop_is_idempotent_and_clean() {
        let engine = LoadEngine::new(Duration::from_millis(10), 0.9, 8);
        engine.start().await;
        engine.start().await;
        engine.stop().await;
        engine.stop().await;
    }
}
