use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use super::error::JobError;

/// A per-job rearming liveness signal.
///
/// Starts `armed` (one implicit ping at construction). `ping` is idempotent
/// and may be called from any state. `monitor` consumes the armed signal and
/// waits up to `interval` for the next one; if none arrives, it resolves with
/// a heartbeat-missed failure. The loop only terminates via failure or
/// external cancellation (the worker aborts the monitor task once the job
/// task finishes).
pub struct Heartbeat {
    interval: Duration,
    notify: Notify,
    armed: AtomicBool,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Arc<Self> {
        let hb = Arc::new(Self {
            interval,
            notify: Notify::new(),
            armed: AtomicBool::new(false),
        });
        hb.ping();
        hb
    }

    pub fn ping(&self) {
        self.armed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Runs until a full interval elapses with no rearm. Intended to be
    /// raced against the job body via `tokio::select!` and aborted
    /// (`JoinHandle::abort`) once the job completes.
    pub async fn monitor(self: Arc<Self>) -> JobError {
        loop {
            // Consume the armed signal; the wait below is what actually
            // blocks until the next rearm or the interval elapses.
            self.armed.store(false, Ordering::SeqCst);
            match tokio::time::timeout(self.interval, self.notify.notified()).await {
                Ok(()) => continue,
                Err(_) => return JobError::HeartbeatMissed(self.interval),
            }
        }
    }
}

/// The handle a job body uses to rearm its heartbeat and cooperatively
/// suspend. Bound to at most one heartbeat; direct heartbeat access is not
/// part of the surface.
pub struct JobContext {
    heartbeat: Option<Arc<Heartbeat>>,
}

impl JobContext {
    pub fn new(heartbeat: Option<Arc<Heartbeat>>) -> Self {
        Self { heartbeat }
    }

    /// Forwards to the bound heartbeat, or is a no-op if none is configured.
    pub fn ping(&self) {
        if let Some(hb) = &self.heartbeat {
            hb.ping();
        }
    }

    /// Cooperative suspension of at least `delay`.
    pub async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
