use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use super::error::JobError;
use super::metrics::Metrics;

/// An immutable environmental reading. Missing fields mean "unknown"; unknown
/// fields never trigger a violation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    pub temperature_c: Option<f64>,
    pub battery_percent: Option<f64>,
}

/// A pluggable source of [`SensorSnapshot`]s, read once per `enforce` loop
/// iteration. Must be idempotent and free of side effects observable to the
/// queue.
pub trait SensorReader: Send + Sync {
    fn read(&self) -> Pin<Box<dyn Future<Output = SensorSnapshot> + Send + '_>>;
}

impl<F, Fut> SensorReader for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = SensorSnapshot> + Send + 'static,
{
    fn read(&self) -> Pin<Box<dyn Future<Output = SensorSnapshot> + Send + '_>> {
        Box::pin((self)())
    }
}

/// Admission gating applied before each job runs. Immutable after
/// construction.
pub struct SensorPolicy {
    reader: Option<Arc<dyn SensorReader>>,
    max_temperature_c: Option<f64>,
    min_battery_percent: Option<f64>,
    cooldown: Duration,
    stop_on_violation: bool,
    metrics: Arc<Metrics>,
}

impl SensorPolicy {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            reader: None,
            max_temperature_c: None,
            min_battery_percent: None,
            cooldown: Duration::from_millis(500),
            stop_on_violation: false,
            metrics,
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn SensorReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_max_temperature_c(mut self, max: f64) -> Self {
        self.max_temperature_c = Some(max);
        self
    }

    pub fn with_min_battery_percent(mut self, min: f64) -> Self {
        self.min_battery_percent = Some(min);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_stop_on_violation(mut self, stop: bool) -> Self {
        self.stop_on_violation = stop;
        self
    }

    fn has_violation(&self, snapshot: &SensorSnapshot) -> bool {
        let over_temp = match (self.max_temperature_c, snapshot.temperature_c) {
            (Some(max), Some(reading)) => reading > max,
            _ => false,
        };
        let low_battery = match (self.min_battery_percent, snapshot.battery_percent) {
            (Some(min), Some(reading)) => reading < min,
            _ => false,
        };
        over_temp || low_battery
    }

    /// Runs to completion with either a normal return (safe to proceed) or a
    /// `SensorLimitExceeded` failure. A no-op when no reader is configured.
    pub async fn enforce(&self) -> Result<(), JobError> {
        let Some(reader) = &self.reader else {
            return Ok(());
        };
        loop {
            let snapshot = reader.read().await;
            if !self.has_violation(&snapshot) {
                return Ok(());
            }
            if self.stop_on_violation {
                self.metrics.inc_sensor_aborts();
                return Err(JobError::SensorLimitExceeded(
                    "sensor thresholds exceeded; stopping queued job".to_string(),
                ));
            }
            self.metrics.inc_sensor_throttles();
            tracing::debug!(cooldown_ms = self.cooldown.as_millis(), "sensor violation; throttling");
            tokio::time::sleep(self.cooldown).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ConstantReader(SensorSnapshot);

    impl SensorReader for ConstantReader {
        fn read(&self) -> Pin<Box<dyn Future<Output = SensorSnapshot> + Send + '_>> {
            let snapshot = self.0;
            Box::pin(async move { snapshot })
        }
    }

    #[tokio::test]
    async fn no_reader_is_noop() {
        let policy = SensorPolicy::new(Metrics::new());
        assert!(policy.enforce().await.is_ok());
    }

    #[tokio::test]
    async fn unknown_reading_never_violates() {
        let policy = SensorPolicy::new(Metrics::new())
            .with_reader(Arc::new(ConstantReader(SensorSnapshot::default())))
            .with_max_temperature_c(70.0);
        assert!(policy.enforce().await.is_ok());
    }

    #[tokio::test]
    async fn abort_on_violation_when_stop_on_violation() {
        let metrics = Metrics::new();
        let policy = SensorPolicy::new(metrics.clone())
            .with_reader(Arc::new(ConstantReader(SensorSnapshot {
                temperature_c: Some(100.0),
                battery_percent: None,
            })))
            .with_max_temperature_c(80.0)
            .with_stop_on_violation(true);

        let result = policy.enforce().await;
        assert!(matches!(result, Err(JobError::SensorLimitExceeded(_))));
        assert_eq!(metrics.snapshot().sensor_aborts, 1);
    }

    #[tokio::test]
    async fn throttles_then_passes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let reader = move || {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let temp = [90.0, 85.0, 65.0][n.min(2)];
                SensorSnapshot {
                    temperature_c: Some(temp),
                    battery_percent: None,
                }
            }
        };
        let metrics = Metrics::new();
        let policy = SensorPolicy::new(metrics.clone())
            .with_reader(Arc::new(reader))
            .with_max_temperature_c(70.0)
            .with_cooldown(Duration::from_millis(5));

        assert!(policy.enforce().await.is_ok());
        assert!(metrics.snapshot().sensor_throttles >= 1);
    }
}
