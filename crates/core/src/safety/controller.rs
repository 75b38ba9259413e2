use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::MachineConfig;

use super::SafetyError;

#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    pub job_id: String,
    pub start_time: f64,
    pub target_stop_time: f64,
    pub last_heartbeat: f64,
    pub load: f64,
    pub sensor_reading: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugMetrics {
    pub starts: u64,
    pub stops: u64,
    pub shutdowns: u64,
    pub heartbeat_missed: u64,
    pub sensor_breach: u64,
    pub runaway_jobs: u64,
    pub limit_enforced: u64,
    pub config_errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    Running,
    Stopped,
    SafeShutdown,
}

#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub safe_shutdown: bool,
    pub last_error: Option<String>,
}

fn wall_clock_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

/// Coordinates the single active job's lifecycle and the safety checks that
/// can force-stop it. At most one [`JobState`] is active at a time.
pub struct HeatingMachineController {
    config: MachineConfig,
    clock: Arc<dyn Fn() -> f64 + Send + Sync>,
    state: MachineState,
    active_job: Option<JobState>,
    flags: Flags,
    metrics: DebugMetrics,
}

impl HeatingMachineController {
    pub fn new(config: MachineConfig) -> Result<Self, crate::config::ConfigError> {
        Self::with_clock(config, Arc::new(wall_clock_seconds))
    }

    pub fn with_clock(
        config: MachineConfig,
        clock: Arc<dyn Fn() -> f64 + Send + Sync>,
    ) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            state: MachineState::Idle,
            active_job: None,
            flags: Flags::default(),
            metrics: DebugMetrics::default(),
        })
    }

    pub fn start(
        &mut self,
        job_id: impl Into<String>,
        requested_runtime: f64,
        load: f64,
        sensor_reading: f64,
    ) -> Result<JobState, SafetyError> {
        if self.active_job.is_some() {
            self.flags.last_error = Some("job_already_running".to_string());
            return Err(SafetyError::JobAlreadyRunning);
        }

        if requested_runtime <= 0.0 {
            self.metrics.config_errors += 1;
            return Err(SafetyError::InvalidRuntime);
        }

        if load <= 0.0 || load > self.config.max_load {
            self.metrics.limit_enforced += 1;
            return Err(SafetyError::LoadOutOfRange);
        }

        if sensor_reading >= self.config.sensor_threshold {
            self.metrics.sensor_breach += 1;
            return Err(SafetyError::SensorAlreadyBreached);
        }

        let now = (self.clock)();
        let target_stop_time =
            now + requested_runtime.min(self.config.max_runtime_seconds as f64);
        let job = JobState {
            job_id: job_id.into(),
            start_time: now,
            target_stop_time,
            last_heartbeat: now,
            load,
            sensor_reading,
        };
        self.active_job = Some(job.clone());
        self.state = MachineState::Running;
        self.flags = Flags {
            safe_shutdown: false,
            last_error: None,
        };
        self.metrics.starts += 1;
        Ok(job)
    }

    pub fn heartbeat(&mut self, job_id: &str) -> Result<(), SafetyError> {
        match &mut self.active_job {
            Some(job) if job.job_id == job_id => {
                job.last_heartbeat = (self.clock)();
                Ok(())
            }
            _ => {
                self.metrics.heartbeat_missed += 1;
                Err(SafetyError::UnknownJobHeartbeat)
            }
        }
    }

    pub fn stop(&mut self, reason: &str) {
        if self.active_job.is_none() {
            return;
        }
        self.state = MachineState::Stopped;
        self.active_job = None;
        self.metrics.stops += 1;
        self.flags = Flags {
            safe_shutdown: false,
            last_error: Some(reason.to_string()),
        };
    }

    /// Runs the priority-ordered safety checks and force-stops on the first
    /// violation: runtime exceeded, missed heartbeat, sensor/temperature
    /// breach, then runaway load.
    pub fn evaluate_safety(&mut self, sensor_reading: f64, load: f64) {
        let Some(job) = self.active_job.as_mut() else {
            return;
        };

        let now = (self.clock)();
        job.sensor_reading = sensor_reading;
        job.load = load;

        if now >= job.target_stop_time {
            self.metrics.limit_enforced += 1;
            self.safe_shutdown("runtime_exceeded");
            return;
        }

        if now - job.last_heartbeat > self.config.heartbeat_timeout_seconds as f64 {
            self.metrics.heartbeat_missed += 1;
            self.safe_shutdown("missed_heartbeat");
            return;
        }

        if sensor_reading >= self.config.max_temperature || sensor_reading >= self.config.sensor_threshold {
            self.metrics.sensor_breach += 1;
            self.safe_shutdown("sensor_threshold_breach");
            return;
        }

        if load > self.config.max_load * 1.25 {
            self.metrics.runaway_jobs += 1;
            self.safe_shutdown("runaway_job_detected");
        }
    }

    fn safe_shutdown(&mut self, reason: &str) {
        self.state = MachineState::SafeShutdown;
        self.flags = Flags {
            safe_shutdown: true,
            last_error: Some(reason.to_string()),
        };
        self.metrics.shutdowns += 1;
        self.active_job = None;
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn debug_snapshot(&self) -> DebugMetrics {
        self.metrics
    }

    pub fn active_job(&self) -> Option<&JobState> {
        self.active_job.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn controller_with_clock() -> (HeatingMachineController, Arc<AtomicU64>) {
        let seconds = Arc::new(AtomicU64::new(1000));
        let seconds_for_clock = seconds.clone();
        let clock: Arc<dyn Fn() -> f64 + Send + Sync> =
            Arc::new(move || seconds_for_clock.load(Ordering::SeqCst) as f64);
        let controller =
            HeatingMachineController::with_clock(MachineConfig::default(), clock).unwrap();
        (controller, seconds)
    }

    #[test]
    fn start_rejects_second_job() {
        let (mut controller, _clock) = controller_with_clock();
        controller.start("job-1", 60.0, 0.5, 0.0).unwrap();
        assert_eq!(
            controller.start("job-2", 60.0, 0.5, 0.0),
            Err(SafetyError::JobAlreadyRunning)
        );
    }

    #[test]
    fn start_rejects_sensor_already_over_threshold() {
        let (mut controller, _clock) = controller_with_clock();
        let threshold = controller.config.sensor_threshold;
        assert_eq!(
            controller.start("job-1", 60.0, 0.5, threshold),
            Err(SafetyError::SensorAlreadyBreached)
        );
    }

    #[test]
    fn runtime_exceeded_triggers_safe_shutdown() {
        let (mut controller, seconds) = controller_with_clock();
        controller.start("job-1", 10.0, 0.5, 0.0).unwrap();
        seconds.fetch_add(11, Ordering::SeqCst);
        controller.evaluate_safety(0.0, 0.5);
        assert_eq!(controller.state(), MachineState::SafeShutdown);
        assert_eq!(controller.flags().last_error.as_deref(), Some("runtime_exceeded"));
    }

    #[test]
    fn missed_heartbeat_triggers_safe_shutdown() {
        let (mut controller, seconds) = controller_with_clock();
        controller.start("job-1", 3600.0, 0.5, 0.0).unwrap();
        seconds.fetch_add(
            controller.config.heartbeat_timeout_seconds + 1,
            Ordering::SeqCst,
        );
        controller.evaluate_safety(0.0, 0.5);
        assert_eq!(controller.flags().last_error.as_deref(), Some("missed_heartbeat"));
    }

    #[test]
    fn runaway_load_triggers_safe_shutdown() {
        let (mut controller, _seconds) = controller_with_clock();
        controller.start("job-1", 3600.0, 0.5, 0.0).unwrap();
        let runaway_load = controller.config.max_load * 1.3;
        controller.evaluate_safety(0.0, runaway_load);
        assert_eq!(controller.flags().last_error.as_deref(), Some("runaway_job_detected"));
    }

    #[test]
    fn heartbeat_for_unknown_job_is_rejected() {
        let (mut controller, _clock) = controller_with_clock();
        assert_eq!(
            controller.heartbeat("nonexistent"),
            Err(SafetyError::UnknownJobHeartbeat)
        );
    }
}
