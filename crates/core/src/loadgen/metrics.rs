use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    pub target_load: f64,
    pub actual_load: f64,
    pub queue_depth: usize,
    pub throttling_events: u64,
    pub safety_trip_counts: HashMap<String, u64>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetricsSnapshot {
    pub target_load: f64,
    pub actual_load: f64,
    pub queue_depth: usize,
    pub throttling_events: u64,
    pub safety_trip_counts: HashMap<String, u64>,
    pub last_error: Option<String>,
}

impl EngineMetrics {
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            target_load: self.target_load,
            actual_load: self.actual_load,
            queue_depth: self.queue_depth,
            throttling_events: self.throttling_events,
            safety_trip_counts: self.safety_trip_counts.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineJob {
    pub duration: std::time::Duration,
    pub source: &'static str,
}
