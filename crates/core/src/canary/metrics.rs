use std::sync::Mutex;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricLevel {
    Info,
    Error,
    Health,
}

#[derive(Debug, Clone)]
pub struct MetricEvent {
    pub message: String,
    pub details: Value,
    pub level: MetricLevel,
}

/// Append-only log of canary rollout events, queryable by level. `details`
/// is a free-form JSON object, mirroring the original's `**details`
/// keyword-argument bag.
#[derive(Default)]
pub struct MetricsCollector {
    events: Mutex<Vec<MetricEvent>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self, message: impl Into<String>, details: Value) {
        self.push(message.into(), details, MetricLevel::Info);
    }

    pub fn record_error(&self, message: impl Into<String>, details: Value) {
        self.push(message.into(), details, MetricLevel::Error);
    }

    pub fn record_health(&self, status: impl Into<String>, details: Value) {
        self.push(status.into(), details, MetricLevel::Health);
    }

    fn push(&self, message: String, details: Value, level: MetricLevel) {
        self.events
            .lock()
            .expect("metrics mutex poisoned")
            .push(MetricEvent {
                message,
                details,
                level,
            });
    }

    pub fn latest_by_level(&self, level: MetricLevel) -> Vec<MetricEvent> {
        self.events
            .lock()
            .expect("metrics mutex poisoned")
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_filters_by_level() {
        let metrics = MetricsCollector::new();
        metrics.record_event("validation_passed", serde_json::json!({}));
        metrics.record_error(
            "validation_failed",
            serde_json::json!({ "failed_checks": ["ensure_monitoring"] }),
        );

        assert_eq!(metrics.latest_by_level(MetricLevel::Info).len(), 1);
        assert_eq!(metrics.latest_by_level(MetricLevel::Error).len(), 1);
        assert!(metrics.latest_by_level(MetricLevel::Health).is_empty());
    }
}
