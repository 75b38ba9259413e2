use std::collections::HashMap;

use super::MetricsCollector;

/// Blocks a canary step when any observed metric exceeds its configured
/// threshold. Missing metrics are treated as zero, matching the original's
/// `observed_metrics.get(key, 0)`.
pub struct HealthGate<'a> {
    thresholds: &'a HashMap<String, f64>,
    metrics: &'a MetricsCollector,
}

impl<'a> HealthGate<'a> {
    pub fn new(thresholds: &'a HashMap<String, f64>, metrics: &'a MetricsCollector) -> Self {
        Self { thresholds, metrics }
    }

    pub fn is_healthy(&self, observed: &HashMap<String, f64>) -> bool {
        for (key, threshold) in self.thresholds {
            let value = observed.get(key).copied().unwrap_or(0.0);
            if value > *threshold {
                self.metrics.record_health(
                    "health_gate_blocked",
                    serde_json::json!({
                        "metric": key,
                        "observed": value,
                        "threshold": threshold,
                    }),
                );
                return false;
            }
        }
        self.metrics
            .record_health("health_gate_passed", serde_json::json!(observed));
        true
    }
}
