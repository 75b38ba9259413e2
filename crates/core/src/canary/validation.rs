use serde_json::Value;

use super::MetricsCollector;

/// Named pre-flight checks run against a telemetry snapshot before a
/// canary rollout is allowed to start.
pub struct ValidationSuite<'a> {
    checks: &'a [String],
    metrics: &'a MetricsCollector,
}

impl<'a> ValidationSuite<'a> {
    pub fn new(checks: &'a [String], metrics: &'a MetricsCollector) -> Self {
        Self { checks, metrics }
    }

    pub fn run(&self, telemetry: &Value) -> bool {
        let has_check = |name: &str| self.checks.iter().any(|c| c == name);
        let mut failed = Vec::new();

        if has_check("ensure_min_capacity")
            && telemetry
                .get("available_capacity")
                .and_then(Value::as_f64)
                .unwrap_or(0.0)
                < 20.0
        {
            failed.push("ensure_min_capacity");
        }

        if has_check("ensure_monitoring")
            && !telemetry
                .get("monitoring")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        {
            failed.push("ensure_monitoring");
        }

        if has_check("ensure_release_notes")
            && !telemetry
                .get("release_notes")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        {
            failed.push("ensure_release_notes");
        }

        if !failed.is_empty() {
            self.metrics.record_error(
                "validation_failed",
                serde_json::json!({ "failed_checks": failed, "telemetry": telemetry }),
            );
            return false;
        }

        self.metrics
            .record_event("validation_passed", serde_json::json!({ "telemetry": telemetry }));
        true
    }
}
