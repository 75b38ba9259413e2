use std::collections::HashMap;

use serde_json::Value;

use crate::config::EnvironmentProfile;

use super::{HealthGate, MetricsCollector, ValidationSuite};

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseState {
    pub environment: String,
    pub heat_level: i64,
    pub last_stable: i64,
    pub history: Vec<i64>,
    pub failed: bool,
}

impl ReleaseState {
    fn new(profile: &EnvironmentProfile) -> Self {
        Self {
            environment: profile.name.clone(),
            heat_level: profile.min_heat,
            last_stable: profile.min_heat,
            history: vec![profile.min_heat],
            failed: false,
        }
    }
}

/// Drives a single canary rollout: validate telemetry, then raise heat one
/// increment per healthy snapshot, rolling back to the last stable level on
/// the first validation or health failure.
pub struct CanaryReleaseManager<'a> {
    profile: &'a EnvironmentProfile,
    metrics: &'a MetricsCollector,
    health_gate: HealthGate<'a>,
    validation_suite: ValidationSuite<'a>,
    state: ReleaseState,
}

impl<'a> CanaryReleaseManager<'a> {
    pub fn new(
        profile: &'a EnvironmentProfile,
        metrics: &'a MetricsCollector,
        health_gate: HealthGate<'a>,
        validation_suite: ValidationSuite<'a>,
    ) -> Self {
        Self {
            profile,
            metrics,
            health_gate,
            validation_suite,
            state: ReleaseState::new(profile),
        }
    }

    pub fn state(&self) -> &ReleaseState {
        &self.state
    }

    fn raise_heat(&mut self) {
        let next_level = self
            .profile
            .max_heat
            .min(self.state.heat_level + self.profile.increment());
        self.state.last_stable = self.state.heat_level;
        self.state.heat_level = next_level;
        self.state.history.push(next_level);
        self.metrics.record_event(
            "heat_increased",
            serde_json::json!({
                "environment": self.profile.name,
                "new_heat": next_level,
                "last_stable": self.state.last_stable,
            }),
        );
    }

    pub fn rollback(&mut self) {
        self.metrics.record_error(
            "rollback_triggered",
            serde_json::json!({
                "environment": self.profile.name,
                "rollback_to": self.state.last_stable,
            }),
        );
        self.state.heat_level = self.state.last_stable;
        self.state.history.push(self.state.last_stable);
        self.state.failed = true;
    }

    pub fn run_canary(
        &mut self,
        health_snapshots: impl IntoIterator<Item = HashMap<String, f64>>,
        telemetry: &Value,
    ) -> &ReleaseState {
        if !self.validation_suite.run(telemetry) {
            self.rollback();
            return &self.state;
        }

        for snapshot in health_snapshots {
            if !self.health_gate.is_healthy(&snapshot) {
                self.rollback();
                break;
            }
            self.raise_heat();
        }

        if !self.state.failed && self.state.heat_level >= self.profile.max_heat {
            self.metrics.record_event(
                "rollout_complete",
                serde_json::json!({
                    "environment": self.profile.name,
                    "target": self.state.heat_level,
                }),
            );
        }

        &self.state
    }
}
