//! Canary rollout: validation, health gating, and staged heat increases
//! with automatic rollback.

mod health;
mod metrics;
mod release_manager;
mod validation;

pub use health::HealthGate;
pub use metrics::{MetricEvent, MetricLevel, MetricsCollector};
pub use release_manager::{CanaryReleaseManager, ReleaseState};
pub use validation::ValidationSuite;

use std::collections::HashMap;

use serde_json::Value;

use crate::config::{ConfigError, ConfigLoader, EnvironmentProfile};

/// Loads the named environment profile and drives a full canary rollout
/// against it, returning the resulting state. A thin convenience wrapper
/// around [`CanaryReleaseManager`] for callers that only need one shot.
pub fn run_canary_with_rollback(
    loader: &ConfigLoader,
    environment: &str,
    health_snapshots: impl IntoIterator<Item = HashMap<String, f64>>,
    telemetry: &Value,
) -> Result<(EnvironmentProfile, MetricsCollector, ReleaseState), ConfigError> {
    let profile = loader.load(environment)?;
    let metrics = MetricsCollector::new();
    let health_gate = HealthGate::new(&profile.health_thresholds, &metrics);
    let validation_suite = ValidationSuite::new(&profile.validation_checks, &metrics);
    let mut manager = CanaryReleaseManager::new(&profile, &metrics, health_gate, validation_suite);
    let state = manager.run_canary(health_snapshots, telemetry).clone();
    Ok((profile, metrics, state))
}
