//! Guardrailed CPU load generator feeding the HTTP server's health and
//! readiness endpoints.

mod engine;
mod metrics;

pub use engine::{Diagnostics, DiagnosticFlag, HealthReport, LoadEngine, ReadyReport};
pub use metrics::{EngineJob, EngineMetrics, EngineMetricsSnapshot};
