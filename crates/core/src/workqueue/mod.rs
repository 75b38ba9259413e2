//! Cooperative, sensor-gated, heartbeat-monitored work queue.
//!
//! Bounded admission, concurrent execution, per-job deadlines, liveness
//! monitoring, environmental back-pressure, and cancellation — the
//! highest-scrutiny subsystem of this repository.

mod error;
mod heartbeat;
mod metrics;
mod queue;
mod sensor;

pub use error::JobError;
pub use heartbeat::{Heartbeat, JobContext};
pub use metrics::{Metrics, MetricsSnapshot};
pub use queue::{JobHandle, WorkQueue};
pub use sensor::{SensorPolicy, SensorReader, SensorSnapshot};
