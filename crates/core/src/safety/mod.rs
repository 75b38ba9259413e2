//! Safety envelope: single-job lifecycle plus the priority-ordered checks
//! that force a shutdown when a limit is breached.

mod controller;
mod error;

pub use controller::{DebugMetrics, Flags, HeatingMachineController, JobState, MachineState};
pub use error::SafetyError;
