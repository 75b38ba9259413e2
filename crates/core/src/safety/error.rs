#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SafetyError {
    #[error("job already running")]
    JobAlreadyRunning,

    #[error("requested_runtime must be greater than zero")]
    InvalidRuntime,

    #[error("load must be within the configured limits")]
    LoadOutOfRange,

    #[error("sensor reading already above safety threshold")]
    SensorAlreadyBreached,

    #[error("heartbeat received for unknown job")]
    UnknownJobHeartbeat,
}
