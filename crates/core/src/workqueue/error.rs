/// Failure kinds a job handle can resolve with.
///
/// Never raised out of `WorkQueue::enqueue` — delivered via the completion
/// handle and classified exactly once by the worker that ran the job.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("queue is at capacity")]
    QueueFull,

    #[error("sensor policy aborted the job: {0}")]
    SensorLimitExceeded(String),

    #[error("job exceeded its duration limit of {0:?}")]
    Timeout(std::time::Duration),

    #[error("job missed its heartbeat interval of {0:?}")]
    HeartbeatMissed(std::time::Duration),

    #[error("job failed: {0}")]
    JobFailure(String),
}
