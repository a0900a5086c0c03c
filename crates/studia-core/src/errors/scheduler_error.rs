/// Scheduler precondition violations. Durations are clamped, never rejected;
/// only a policy that cannot produce a grid is an error.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },
}
