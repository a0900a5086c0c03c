/// Auto-tuner errors. A failed run must leave the stored policy unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    #[error("event log read failed: {reason}")]
    LogReadFailed { reason: String },
}
