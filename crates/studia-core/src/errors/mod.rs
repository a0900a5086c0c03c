//! Error types, one enum per subsystem plus the umbrella [`StudiaError`].

mod scheduler_error;
mod storage_error;
mod sync_error;
mod tuner_error;

pub use scheduler_error::SchedulerError;
pub use storage_error::StorageError;
pub use sync_error::SyncError;
pub use tuner_error::TunerError;

/// Umbrella error for the whole workspace.
#[derive(Debug, thiserror::Error)]
pub enum StudiaError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Tuner(#[from] TunerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StudiaResult<T> = Result<T, StudiaError>;
