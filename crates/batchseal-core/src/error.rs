use thiserror::Error;

pub type BatchsealResult<T> = Result<T, BatchsealError>;

/// Errors that abort a whole batch call (or the engine instance).
///
/// Per-file failures never show up here; they are recorded in the file's
/// `ProcessedFile` instead.
#[derive(Debug, Error)]
pub enum BatchsealError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("batch too large: {total} bytes exceeds the {limit} byte limit")]
    BatchTooLarge { total: u64, limit: u64 },

    #[error("key initialization failed: {0}")]
    KeyInitialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
