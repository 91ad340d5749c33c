//! batchseal-engine: chunked authenticated encryption of file batches
//!
//! # Overview
//! - `engine`: batch orchestration, one result per input at its input index
//! - `queue`: bounded FIFO admission of per-file tasks (pool of 2..=8)
//! - `scheduler`: split → concurrent per-chunk AEAD → reassemble by sequence
//! - `validate`: batch-fatal and per-file pre-flight checks
//! - `progress`: single 0–100 progress value across files and chunks

pub mod engine;
pub mod error;
pub mod progress;
pub mod queue;
pub mod scheduler;
pub mod validate;

pub use batchseal_core::{BatchsealError, BatchsealResult, FileStatus, InputFile, ProcessedFile};
pub use batchseal_crypto::Mode;
pub use engine::Engine;
pub use error::{ChunkError, FileError, ValidationError};
pub use progress::ProgressFn;
pub use queue::TaskQueue;
pub use scheduler::{ChunkScheduler, ChunkTransform};
