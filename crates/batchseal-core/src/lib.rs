pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{BatchsealError, BatchsealResult};
pub use types::{FileStatus, InputFile, ProcessedFile};

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;
