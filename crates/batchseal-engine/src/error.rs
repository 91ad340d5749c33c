use batchseal_crypto::CryptoError;
use thiserror::Error;

/// Per-file validation failures. Scoped to one file; siblings are unaffected.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("file {name:?} is {size} bytes, over the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("file name {0:?} contains characters outside [A-Za-z0-9 ._-]")]
    UnsafeName(String),
}

/// Why a single chunk could not be produced.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk {sequence}: {source}")]
    Crypto {
        sequence: usize,
        #[source]
        source: CryptoError,
    },

    #[error("chunk {sequence}: worker aborted: {reason}")]
    Aborted { sequence: usize, reason: String },
}

/// Per-file failure, rendered into `ProcessedFile::error`.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read {file:?}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to process {file:?}: {source}")]
    Processing {
        file: String,
        #[source]
        source: ChunkError,
    },
}
