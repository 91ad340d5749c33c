//! Pre-flight checks: batch-fatal (empty batch, total size) and per-file
//! (size cap, file name character set).

use batchseal_core::config::EngineConfig;
use batchseal_core::{BatchsealError, BatchsealResult, InputFile};

use crate::error::ValidationError;

/// Reject requests that must not start at all. Nothing is read here.
pub fn validate_batch(files: &[InputFile], config: &EngineConfig) -> BatchsealResult<()> {
    if files.is_empty() {
        return Err(BatchsealError::InvalidInput("no files provided".into()));
    }

    let total = files
        .iter()
        .fold(0u64, |acc, f| acc.saturating_add(f.size()));
    if total > config.max_batch_size {
        return Err(BatchsealError::BatchTooLarge {
            total,
            limit: config.max_batch_size,
        });
    }
    Ok(())
}

/// Check one file against the per-file cap and the safe name set.
pub fn validate_file(file: &InputFile, config: &EngineConfig) -> Result<(), ValidationError> {
    if file.size() > config.max_file_size {
        return Err(ValidationError::TooLarge {
            name: file.name.clone(),
            size: file.size(),
            limit: config.max_file_size,
        });
    }
    if !is_safe_name(&file.name) {
        return Err(ValidationError::UnsafeName(file.name.clone()));
    }
    Ok(())
}

/// Non-empty and only ASCII letters, digits, `-`, `_`, `.` and space.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
}
