//! Batch-wide progress: one scalar in `[0, 100]` across all files and chunks.

use std::sync::Arc;

/// Progress callback type (percent in `[0, 100]`)
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Overall percentage when file `index` of `total` is `fraction` done.
///
/// `index` is the file's fixed input position, not its completion rank, so
/// files finishing out of order can interleave lower and higher readings.
pub fn overall_percent(index: usize, total: usize, fraction: f64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let n = total as f64;
    let fraction = fraction.clamp(0.0, 1.0);
    let percent = (index as f64 / n) * 100.0 + (fraction / n) * 100.0;
    percent.clamp(0.0, 100.0)
}

/// Fans per-file chunk progress into the caller's callback.
#[derive(Clone)]
pub struct BatchProgress {
    total_files: usize,
    callback: Option<ProgressFn>,
}

impl BatchProgress {
    pub fn new(total_files: usize, callback: Option<ProgressFn>) -> Self {
        Self {
            total_files,
            callback,
        }
    }

    /// Report chunk-level progress for the file at `index`.
    pub fn chunk_done(&self, index: usize, completed: usize, total_chunks: usize) {
        let fraction = if total_chunks == 0 {
            1.0
        } else {
            completed as f64 / total_chunks as f64
        };
        self.emit(overall_percent(index, self.total_files, fraction));
    }

    /// The file at `index` has settled (success or failure).
    pub fn file_done(&self, index: usize) {
        self.emit(overall_percent(index, self.total_files, 1.0));
    }

    /// Every file has settled.
    pub fn finish(&self) {
        self.emit(100.0);
    }

    fn emit(&self, percent: f64) {
        if let Some(cb) = &self.callback {
            cb(percent);
        }
    }
}

impl std::fmt::Debug for BatchProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProgress")
            .field("total_files", &self.total_files)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
