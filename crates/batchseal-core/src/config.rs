use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{BatchsealError, BatchsealResult};
use crate::MIB;

/// Environment variable overriding the file-level concurrency hint.
pub const POOL_SIZE_ENV: &str = "BATCHSEAL_POOL_SIZE";

/// Top-level configuration (loaded from batchseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchsealConfig {
    pub engine: EngineConfig,
    pub log: LogConfig,
}

impl BatchsealConfig {
    /// Read and validate a TOML configuration file.
    ///
    /// I/O failures surface as `Other` with the path attached; parse and
    /// validation failures stay `Config`.
    pub fn load(path: &Path) -> BatchsealResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = Self::from_toml_str(&raw).map_err(|e| match e {
            BatchsealError::Config(msg) => {
                BatchsealError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> BatchsealResult<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| BatchsealError::Config(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }
}

/// Chunking, size caps and concurrency for the processing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Plaintext bytes per chunk (default: 2 MiB)
    pub chunk_size: usize,
    /// Largest accepted single file in bytes (default: 100 MiB)
    pub max_file_size: u64,
    /// Largest accepted batch total in bytes (default: 500 MiB)
    pub max_batch_size: u64,
    /// Concurrent files (0 = available parallelism); always clamped to 2..=8
    pub pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2 * MIB as usize,
            max_file_size: 100 * MIB,
            max_batch_size: 500 * MIB,
            pool_size: 0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> BatchsealResult<()> {
        if self.chunk_size == 0 {
            return Err(BatchsealError::Config("chunk_size must be non-zero".into()));
        }
        if self.max_file_size > self.max_batch_size {
            return Err(BatchsealError::Config(format!(
                "max_file_size ({}) exceeds max_batch_size ({})",
                self.max_file_size, self.max_batch_size
            )));
        }
        Ok(())
    }

    /// Raw parallelism hint before clamping, or `None` when nothing is known.
    ///
    /// Precedence: `BATCHSEAL_POOL_SIZE`, then `pool_size`, then the host's
    /// available parallelism.
    pub fn pool_size_hint(&self) -> Option<usize> {
        self.pool_size_hint_from(std::env::var(POOL_SIZE_ENV).ok().as_deref())
    }

    fn pool_size_hint_from(&self, env: Option<&str>) -> Option<usize> {
        if let Some(n) = env.and_then(|s| s.trim().parse::<usize>().ok()) {
            if n > 0 {
                return Some(n);
            }
        }
        if self.pool_size > 0 {
            return Some(self.pool_size);
        }
        std::thread::available_parallelism().ok().map(|n| n.get())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}
