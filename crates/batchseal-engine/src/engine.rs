//! Batch orchestrator: validate, queue, process, collect.
//!
//! - `process_files`: batch pre-flight → bounded queue → per-file validation →
//!   chunk scheduler → result slot at the file's input index
//! - `encrypt_files` / `decrypt_files`: mode-specific wrappers
//!
//! Every input yields exactly one `ProcessedFile` at its own index. Only the
//! batch pre-flight checks return an error from the call itself.

use std::sync::{Arc, Mutex, PoisonError};

use batchseal_core::config::EngineConfig;
use batchseal_core::{BatchsealError, BatchsealResult, InputFile, ProcessedFile};
use batchseal_crypto::{ChunkCodec, Mode, SessionKeyManager};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{FileError, ValidationError};
use crate::progress::{BatchProgress, ProgressFn};
use crate::queue::TaskQueue;
use crate::scheduler::{ChunkScheduler, ChunkTransform};
use crate::validate::{validate_batch, validate_file};

type ResultSlots = Arc<Mutex<Vec<Option<ProcessedFile>>>>;

/// One processing session: a session key, a chunk scheduler bound to it, and
/// the file-level admission queue.
///
/// Output can only be decrypted by the same instance that produced it; the
/// key is dropped with the engine.
pub struct Engine {
    config: EngineConfig,
    scheduler: ChunkScheduler,
    queue: TaskQueue,
}

impl Engine {
    /// Create an engine with a fresh session key from the OS RNG.
    ///
    /// Must be called from within a Tokio runtime; the file queue's
    /// dispatcher is spawned here.
    pub fn new(config: EngineConfig) -> BatchsealResult<Self> {
        Self::from_rng(config, &mut OsRng)
    }

    /// Create an engine whose session key is drawn from `rng`.
    ///
    /// A key generation failure is fatal for the instance; build a new one.
    pub fn from_rng<R: RngCore + CryptoRng>(
        config: EngineConfig,
        rng: &mut R,
    ) -> BatchsealResult<Self> {
        let keys = SessionKeyManager::from_rng(rng)
            .map_err(|e| BatchsealError::KeyInitialization(e.to_string()))?;
        Self::with_transform(config, Arc::new(ChunkCodec::new(keys.key())))
    }

    /// Create an engine around a custom chunk transform. Needs a Tokio
    /// runtime, like [`Engine::new`].
    pub fn with_transform(
        config: EngineConfig,
        transform: Arc<dyn ChunkTransform>,
    ) -> BatchsealResult<Self> {
        config.validate()?;
        let queue = TaskQueue::new(config.pool_size_hint());
        let scheduler = ChunkScheduler::new(transform, config.chunk_size);
        debug!(
            chunk_size = config.chunk_size,
            pool_size = queue.pool_size(),
            "engine ready"
        );
        Ok(Self {
            config,
            scheduler,
            queue,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Maximum number of files processed concurrently.
    pub fn pool_size(&self) -> usize {
        self.queue.pool_size()
    }

    pub async fn encrypt_files(
        &self,
        files: Vec<InputFile>,
        on_progress: Option<ProgressFn>,
    ) -> BatchsealResult<Vec<ProcessedFile>> {
        self.process_files(files, Mode::Encrypt, on_progress).await
    }

    pub async fn decrypt_files(
        &self,
        files: Vec<InputFile>,
        on_progress: Option<ProgressFn>,
    ) -> BatchsealResult<Vec<ProcessedFile>> {
        self.process_files(files, Mode::Decrypt, on_progress).await
    }

    /// Transform a batch of files.
    ///
    /// Fails only for an empty batch or one over the total size cap; every
    /// other failure is recorded in that file's `ProcessedFile`. Resolves once
    /// every file has settled, with results in input order.
    pub async fn process_files(
        &self,
        files: Vec<InputFile>,
        mode: Mode,
        on_progress: Option<ProgressFn>,
    ) -> BatchsealResult<Vec<ProcessedFile>> {
        validate_batch(&files, &self.config)?;

        let total = files.len();
        info!(files = total, %mode, pool_size = self.pool_size(), "batch started");

        let slots: ResultSlots = Arc::new(Mutex::new(vec![None; total]));
        let progress = BatchProgress::new(total, on_progress);
        let mut settled = Vec::with_capacity(total);

        for (index, file) in files.iter().enumerate() {
            let (done_tx, done_rx) = oneshot::channel::<()>();
            settled.push(done_rx);

            let file = file.clone();
            let config = self.config.clone();
            let scheduler = self.scheduler.clone();
            let slots = Arc::clone(&slots);
            let progress = progress.clone();
            self.queue.submit(async move {
                let record =
                    match process_one(&scheduler, &config, index, &file, mode, &progress).await {
                        Ok(output) => {
                            debug!(file = %file.name, index, bytes = output.len(), "file done");
                            ProcessedFile::success(file, output)
                        }
                        Err(e) => {
                            warn!(file = %file.name, index, error = %e, "file failed");
                            ProcessedFile::failure(file, e)
                        }
                    };
                store(&slots, index, record);
                progress.file_done(index);
                let _ = done_tx.send(());
            });
        }

        // A dropped sender means the task panicked; its slot is filled below
        futures::future::join_all(settled).await;
        progress.finish();

        let collected = std::mem::take(&mut *slots.lock().unwrap_or_else(PoisonError::into_inner));
        let results: Vec<ProcessedFile> = collected
            .into_iter()
            .zip(files)
            .map(|(slot, file)| {
                slot.unwrap_or_else(|| ProcessedFile::failure(file, "processing task aborted"))
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            files = total,
            succeeded,
            failed = total - succeeded,
            %mode,
            "batch finished"
        );
        Ok(results)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// Validate, read and transform one file inside its queue slot.
async fn process_one(
    scheduler: &ChunkScheduler,
    config: &EngineConfig,
    index: usize,
    file: &InputFile,
    mode: Mode,
    progress: &BatchProgress,
) -> Result<Vec<u8>, FileError> {
    validate_file(file, config)?;

    let data = file.read().await.map_err(|source| FileError::Read {
        file: file.name.clone(),
        source,
    })?;
    // The cap was checked against the size known at submission; hold it
    // against what was actually read too.
    let len = data.len() as u64;
    if len > config.max_file_size {
        return Err(ValidationError::TooLarge {
            name: file.name.clone(),
            size: len,
            limit: config.max_file_size,
        }
        .into());
    }

    scheduler
        .process(index, &file.name, data, mode, |completed, total| {
            progress.chunk_done(index, completed, total)
        })
        .await
}

fn store(slots: &ResultSlots, index: usize, record: ProcessedFile) {
    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(slot) = slots.get_mut(index) {
        debug_assert!(slot.is_none(), "result slot {index} written twice");
        *slot = Some(record);
    }
}
