//! Chunk scheduler: split a file, transform every chunk concurrently,
//! reassemble by sequence index.
//!
//! All chunks of a file are issued at once onto the blocking pool and
//! collected in whatever order they finish. Outputs land in a slot vector
//! indexed by sequence number and are concatenated only after every chunk
//! has settled, so completion order never leaks into the output bytes.

use std::sync::Arc;

use batchseal_crypto::{ChunkCodec, CryptoError, Mode};
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tracing::{debug, warn};

use crate::error::{ChunkError, FileError};

/// The per-chunk cryptographic step, run on a blocking worker thread.
pub trait ChunkTransform: Send + Sync + 'static {
    fn transform(&self, sequence: usize, data: &[u8], mode: Mode) -> Result<Vec<u8>, CryptoError>;
}

impl ChunkTransform for ChunkCodec {
    fn transform(&self, _sequence: usize, data: &[u8], mode: Mode) -> Result<Vec<u8>, CryptoError> {
        ChunkCodec::transform(self, data, mode)
    }
}

/// An ordered slice of one input file.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub file_index: usize,
    pub sequence: usize,
    pub offset: u64,
    pub data: Bytes,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Split `data` into consecutive chunks of `chunk_len` bytes (last one may be
/// shorter). Empty input yields no chunks. Slices share `data`'s buffer.
pub fn split_chunks(file_index: usize, data: &Bytes, chunk_len: usize) -> Vec<Chunk> {
    let chunk_len = chunk_len.max(1);
    (0..data.len())
        .step_by(chunk_len)
        .enumerate()
        .map(|(sequence, start)| {
            let end = start.saturating_add(chunk_len).min(data.len());
            Chunk {
                file_index,
                sequence,
                offset: start as u64,
                data: data.slice(start..end),
            }
        })
        .collect()
}

/// Number of chunks `split_chunks` produces for `len` bytes.
pub fn chunk_count(len: usize, chunk_len: usize) -> usize {
    len.div_ceil(chunk_len.max(1))
}

#[derive(Clone)]
pub struct ChunkScheduler {
    transform: Arc<dyn ChunkTransform>,
    chunk_size: usize,
}

impl ChunkScheduler {
    /// `chunk_size` is the plaintext chunk size; decrypt mode splits on the
    /// matching encrypted frame length.
    pub fn new(transform: Arc<dyn ChunkTransform>, chunk_size: usize) -> Self {
        Self {
            transform,
            chunk_size,
        }
    }

    /// Transform one whole file.
    ///
    /// `on_chunk_done(completed, total)` fires after every chunk settles,
    /// including failed ones. Any chunk failure fails the file and discards
    /// every partial output.
    pub async fn process<F>(
        &self,
        file_index: usize,
        file_name: &str,
        data: Bytes,
        mode: Mode,
        mut on_chunk_done: F,
    ) -> Result<Vec<u8>, FileError>
    where
        F: FnMut(usize, usize),
    {
        let chunks = split_chunks(file_index, &data, mode.input_chunk_len(self.chunk_size));
        let total = chunks.len();
        debug!(file = file_name, file_index, chunks = total, %mode, "scheduling chunks");

        let mut pending: FuturesUnordered<_> = chunks
            .into_iter()
            .map(|chunk| {
                let transform = Arc::clone(&self.transform);
                let sequence = chunk.sequence;
                tokio::task::spawn_blocking(move || {
                    transform.transform(chunk.sequence, &chunk.data, mode)
                })
                .map(move |joined| (sequence, joined))
            })
            .collect();

        let mut slots: Vec<Option<Vec<u8>>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut completed = 0usize;
        let mut failure: Option<ChunkError> = None;

        while let Some((sequence, joined)) = pending.next().await {
            completed += 1;
            on_chunk_done(completed, total);

            let outcome = match joined {
                Ok(Ok(bytes)) => Ok(bytes),
                Ok(Err(source)) => Err(ChunkError::Crypto { sequence, source }),
                Err(e) => Err(ChunkError::Aborted {
                    sequence,
                    reason: e.to_string(),
                }),
            };

            match outcome {
                Ok(bytes) if failure.is_none() => {
                    if let Some(slot) = slots.get_mut(sequence) {
                        *slot = Some(bytes);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if failure.is_none() {
                        if let ChunkError::Crypto { source, .. } = &e {
                            if !source.is_input_error() {
                                warn!(file = file_name, sequence, error = %source, "chunk cipher fault");
                            }
                        }
                        // Partial output is never returned for a failed file
                        slots.clear();
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(source) = failure {
            return Err(FileError::Processing {
                file: file_name.to_string(),
                source,
            });
        }

        reassemble(slots).map_err(|source| FileError::Processing {
            file: file_name.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for ChunkScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkScheduler")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

/// Concatenate chunk outputs in sequence order.
fn reassemble(slots: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>, ChunkError> {
    let len = slots.iter().flatten().map(Vec::len).sum();
    let mut output = Vec::with_capacity(len);
    for (sequence, slot) in slots.into_iter().enumerate() {
        let bytes = slot.ok_or_else(|| ChunkError::Aborted {
            sequence,
            reason: "chunk output missing".into(),
        })?;
        output.extend_from_slice(&bytes);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchseal_crypto::{SessionKeyManager, FRAME_OVERHEAD};
    use proptest::prelude::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn codec() -> ChunkCodec {
        ChunkCodec::new(SessionKeyManager::new().unwrap().key())
    }

    fn pattern(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
    }

    /// Sleeps longer for earlier chunks so they finish last.
    struct ReverseDelay {
        inner: ChunkCodec,
        total: usize,
        finished: Mutex<Vec<usize>>,
    }

    impl ChunkTransform for ReverseDelay {
        fn transform(&self, sequence: usize, data: &[u8], mode: Mode) -> Result<Vec<u8>, CryptoError> {
            let steps = (self.total - sequence) as u64;
            std::thread::sleep(Duration::from_millis(25 * steps));
            let out = self.inner.transform(data, mode);
            self.finished.lock().unwrap().push(sequence);
            out
        }
    }

    /// Fails the chunk with the given sequence number.
    struct FailAt {
        inner: ChunkCodec,
        sequence: usize,
    }

    impl ChunkTransform for FailAt {
        fn transform(&self, sequence: usize, data: &[u8], mode: Mode) -> Result<Vec<u8>, CryptoError> {
            if sequence == self.sequence {
                return Err(CryptoError::AuthenticationFailure);
            }
            self.inner.transform(data, mode)
        }
    }

    #[test]
    fn five_mib_splits_into_three_chunks() {
        let mib = 1024 * 1024;
        let data = Bytes::from(vec![0u8; 5 * mib]);
        let chunks = split_chunks(0, &data, 2 * mib);

        let lens: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(lens, vec![2 * mib, 2 * mib, mib]);
        assert_eq!(chunks[2].offset, 4 * mib as u64);
        assert_eq!(chunk_count(5 * mib, 2 * mib), 3);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_chunks(0, &Bytes::new(), 16).is_empty());
        assert_eq!(chunk_count(0, 16), 0);
    }

    #[tokio::test]
    async fn empty_file_produces_empty_output() {
        let scheduler = ChunkScheduler::new(Arc::new(codec()), 16);
        let mut calls = 0;
        let out = scheduler
            .process(0, "empty.txt", Bytes::new(), Mode::Encrypt, |_, _| calls += 1)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_restores_bytes() {
        let scheduler = ChunkScheduler::new(Arc::new(codec()), 64);
        let data = pattern(1000);

        let encrypted = scheduler
            .process(0, "a.bin", data.clone(), Mode::Encrypt, |_, _| {})
            .await
            .unwrap();
        // 16 chunks (15 full + 40-byte tail), each framed
        assert_eq!(encrypted.len(), 1000 + 16 * FRAME_OVERHEAD);

        let decrypted = scheduler
            .process(0, "a.bin", encrypted.into(), Mode::Decrypt, |_, _| {})
            .await
            .unwrap();
        assert_eq!(decrypted, data);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reassembly_ignores_completion_order() {
        let codec = codec();
        let chunk_size = 32;
        let data = pattern(chunk_size * 6);
        let total = chunk_count(data.len(), chunk_size);

        let slow = Arc::new(ReverseDelay {
            inner: codec.clone(),
            total,
            finished: Mutex::new(Vec::new()),
        });
        let scheduler = ChunkScheduler::new(slow.clone(), chunk_size);
        let encrypted = scheduler
            .process(0, "ordered.bin", data.clone(), Mode::Encrypt, |_, _| {})
            .await
            .unwrap();

        let finished = slow.finished.lock().unwrap().clone();
        assert_eq!(finished.len(), total);
        assert_ne!(finished, (0..total).collect::<Vec<_>>(), "chunks must finish out of order");

        // Each frame decrypts to the chunk at the same position
        let frames = split_chunks(0, &Bytes::from(encrypted), chunk_size + FRAME_OVERHEAD);
        let mut expected = Vec::new();
        for frame in &frames {
            expected.extend(codec.transform(&frame.data, Mode::Decrypt).unwrap());
        }
        assert_eq!(expected, data);
    }

    #[tokio::test]
    async fn progress_fires_once_per_chunk() {
        let scheduler = ChunkScheduler::new(Arc::new(codec()), 10);
        let mut seen = Vec::new();
        scheduler
            .process(0, "p.bin", pattern(95), Mode::Encrypt, |done, total| {
                seen.push((done, total))
            })
            .await
            .unwrap();
        assert_eq!(seen, (1..=10).map(|i| (i, 10)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn one_failed_chunk_fails_the_file() {
        let failing = FailAt {
            inner: codec(),
            sequence: 2,
        };
        let scheduler = ChunkScheduler::new(Arc::new(failing), 8);
        let mut calls = 0;
        let err = scheduler
            .process(3, "broken.bin", pattern(40), Mode::Encrypt, |_, _| calls += 1)
            .await
            .unwrap_err();

        assert_eq!(calls, 5, "every chunk settles before the file fails");
        match err {
            FileError::Processing { file, source } => {
                assert_eq!(file, "broken.bin");
                assert!(matches!(
                    source,
                    ChunkError::Crypto {
                        sequence: 2,
                        source: CryptoError::AuthenticationFailure
                    }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn short_trailing_frame_is_malformed() {
        let scheduler = ChunkScheduler::new(Arc::new(codec()), 16);
        let err = scheduler
            .process(0, "t.bin", Bytes::from(vec![0u8; 10]), Mode::Decrypt, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FileError::Processing {
                source: ChunkError::Crypto {
                    source: CryptoError::MalformedInput { .. },
                    ..
                },
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn chunks_cover_full_input(len in 0usize..4096, chunk_len in 1usize..512) {
            let data = pattern(len);
            let chunks = split_chunks(7, &data, chunk_len);
            prop_assert_eq!(chunks.len(), chunk_count(len, chunk_len));

            let mut expected_offset = 0u64;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.sequence, i);
                prop_assert_eq!(chunk.file_index, 7);
                prop_assert_eq!(chunk.offset, expected_offset, "chunks must be contiguous");
                prop_assert!(chunk.len() <= chunk_len && !chunk.is_empty());
                expected_offset += chunk.len() as u64;
            }
            prop_assert_eq!(expected_offset as usize, len);
        }
    }
}
