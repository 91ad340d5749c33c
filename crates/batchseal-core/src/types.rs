use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Content type used when the caller gives no hint.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Where an input file's bytes come from.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// Already in memory (cheap to clone)
    Memory(Bytes),
    /// Read from disk when the file is processed
    Path(PathBuf),
}

/// A caller-owned file queued for processing. The engine only reads it.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub content_type: String,
    size: u64,
    source: ByteSource,
}

impl InputFile {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            content_type: DEFAULT_CONTENT_TYPE.into(),
            source: ByteSource::Memory(data),
        }
    }

    /// Describe a file on disk. Only metadata is read here; the content is
    /// read lazily by [`InputFile::read`].
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            size: meta.len(),
            content_type: DEFAULT_CONTENT_TYPE.into(),
            source: ByteSource::Path(path.to_path_buf()),
        })
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Size in bytes, known before any read: the buffer length for memory
    /// sources, the metadata length for paths. Cap checks rely on it.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &ByteSource {
        &self.source
    }

    /// Load the file's bytes.
    ///
    /// Fails with `InvalidData` if a path source no longer has the length it
    /// had when it was described, so size caps checked earlier still hold.
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            ByteSource::Memory(data) => Ok(data.clone()),
            ByteSource::Path(path) => {
                let data = tokio::fs::read(path).await?;
                if data.len() as u64 != self.size {
                    tracing::debug!(
                        path = %path.display(),
                        expected = self.size,
                        actual = data.len(),
                        "file size changed since it was queued"
                    );
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "file size changed since it was queued: expected {} bytes, read {}",
                            self.size,
                            data.len()
                        ),
                    ));
                }
                Ok(Bytes::from(data))
            }
        }
    }
}

/// Outcome of processing one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Success,
    Error,
}

/// One result per input file, at the input's index.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub original: InputFile,
    pub output: Option<Bytes>,
    pub error: Option<String>,
    pub status: FileStatus,
}

impl ProcessedFile {
    pub fn success(original: InputFile, output: impl Into<Bytes>) -> Self {
        Self {
            original,
            output: Some(output.into()),
            error: None,
            status: FileStatus::Success,
        }
    }

    pub fn failure(original: InputFile, error: impl ToString) -> Self {
        Self {
            original,
            output: None,
            error: Some(error.to_string()),
            status: FileStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }

    /// Output blob name; processed files keep the original name.
    pub fn name(&self) -> &str {
        &self.original.name
    }

    pub fn content_type(&self) -> &str {
        &self.original.content_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_sets_size() {
        let file = InputFile::from_bytes("notes.txt", b"twelve bytes".to_vec());
        assert_eq!(file.size(), 12);
        assert_eq!(file.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_from_path_reads_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let f = std::fs::File::create(&path).unwrap();
        // Sparse: no bytes are written, only the length
        f.set_len(3 * 1024 * 1024).unwrap();

        let file = InputFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "big.bin");
        assert_eq!(file.size(), 3 * 1024 * 1024);
        assert!(matches!(file.source(), ByteSource::Path(_)));
    }

    #[tokio::test]
    async fn test_read_path_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello").unwrap();

        let file = InputFile::from_path(&path)
            .await
            .unwrap()
            .with_content_type("text/plain");
        assert_eq!(&file.read().await.unwrap()[..], b"hello");
        assert_eq!(file.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_read_rejects_file_that_grew() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growing.log");
        std::fs::write(&path, b"short").unwrap();

        let file = InputFile::from_path(&path).await.unwrap();
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        let err = file.read().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("expected 5 bytes, read 4096"));
    }

    #[test]
    fn test_processed_file_keeps_name_and_type() {
        let file = InputFile::from_bytes("a.png", vec![1, 2, 3]).with_content_type("image/png");
        let ok = ProcessedFile::success(file.clone(), vec![9, 9]);
        let err = ProcessedFile::failure(file, "boom");

        assert!(ok.is_success());
        assert_eq!(ok.name(), "a.png");
        assert_eq!(ok.content_type(), "image/png");
        assert_eq!(err.status, FileStatus::Error);
        assert_eq!(err.error.as_deref(), Some("boom"));
        assert!(err.output.is_none());
    }
}
