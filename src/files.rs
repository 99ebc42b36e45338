//! Filesystem access used by the `/files` routes.
//!
//! The router never touches the filesystem directly; it goes through
//! [`FileAccess`], which [`DiskFiles`] implements on top of `tokio::fs`.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

/// Errors returned by a [`FileAccess`] implementation.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    /// Classifies an `io::Error` raised while accessing `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Read/write capability over a directory tree.
///
/// Implementations must be shareable across connection tasks. Concurrent
/// `get` and `put` on the same path are not required to be atomic.
pub trait FileAccess: Send + Sync + 'static {
    /// Reads the whole file at `path`.
    fn get(&self, path: &Path) -> impl Future<Output = Result<Bytes, FileError>> + Send;

    /// Creates or truncates the file at `path` and writes `contents` to it.
    fn put(
        &self,
        path: &Path,
        contents: &[u8],
    ) -> impl Future<Output = Result<(), FileError>> + Send;
}

/// [`FileAccess`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFiles;

impl FileAccess for DiskFiles {
    async fn get(&self, path: &Path) -> Result<Bytes, FileError> {
        tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| FileError::from_io(path, e))
    }

    async fn put(&self, path: &Path, contents: &[u8]) -> Result<(), FileError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| FileError::from_io(path, e))
    }
}
