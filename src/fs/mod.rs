mod host;
mod memory;

pub use host::HostFileSystem;
pub use memory::MemoryFileSystem;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::models::FsEntry;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteMode {
    Truncate,
    Append,
}

/// A mounted storage backend.
///
/// Paths are absolute device paths (`/logs/a.txt`). Implementations release
/// every handle they open before returning.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Metadata for a single path. Fails with `NotFound` if it does not exist.
    async fn stat(&self, path: &Path) -> Result<FsEntry>;

    /// Immediate children of `dir` in the backend's native order.
    ///
    /// Fails with `NotFound` if `dir` does not exist and `NotADirectory` if it
    /// is a file.
    async fn read_dir(&self, dir: &Path) -> Result<Vec<FsEntry>>;

    /// Full content of a file. Fails with `OpenFailed` for missing paths and
    /// directories.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Writes `contents`, creating the file if needed. The parent directory
    /// must exist.
    async fn write(&self, path: &Path, contents: &[u8], mode: WriteMode) -> Result<()>;

    async fn exists(&self, path: &Path) -> bool;

    /// Creates a single directory. The parent must exist.
    async fn create_dir(&self, path: &Path) -> Result<()>;

    /// Removes a file or an empty directory.
    async fn remove(&self, path: &Path) -> Result<()>;

    /// Bytes held by files on the medium.
    async fn used_bytes(&self) -> Result<u64>;
}
