//! Mounted storage and the file operations built on top of it.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde_json::Value;

use crate::config::{Medium, MountConfig, utc};
use crate::core::{json, render, walk};
use crate::error::{FsError, Result};
use crate::fs::{FileSystem, HostFileSystem, WriteMode};
use crate::models::DirectoryNode;

/// One mounted backend plus the settings its operations need.
pub struct Storage<F> {
    fs: F,
    medium: Medium,
    utc_offset: FixedOffset,
    capacity_bytes: u64,
}

impl Storage<HostFileSystem> {
    /// Mounts the host directory described by `config`.
    ///
    /// A flash root that does not exist yet is created when
    /// `format_if_failed` is set. An SD root must already exist.
    pub async fn mount(config: &MountConfig) -> Result<Self> {
        let root = &config.root;
        match tokio::fs::metadata(root).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                log::error!(
                    "{} mount failed: {} is not a directory",
                    config.medium,
                    root.display()
                );
                return Err(FsError::mount_failed(config.medium, "root is not a directory"));
            }
            Err(_) if config.medium == Medium::Flash && config.format_if_failed => {
                if let Err(err) = tokio::fs::create_dir_all(root).await {
                    log::error!("{} format failed at {}: {}", config.medium, root.display(), err);
                    return Err(FsError::mount_failed(config.medium, err.to_string()));
                }
                log::info!("{} formatted at {}", config.medium, root.display());
            }
            Err(err) => {
                log::error!("{} mount failed at {}: {}", config.medium, root.display(), err);
                return Err(FsError::mount_failed(config.medium, err.to_string()));
            }
        }

        log::info!("{} mounted at {}", config.medium, root.display());
        Ok(Self::new(HostFileSystem::new(root.clone()), config.medium)
            .with_utc_offset(config.utc_offset)
            .with_capacity(config.capacity_bytes))
    }
}

impl<F: FileSystem> Storage<F> {
    pub fn new(fs: F, medium: Medium) -> Self {
        Self {
            fs,
            medium,
            utc_offset: utc(),
            capacity_bytes: crate::config::DEFAULT_FLASH_CAPACITY,
        }
    }

    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    pub fn with_capacity(mut self, capacity_bytes: u64) -> Self {
        self.capacity_bytes = capacity_bytes;
        self
    }

    pub fn medium(&self) -> Medium {
        self.medium
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        self.fs.read(path).await.inspect_err(|_| {
            log::warn!("failed to open {} for reading", path.display());
        })
    }

    /// Invalid UTF-8 is replaced rather than rejected.
    pub async fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String> {
        let bytes = self.read_file(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Replaces the content of `path`. With `create`, missing parent
    /// directories are made first.
    pub async fn write_file(
        &self,
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
        create: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        if create {
            if let Some(parent) = path.parent() {
                self.create_dir_all(parent).await?;
            }
        }
        self.write(path, content.as_ref(), WriteMode::Truncate).await
    }

    pub async fn append_file(
        &self,
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
    ) -> Result<()> {
        self.write(path.as_ref(), content.as_ref(), WriteMode::Append)
            .await
    }

    /// Makes sure `dir` exists, then replaces the content of `path`.
    pub async fn write_file_in(
        &self,
        dir: impl AsRef<Path>,
        path: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
    ) -> Result<()> {
        self.create_dir(dir).await?;
        self.write(path.as_ref(), content.as_ref(), WriteMode::Truncate)
            .await
    }

    async fn write(&self, path: &Path, content: &[u8], mode: WriteMode) -> Result<()> {
        self.fs.write(path, content, mode).await.inspect_err(|err| {
            log::warn!("{}", err);
        })
    }

    /// Succeeds when the directory already exists.
    pub async fn create_dir(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.fs.exists(path).await {
            return Ok(());
        }

        match self.fs.create_dir(path).await {
            Ok(()) => {
                log::info!("dir created: {}", path.display());
                Ok(())
            }
            Err(err) => {
                log::warn!("mkdir failed: {}", path.display());
                Err(err)
            }
        }
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut missing: Vec<PathBuf> = Vec::new();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() || self.fs.exists(ancestor).await {
                break;
            }
            missing.push(ancestor.to_path_buf());
        }
        for dir in missing.iter().rev() {
            self.create_dir(dir).await?;
        }
        Ok(())
    }

    /// Removes a file, or every file directly inside a directory.
    ///
    /// Subdirectories and the directory itself are left alone. A missing
    /// path removes nothing. A file that cannot be removed is logged and
    /// skipped. Returns how many files were removed.
    pub async fn remove_files(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let target = match self.fs.stat(path).await {
            Ok(target) => target,
            Err(FsError::NotFound { .. }) => {
                log::debug!("nothing to remove at {}", path.display());
                return Ok(0);
            }
            Err(err) => return Err(err),
        };

        if !target.is_dir() {
            self.remove(path).await?;
            return Ok(1);
        }

        let mut removed = 0;
        for child in self.fs.read_dir(path).await? {
            if !child.is_dir() && self.remove(&child.path).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        self.fs.remove(path).await.inspect_err(|_| {
            log::warn!("failed to remove {}", path.display());
        })
    }

    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.fs.exists(path.as_ref()).await
    }

    /// Snapshot of `dir` down to `max_depth` levels below it.
    pub async fn enumerate(&self, dir: impl AsRef<Path>, max_depth: u32) -> Result<DirectoryNode> {
        let dir = dir.as_ref();
        walk::enumerate(&self.fs, dir, max_depth, &self.utc_offset)
            .await
            .inspect_err(|err| {
                log::warn!("failed to list {}: {}", dir.display(), err);
            })
    }

    pub async fn list_dir_json(&self, dir: impl AsRef<Path>, max_depth: u32) -> Result<Value> {
        let tree = self.enumerate(dir, max_depth).await?;
        json::directory_document(&tree)
    }

    /// Names of the files directly inside `dir`; empty when `dir` cannot be
    /// listed.
    pub async fn list_file_names(&self, dir: impl AsRef<Path>) -> Vec<String> {
        walk::list_file_names(&self.fs, dir.as_ref()).await
    }

    pub async fn list_files_json(&self, dir: impl AsRef<Path>) -> Value {
        json::files_document(&self.list_file_names(dir).await)
    }

    pub async fn count_files(&self, dir: impl AsRef<Path>) -> usize {
        self.list_file_names(dir).await.len()
    }

    pub async fn print_dir<W: Write>(
        &self,
        writer: &mut W,
        dir: impl AsRef<Path>,
        max_depth: u32,
    ) -> Result<()> {
        let tree = self.enumerate(dir, max_depth).await?;
        render::write_tree(writer, &tree)?;
        Ok(())
    }

    fn require_flash(&self, operation: &'static str) -> Result<()> {
        match self.medium {
            Medium::Flash => Ok(()),
            Medium::Sd => Err(FsError::unsupported(operation, self.medium)),
        }
    }

    pub fn total_bytes(&self) -> Result<u64> {
        self.require_flash("total bytes")?;
        Ok(self.capacity_bytes)
    }

    pub async fn used_bytes(&self) -> Result<u64> {
        self.require_flash("used bytes")?;
        self.fs.used_bytes().await
    }

    pub async fn free_bytes(&self) -> Result<u64> {
        self.require_flash("free bytes")?;
        let used = self.used_bytes().await?;
        Ok(self.capacity_bytes.saturating_sub(used))
    }
}
