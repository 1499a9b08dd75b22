use async_trait::async_trait;
use std::fs::{self, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task;

use crate::error::{FsError, Result};
use crate::models::{EntryKind, FsEntry};

use super::{FileSystem, WriteMode};

/// Backend that maps device paths onto a directory of the host filesystem.
#[derive(Clone, Debug)]
pub struct HostFileSystem {
    root: PathBuf,
}

impl HostFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a device path under the root. `..` never climbs above the root.
    fn resolve(&self, path: &Path) -> PathBuf {
        let mut relative = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::ParentDir => {
                    relative.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        self.root.join(relative)
    }
}

fn unix_seconds(time: io::Result<SystemTime>) -> i64 {
    match time {
        Ok(time) => match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        },
        Err(_) => 0,
    }
}

/// Follows symlinks; a dangling link is reported as a file.
fn entry_metadata(host_path: &Path) -> io::Result<Metadata> {
    fs::metadata(host_path).or_else(|_| fs::symlink_metadata(host_path))
}

fn to_entry(device_path: PathBuf, name: String, metadata: &Metadata) -> FsEntry {
    let kind = if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    FsEntry {
        path: device_path,
        name,
        kind,
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified: unix_seconds(metadata.modified()),
    }
}

/// Any failure to open the target itself means it does not resolve.
fn unresolved(err: io::Error, path: &Path) -> FsError {
    log::debug!("cannot open {}: {}", path.display(), err);
    FsError::not_found(path)
}

fn tree_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)?.filter_map(|e| e.ok()) {
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if metadata.is_dir() {
            total += tree_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}

#[async_trait]
impl FileSystem for HostFileSystem {
    async fn stat(&self, path: &Path) -> Result<FsEntry> {
        let device_path = path.to_path_buf();
        let host_path = self.resolve(path);
        task::spawn_blocking(move || {
            let metadata =
                entry_metadata(&host_path).map_err(|err| unresolved(err, &device_path))?;
            let name = device_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "/".to_owned());
            Ok(to_entry(device_path, name, &metadata))
        })
        .await?
    }

    async fn read_dir(&self, dir: &Path) -> Result<Vec<FsEntry>> {
        let device_dir = dir.to_path_buf();
        let host_dir = self.resolve(dir);
        task::spawn_blocking(move || {
            let metadata =
                entry_metadata(&host_dir).map_err(|err| unresolved(err, &device_dir))?;
            if !metadata.is_dir() {
                return Err(FsError::not_a_directory(&device_dir));
            }

            let mut entries = Vec::new();
            let listing = fs::read_dir(&host_dir).map_err(|err| unresolved(err, &device_dir))?;
            for entry in listing.filter_map(|e| e.ok()) {
                let metadata = match entry_metadata(&entry.path()) {
                    Ok(metadata) => metadata,
                    Err(_) => continue,
                };
                let name = entry.file_name().to_string_lossy().into_owned();
                entries.push(to_entry(device_dir.join(&name), name, &metadata));
            }
            Ok(entries)
        })
        .await?
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let device_path = path.to_path_buf();
        let host_path = self.resolve(path);
        task::spawn_blocking(move || {
            if host_path.is_dir() {
                return Err(FsError::open_failed(&device_path));
            }
            fs::read(&host_path).map_err(|_| FsError::open_failed(&device_path))
        })
        .await?
    }

    async fn write(&self, path: &Path, contents: &[u8], mode: WriteMode) -> Result<()> {
        let device_path = path.to_path_buf();
        let host_path = self.resolve(path);
        let contents = contents.to_vec();
        task::spawn_blocking(move || {
            let mut options = OpenOptions::new();
            options.create(true);
            match mode {
                WriteMode::Truncate => options.write(true).truncate(true),
                WriteMode::Append => options.append(true),
            };

            let mut file = options
                .open(&host_path)
                .map_err(|_| FsError::open_failed(&device_path))?;
            file.write_all(&contents)
                .and_then(|()| file.flush())
                .map_err(|_| FsError::write_failed(&device_path))
        })
        .await?
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::symlink_metadata(self.resolve(path)).await.is_ok()
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir(self.resolve(path))
            .await
            .map_err(|_| FsError::create_dir_failed(path))
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        let host_path = self.resolve(path);
        if host_path == self.root {
            return Err(FsError::remove_failed(path));
        }

        let removed = match tokio::fs::symlink_metadata(&host_path).await {
            Ok(metadata) if metadata.is_dir() => tokio::fs::remove_dir(&host_path).await,
            Ok(_) => tokio::fs::remove_file(&host_path).await,
            Err(err) => Err(err),
        };
        removed.map_err(|_| FsError::remove_failed(path))
    }

    async fn used_bytes(&self) -> Result<u64> {
        let root = self.root.clone();
        Ok(task::spawn_blocking(move || tree_size(&root)).await??)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_keeps_paths_under_root() {
        let fs = HostFileSystem::new("/mnt/flash");
        assert_eq!(fs.resolve(Path::new("/")), PathBuf::from("/mnt/flash"));
        assert_eq!(
            fs.resolve(Path::new("/logs/a.txt")),
            PathBuf::from("/mnt/flash/logs/a.txt")
        );
        assert_eq!(
            fs.resolve(Path::new("/../../etc/passwd")),
            PathBuf::from("/mnt/flash/etc/passwd")
        );
        assert_eq!(
            fs.resolve(Path::new("logs/./old/../b.txt")),
            PathBuf::from("/mnt/flash/logs/b.txt")
        );
    }

    #[tokio::test]
    async fn read_dir_reports_kinds_sizes_and_device_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("old")).unwrap();
        std::fs::write(temp.path().join("a.txt"), b"hello world!").unwrap();

        let fs = HostFileSystem::new(temp.path());
        let mut entries = fs.read_dir(Path::new("/")).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].size, 12);
        assert_eq!(entries[0].path, PathBuf::from("/a.txt"));
        assert!(entries[0].modified > 0);
        assert_eq!(entries[1].name, "old");
        assert_eq!(entries[1].kind, EntryKind::Directory);
        assert_eq!(entries[1].path, PathBuf::from("/old"));
    }

    #[tokio::test]
    async fn read_dir_distinguishes_missing_and_file_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), b"x").unwrap();
        let fs = HostFileSystem::new(temp.path());

        let missing = fs.read_dir(Path::new("/nope")).await.unwrap_err();
        assert!(matches!(missing, FsError::NotFound { .. }));

        let file = fs.read_dir(Path::new("/a.txt")).await.unwrap_err();
        assert!(matches!(file, FsError::NotADirectory { .. }));

        let under_file = fs.read_dir(Path::new("/a.txt/x")).await.unwrap_err();
        assert!(matches!(under_file, FsError::NotFound { .. }));

        let stat = fs.stat(Path::new("/a.txt/x")).await.unwrap_err();
        assert!(matches!(stat, FsError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_directory_is_not_found() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let locked = temp.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still list it.
        let listable = std::fs::read_dir(&locked).is_ok();
        let fs = HostFileSystem::new(temp.path());
        let result = fs.read_dir(Path::new("/locked")).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !listable {
            assert!(matches!(result.unwrap_err(), FsError::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn write_requires_existing_parent() {
        let temp = TempDir::new().unwrap();
        let fs = HostFileSystem::new(temp.path());

        let err = fs
            .write(Path::new("/missing/a.txt"), b"x", WriteMode::Truncate)
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::OpenFailed { .. }));
    }

    #[tokio::test]
    async fn append_extends_existing_content() {
        let temp = TempDir::new().unwrap();
        let fs = HostFileSystem::new(temp.path());
        let path = Path::new("/log.txt");

        fs.write(path, b"one\n", WriteMode::Truncate).await.unwrap();
        fs.write(path, b"two\n", WriteMode::Append).await.unwrap();
        assert_eq!(fs.read(path).await.unwrap(), b"one\ntwo\n");

        fs.write(path, b"three\n", WriteMode::Truncate).await.unwrap();
        assert_eq!(fs.read(path).await.unwrap(), b"three\n");
    }

    #[tokio::test]
    async fn read_of_directory_fails_to_open() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("old")).unwrap();
        let fs = HostFileSystem::new(temp.path());

        let err = fs.read(Path::new("/old")).await.unwrap_err();
        assert!(matches!(err, FsError::OpenFailed { .. }));
    }

    #[tokio::test]
    async fn remove_refuses_the_mount_root() {
        let temp = TempDir::new().unwrap();
        let fs = HostFileSystem::new(temp.path());

        assert!(fs.remove(Path::new("/")).await.is_err());
        assert!(temp.path().exists());
    }

    #[tokio::test]
    async fn used_bytes_sums_nested_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("old")).unwrap();
        std::fs::write(temp.path().join("a.txt"), b"12345").unwrap();
        std::fs::write(temp.path().join("old/b.txt"), b"123").unwrap();

        let fs = HostFileSystem::new(temp.path());
        assert_eq!(fs.used_bytes().await.unwrap(), 8);
    }
}
