use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{FsError, Result};
use crate::models::{EntryKind, FsEntry};

use super::{FileSystem, WriteMode};

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    /// Child names in creation order.
    Dir(Vec<String>),
}

#[derive(Clone, Debug)]
struct Stored {
    node: Node,
    modified: i64,
}

/// RAM-backed filesystem for hosts without a medium and for tests.
///
/// Directory listings come back in creation order. Besides the
/// [`FileSystem`] operations it exposes a settable clock, injected read and
/// remove failures, and a log of `read_dir` calls, so callers can reproduce
/// a misbehaving card.
#[derive(Clone)]
pub struct MemoryFileSystem {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    nodes: HashMap<PathBuf, Stored>,
    unreadable: Vec<PathBuf>,
    unremovable: Vec<PathBuf>,
    calls: Vec<PathBuf>,
    clock: i64,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            PathBuf::from("/"),
            Stored {
                node: Node::Dir(Vec::new()),
                modified: 0,
            },
        );
        Self {
            inner: Arc::new(Mutex::new(Inner {
                nodes,
                unreadable: Vec::new(),
                unremovable: Vec::new(),
                calls: Vec::new(),
                clock: 0,
            })),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::ParentDir => {
                normalized.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    normalized
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_owned())
}

impl Inner {
    fn entry(&self, path: &Path) -> Option<FsEntry> {
        self.nodes.get(path).map(|stored| {
            let (kind, size) = match &stored.node {
                Node::File(data) => (EntryKind::File, data.len() as u64),
                Node::Dir(_) => (EntryKind::Directory, 0),
            };
            FsEntry {
                path: path.to_path_buf(),
                name: file_name(path),
                kind,
                size,
                modified: stored.modified,
            }
        })
    }

    /// Inserts `node` at `path`, linking it into an existing parent directory.
    fn insert(&mut self, path: PathBuf, node: Node) -> bool {
        let Some(parent) = path.parent().map(Path::to_path_buf) else {
            return false;
        };
        let clock = self.clock;
        match self.nodes.get_mut(&parent) {
            Some(Stored {
                node: Node::Dir(children),
                modified,
            }) => {
                children.push(file_name(&path));
                *modified = clock;
            }
            _ => return false,
        }
        self.nodes.insert(
            path,
            Stored {
                node,
                modified: clock,
            },
        );
        true
    }

    /// Drops `path` and everything below it.
    fn unlink(&mut self, path: &Path) {
        if let Some(Stored {
            node: Node::Dir(children),
            ..
        }) = self.nodes.remove(path)
        {
            for child in children {
                self.unlink(&path.join(child));
            }
        }
        let name = file_name(path);
        if let Some(Stored {
            node: Node::Dir(children),
            ..
        }) = path.parent().and_then(|parent| self.nodes.get_mut(parent))
        {
            children.retain(|child| *child != name);
        }
    }
}

impl MemoryFileSystem {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the modification time stamped on later writes.
    pub fn set_clock(&self, seconds: i64) {
        self.lock().clock = seconds;
    }

    /// Creates a directory and any missing ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut inner = self.lock();
        for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            if !inner.nodes.contains_key(ancestor) {
                inner.insert(ancestor.to_path_buf(), Node::Dir(Vec::new()));
            }
        }
    }

    /// Creates or replaces a file, creating any missing ancestors.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        let mut inner = self.lock();
        inner.unlink(&path);
        inner.insert(path, Node::File(contents.into()));
    }

    /// Makes `read_dir` on `dir` fail as if the medium stopped responding.
    pub fn set_unreadable(&self, dir: impl AsRef<Path>) {
        let dir = normalize(dir.as_ref());
        self.lock().unreadable.push(dir);
    }

    /// Makes `remove` on `path` fail.
    pub fn set_unremovable(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.lock().unremovable.push(path);
    }

    /// Directories passed to `read_dir`, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn stat(&self, path: &Path) -> Result<FsEntry> {
        let inner = self.lock();
        inner
            .entry(&normalize(path))
            .ok_or_else(|| FsError::not_found(path))
    }

    async fn read_dir(&self, dir: &Path) -> Result<Vec<FsEntry>> {
        let dir = normalize(dir);
        let mut inner = self.lock();
        inner.calls.push(dir.clone());

        if inner.unreadable.contains(&dir) {
            return Err(FsError::Io(std::io::Error::other(format!(
                "medium not responding reading {}",
                dir.display()
            ))));
        }

        match inner.nodes.get(&dir).map(|stored| &stored.node) {
            Some(Node::Dir(children)) => Ok(children
                .iter()
                .filter_map(|name| inner.entry(&dir.join(name)))
                .collect()),
            Some(Node::File(_)) => Err(FsError::not_a_directory(&dir)),
            None => Err(FsError::not_found(&dir)),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let inner = self.lock();
        match inner.nodes.get(&normalize(path)).map(|stored| &stored.node) {
            Some(Node::File(data)) => Ok(data.clone()),
            _ => Err(FsError::open_failed(path)),
        }
    }

    async fn write(&self, path: &Path, contents: &[u8], mode: WriteMode) -> Result<()> {
        let normalized = normalize(path);
        let mut inner = self.lock();
        let clock = inner.clock;

        match inner.nodes.get_mut(&normalized) {
            Some(Stored {
                node: Node::File(data),
                modified,
            }) => {
                if mode == WriteMode::Truncate {
                    data.clear();
                }
                data.extend_from_slice(contents);
                *modified = clock;
                Ok(())
            }
            Some(_) => Err(FsError::open_failed(path)),
            None => {
                if inner.insert(normalized, Node::File(contents.to_vec())) {
                    Ok(())
                } else {
                    Err(FsError::open_failed(path))
                }
            }
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        self.lock().nodes.contains_key(&normalize(path))
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let normalized = normalize(path);
        let mut inner = self.lock();
        if inner.nodes.contains_key(&normalized) || !inner.insert(normalized, Node::Dir(Vec::new()))
        {
            return Err(FsError::create_dir_failed(path));
        }
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<()> {
        let normalized = normalize(path);
        let mut inner = self.lock();
        if inner.unremovable.contains(&normalized) {
            return Err(FsError::remove_failed(path));
        }
        match inner.nodes.get(&normalized).map(|stored| &stored.node) {
            Some(Node::File(_)) => {}
            Some(Node::Dir(children)) if children.is_empty() && normalized != Path::new("/") => {}
            _ => return Err(FsError::remove_failed(path)),
        }
        inner.unlink(&normalized);
        Ok(())
    }

    async fn used_bytes(&self) -> Result<u64> {
        let inner = self.lock();
        Ok(inner
            .nodes
            .values()
            .map(|stored| match &stored.node {
                Node::File(data) => data.len() as u64,
                Node::Dir(_) => 0,
            })
            .sum())
    }
}
