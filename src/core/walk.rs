use std::path::Path;

use chrono::FixedOffset;

use crate::error::Result;
use crate::fs::FileSystem;
use crate::models::{DirectoryEntry, DirectoryNode};

/// Enumerate `dir` into a metadata tree.
///
/// `max_depth` is the number of directory levels to descend below `dir`;
/// 0 lists the immediate children only. Entries keep the backend's
/// enumeration order. Fails with `NotFound` or `NotADirectory` when `dir`
/// cannot be listed, and with the first error hit while descending.
pub async fn enumerate<F: FileSystem>(
    fs: &F,
    dir: &Path,
    max_depth: u32,
    offset: &FixedOffset,
) -> Result<DirectoryNode> {
    let children = fs.read_dir(dir).await?;

    let mut node = DirectoryNode::new(dir.to_string_lossy());
    node.entries.reserve(children.len());

    for child in children {
        if child.is_dir() && max_depth > 0 {
            let subtree = Box::pin(enumerate(fs, &child.path, max_depth - 1, offset)).await?;
            node.children.insert(child.name.clone(), subtree);
        }
        node.entries.push(DirectoryEntry::from_fs_entry(&child, offset));
    }

    Ok(node)
}

/// Names of the non-directory children of `dir`.
///
/// Unlike [`enumerate`], a missing or non-directory path yields an empty list.
pub async fn list_file_names<F: FileSystem>(fs: &F, dir: &Path) -> Vec<String> {
    match fs.read_dir(dir).await {
        Ok(children) => children
            .into_iter()
            .filter(|child| !child.is_dir())
            .map(|child| child.name)
            .collect(),
        Err(err) => {
            log::debug!("listing {} as empty: {}", dir.display(), err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;
    use crate::fs::MemoryFileSystem;
    use std::path::PathBuf;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn logs_fixture() -> MemoryFileSystem {
        let fs = MemoryFileSystem::default();
        fs.set_clock(1_714_557_600);
        fs.add_file("/logs/a.txt", "hello world!");
        fs.add_file("/logs/b.txt", "");
        fs.add_file("/logs/old/c.txt", "12345");
        fs
    }

    #[tokio::test]
    async fn depth_one_attaches_the_single_subdirectory() {
        let fs = logs_fixture();
        let tree = enumerate(&fs, Path::new("/logs"), 1, &utc()).await.unwrap();

        assert_eq!(tree.path, "/logs");
        assert_eq!(tree.entry_names(), vec!["a.txt", "b.txt", "old"]);
        assert_eq!(tree.children.len(), 1);

        let old = tree.child("old").unwrap();
        assert_eq!(old.path, "/logs/old");
        assert_eq!(old.entry_names(), vec!["c.txt"]);
        assert_eq!(old.entries[0].size(), Some(5));
        assert!(old.children.is_empty());
    }

    #[tokio::test]
    async fn depth_zero_lists_directories_without_descending() {
        let fs = logs_fixture();
        let tree = enumerate(&fs, Path::new("/logs"), 0, &utc()).await.unwrap();

        assert_eq!(tree.entry_names(), vec!["a.txt", "b.txt", "old"]);
        assert!(tree.children.is_empty());
        assert_eq!(fs.calls(), vec![PathBuf::from("/logs")]);
    }

    #[tokio::test]
    async fn sizes_present_only_for_files() {
        let fs = logs_fixture();
        let tree = enumerate(&fs, Path::new("/logs"), 0, &utc()).await.unwrap();

        for entry in &tree.entries {
            assert_eq!(entry.size().is_some(), !entry.is_directory(), "{}", entry.name());
        }
        assert_eq!(tree.entries[0].size(), Some(12));
        assert_eq!(tree.entries[1].size(), Some(0));
        assert_eq!(tree.entries[2].size(), None);
        assert_eq!(
            tree.entries[0].last_modified().to_string(),
            "2024-05-01 10:00:00"
        );
    }

    #[tokio::test]
    async fn native_order_is_preserved() {
        let fs = MemoryFileSystem::default();
        fs.add_file("/data/zebra.txt", "z");
        fs.add_dir("/data/middle");
        fs.add_file("/data/apple.txt", "a");

        let tree = enumerate(&fs, Path::new("/data"), 0, &utc()).await.unwrap();
        assert_eq!(tree.entry_names(), vec!["zebra.txt", "middle", "apple.txt"]);
    }

    #[tokio::test]
    async fn enumeration_saturates_past_tree_height() {
        let fs = MemoryFileSystem::default();
        fs.add_file("/root/level1/level2/deep.txt", "x");
        fs.add_file("/root/top.txt", "y");

        let two = enumerate(&fs, Path::new("/root"), 2, &utc()).await.unwrap();
        let three = enumerate(&fs, Path::new("/root"), 3, &utc()).await.unwrap();
        let many = enumerate(&fs, Path::new("/root"), 50, &utc()).await.unwrap();

        assert_eq!(two.height(), 2);
        assert_eq!(two, three);
        assert_eq!(three, many);

        let one = enumerate(&fs, Path::new("/root"), 1, &utc()).await.unwrap();
        assert_eq!(one.height(), 1);
        assert!(one.child("level1").unwrap().child("level2").is_none());
        assert_ne!(one, two);
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let fs = logs_fixture();
        let err = enumerate(&fs, Path::new("/nope"), 3, &utc())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn file_path_is_not_a_directory() {
        let fs = logs_fixture();
        let err = enumerate(&fs, Path::new("/logs/a.txt"), 0, &utc())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }

    #[tokio::test]
    async fn empty_directory_has_no_entries() {
        let fs = MemoryFileSystem::default();
        fs.add_dir("/empty");

        let tree = enumerate(&fs, Path::new("/empty"), 4, &utc()).await.unwrap();
        assert!(tree.entries.is_empty());
        assert!(tree.children.is_empty());
    }

    #[tokio::test]
    async fn files_only_directory_has_no_children() {
        let fs = MemoryFileSystem::default();
        fs.add_file("/flat/a", "1");
        fs.add_file("/flat/b", "2");

        let tree = enumerate(&fs, Path::new("/flat"), 4, &utc()).await.unwrap();
        assert_eq!(tree.entries.len(), 2);
        assert!(tree.children.is_empty());
    }

    #[tokio::test]
    async fn nested_failure_aborts_enumeration() {
        let fs = logs_fixture();
        fs.set_unreadable("/logs/old");

        let err = enumerate(&fs, Path::new("/logs"), 1, &utc())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Io(_)));

        // Not descending means the unreadable directory is never opened.
        let tree = enumerate(&fs, Path::new("/logs"), 0, &utc()).await.unwrap();
        assert_eq!(tree.entries.len(), 3);
    }

    #[tokio::test]
    async fn recursion_visits_each_directory_once() {
        let fs = MemoryFileSystem::default();
        fs.add_dir("/r/a/x");
        fs.add_dir("/r/b");

        enumerate(&fs, Path::new("/r"), 5, &utc()).await.unwrap();
        assert_eq!(
            fs.calls(),
            vec![
                PathBuf::from("/r"),
                PathBuf::from("/r/a"),
                PathBuf::from("/r/a/x"),
                PathBuf::from("/r/b"),
            ]
        );
    }

    #[tokio::test]
    async fn list_file_names_skips_directories() {
        let fs = logs_fixture();
        let names = list_file_names(&fs, Path::new("/logs")).await;
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn list_file_names_is_empty_for_unlistable_paths() {
        let fs = logs_fixture();
        fs.add_dir("/empty");

        assert!(list_file_names(&fs, Path::new("/empty")).await.is_empty());
        assert!(list_file_names(&fs, Path::new("/missing")).await.is_empty());
        assert!(list_file_names(&fs, Path::new("/logs/a.txt")).await.is_empty());
    }
}
