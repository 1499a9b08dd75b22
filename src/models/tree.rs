use std::collections::BTreeMap;

use serde::Serialize;

use super::DirectoryEntry;

/// Snapshot of one enumerated directory.
///
/// `children` holds the nested snapshots of directory entries that were
/// descended into, keyed by entry name. It stays empty once the depth
/// budget is spent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct DirectoryNode {
    #[serde(rename = "directory")]
    pub path: String,
    #[serde(rename = "contents")]
    pub entries: Vec<DirectoryEntry>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, DirectoryNode>,
}

impl DirectoryNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&DirectoryNode> {
        self.children.get(name)
    }

    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(DirectoryEntry::name).collect()
    }

    /// Number of directory levels below this node.
    pub fn height(&self) -> usize {
        self.children
            .values()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }
}
