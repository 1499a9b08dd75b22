mod entry;
mod tree;

pub use entry::{DirectoryEntry, EntryKind, FsEntry, Timestamp};
pub use tree::DirectoryNode;
