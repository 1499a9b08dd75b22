use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use serde::{Serialize, Serializer};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    Directory,
    File,
}

/// Raw record a backend reports for one file or directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FsEntry {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub modified: i64,
}

impl FsEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Calendar breakdown of a modification time in a fixed UTC offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Timestamp {
    /// Out-of-range raw values fall back to the epoch.
    pub fn from_raw(seconds: i64, offset: &FixedOffset) -> Self {
        let local = DateTime::<Utc>::from_timestamp(seconds, 0)
            .unwrap_or_default()
            .with_timezone(offset);

        Self {
            year: local.year(),
            month: local.month(),
            day: local.day(),
            hour: local.hour(),
            minute: local.minute(),
            second: local.second(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One immediate child of an enumerated directory.
///
/// `size` is present exactly when the entry is not a directory.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DirectoryEntry {
    name: String,
    #[serde(rename = "isDirectory")]
    is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(rename = "lastWrite")]
    last_modified: Timestamp,
}

impl DirectoryEntry {
    pub fn from_fs_entry(entry: &FsEntry, offset: &FixedOffset) -> Self {
        let is_directory = entry.is_dir();
        Self {
            name: entry.name.clone(),
            is_directory,
            size: (!is_directory).then_some(entry.size),
            last_modified: Timestamp::from_raw(entry.modified, offset),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn last_modified(&self) -> Timestamp {
        self.last_modified
    }
}
