//! Error types for storage operations

use std::fmt;
use std::io;
use std::path::Path;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors reported by backends and the storage facade
#[derive(Debug)]
pub enum FsError {
    /// The backend could not be initialized
    MountFailed { medium: String, reason: String },

    /// Path does not resolve to any entry
    NotFound { path: String },

    /// Path resolves to a file where a directory was required
    NotADirectory { path: String },

    /// Content could not be fully written
    WriteFailed { path: String },

    /// A handle could not be obtained for read or write
    OpenFailed { path: String },

    CreateDirFailed { path: String },

    RemoveFailed { path: String },

    /// Operation not available on the mounted medium
    Unsupported { operation: &'static str, medium: String },

    Io(io::Error),

    Json(serde_json::Error),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MountFailed { medium, reason } => {
                write!(f, "failed to mount {}: {}", medium, reason)
            }
            Self::NotFound { path } => write!(f, "not found: {}", path),
            Self::NotADirectory { path } => write!(f, "not a directory: {}", path),
            Self::WriteFailed { path } => write!(f, "write failed: {}", path),
            Self::OpenFailed { path } => write!(f, "failed to open: {}", path),
            Self::CreateDirFailed { path } => write!(f, "mkdir failed: {}", path),
            Self::RemoveFailed { path } => write!(f, "remove failed: {}", path),
            Self::Unsupported { operation, medium } => {
                write!(f, "{} is not supported on {}", operation, medium)
            }
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::Json(err) => write!(f, "JSON error: {}", err),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for FsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<tokio::task::JoinError> for FsError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Io(io::Error::other(err))
    }
}

// Convenience constructors
impl FsError {
    pub fn mount_failed(medium: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::MountFailed {
            medium: medium.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(path: &Path) -> Self {
        Self::NotFound {
            path: path.display().to_string(),
        }
    }

    pub fn not_a_directory(path: &Path) -> Self {
        Self::NotADirectory {
            path: path.display().to_string(),
        }
    }

    pub fn write_failed(path: &Path) -> Self {
        Self::WriteFailed {
            path: path.display().to_string(),
        }
    }

    pub fn open_failed(path: &Path) -> Self {
        Self::OpenFailed {
            path: path.display().to_string(),
        }
    }

    pub fn create_dir_failed(path: &Path) -> Self {
        Self::CreateDirFailed {
            path: path.display().to_string(),
        }
    }

    pub fn remove_failed(path: &Path) -> Self {
        Self::RemoveFailed {
            path: path.display().to_string(),
        }
    }

    pub fn unsupported(operation: &'static str, medium: impl fmt::Display) -> Self {
        Self::Unsupported {
            operation,
            medium: medium.to_string(),
        }
    }
}
