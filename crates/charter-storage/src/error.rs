//! Error types for file-backed storage

use charter_identity::SecurityError;
use std::path::PathBuf;

/// Storage collaborator failure
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Requested path failed the containment check
    #[error("security violation: {0}")]
    Security(#[from] SecurityError),

    /// Underlying filesystem error
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Value could not be serialized
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// File content could not be deserialized
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// File does not exist
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Cancellation observed before the step could run
    #[error("operation cancelled")]
    Cancelled,
}

impl StorageError {
    /// Wrap an I/O error with the path it concerns
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this is a path-safety violation
    #[inline]
    #[must_use]
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Check if the file was missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
