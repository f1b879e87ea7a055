//! Error types for harness-fs

use std::path::PathBuf;

/// Result type for harness-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in harness-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backing up a file to do nothing with it makes no sense
    #[error("Cannot edit {path} with a read-only mode")]
    InvalidMode { path: PathBuf },

    /// The (context, path) pair already has an active edit session
    #[error("File already backed up in context `{context}`: {path}")]
    AlreadyBackedUp { context: String, path: PathBuf },

    /// Edit scopes are single-use, recursively or otherwise
    #[error("Edit scope for {path} cannot be entered twice")]
    IllegalReuse { path: PathBuf },

    /// No matching entry registered at (context, path)
    #[error("No backup registered for {path} in context `{context}`")]
    NotRegistered { context: String, path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
