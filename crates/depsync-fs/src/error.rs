//! Error types for depsync-fs

use std::path::PathBuf;

/// Result type for depsync-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depsync-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A declared path resolves outside of the managed tree
    #[error("Path '{path}' escapes the managed root")]
    PathEscape { path: String },

    /// A declared path is absolute or otherwise unusable as a tree key
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

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
