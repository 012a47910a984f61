//! Error types for depsync-vcs

use std::path::PathBuf;

/// Result type for depsync-vcs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depsync-vcs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] depsync_fs::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Revision '{revision}' not found in {path}")]
    RevisionNotFound { revision: String, path: PathBuf },

    #[error("Remote '{name}' not found in {path}")]
    RemoteNotFound { name: String, path: PathBuf },

    #[error("No checkout at {path}")]
    NotACheckout { path: PathBuf },

    #[error("Destination {path} already exists and is not empty")]
    DestinationOccupied { path: PathBuf },

    #[error("Transfer of {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Digest mismatch for {url}: expected {expected}, got {actual}")]
    DigestMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Archive error for {url}: {message}")]
    Archive { url: String, message: String },

    #[error("Unsupported locator '{url}' for {kind} adapter")]
    UnsupportedLocator { url: String, kind: String },

    #[error("Revision {revision} is not valid for {kind} sources")]
    UnsupportedRevision { revision: String, kind: String },
}
