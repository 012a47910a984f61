//! Error types for depsync-core

use std::path::PathBuf;

/// Result type for depsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depsync-core operations
///
/// Node-scoped problems (cycles, conflicts, failing checkouts) are not
/// errors: they are collected as diagnostics and per-node outcomes. The
/// variants here abort the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file not found at expected path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// A configuration layer is present but unusable
    #[error("Invalid configuration in {source_name}: {message}")]
    InvalidConfig {
        source_name: String,
        message: String,
    },

    /// A manifest could not be parsed
    #[error("Malformed manifest {path}: {message}")]
    MalformedManifest { path: String, message: String },

    /// A manifest names a dependency kind no adapter handles
    #[error("Unsupported dependency kind '{kind}' in {path}")]
    UnsupportedKind { path: String, kind: String },

    /// A Solution is configured outside the managed root
    #[error("Solution '{name}' path '{path}' escapes the managed root")]
    SolutionPathEscape { name: String, path: String },

    /// Recursive discovery did not settle within the pass budget
    #[error("Dependency discovery did not reach a fixed point after {passes} passes")]
    FixedPointNotReached { passes: usize },

    /// A version conflict under strict resolution
    #[error("Version conflict at {path}: {message}")]
    StrictConflict { path: String, message: String },

    /// The state file was written by a newer version
    #[error("State file {path} has unsupported version {found} (supported: {supported})")]
    UnsupportedStateVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    /// Worker pool could not be created
    #[error("Failed to start worker pool: {message}")]
    WorkerPool { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from depsync-fs
    #[error(transparent)]
    Fs(#[from] depsync_fs::Error),

    /// Adapter error from depsync-vcs
    #[error(transparent)]
    Vcs(#[from] depsync_vcs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
