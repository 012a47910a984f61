//! Well-known file and directory names.

use std::path::Path;

/// Files and directories depsync reads or writes inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsyncPath {
    /// The `.depsync` directory (configuration and state root)
    ConfigDir,
    /// `config.toml` inside the configuration root
    ConfigFile,
    /// `config.local.toml` inside the configuration root (git-ignored overrides)
    LocalConfigFile,
    /// `state.toml` inside the configuration root
    StateFile,
    /// Default manifest file name of a repository
    DefaultManifest,
    /// Marker written into materialized archive dependencies
    ArchiveMarker,
    /// The `.git` directory
    GitDir,
}

impl DepsyncPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigDir => ".depsync",
            Self::ConfigFile => "config.toml",
            Self::LocalConfigFile => "config.local.toml",
            Self::StateFile => "state.toml",
            Self::DefaultManifest => "DEPS",
            Self::ArchiveMarker => ".depsync-archive",
            Self::GitDir => ".git",
        }
    }
}

impl AsRef<Path> for DepsyncPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for DepsyncPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for DepsyncPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
