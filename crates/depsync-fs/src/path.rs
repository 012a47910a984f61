//! Normalized path handling for cross-platform compatibility

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Used for absolute locations on disk (the workspace root, configuration
/// files). Converts to platform-native format only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes and resolves `.` and `..`
    /// segments lexically.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&path_str.replace('\\', "/")),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self {
            inner: clean(&joined),
        }
    }

    /// Resolve a managed-tree path against this root.
    pub fn resolve(&self, relative: &RelativePath) -> Self {
        if relative.is_root() {
            self.clone()
        } else {
            self.join(relative.as_str())
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) if trimmed.len() > 1 => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

/// Lexically resolve `.`/`..` and collapse repeated slashes.
///
/// Leading `..` on relative input is dropped; on absolute input it stops at `/`.
fn clean(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    let body = parts.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

/// A path inside the managed tree, relative to the workspace root.
///
/// Always forward-slash separated with `.` and `..` resolved. The managed
/// root itself is represented as `"."`. Construction fails with
/// [`Error::PathEscape`] when a `..` would climb above the root.
///
/// Ordering compares component-wise, so every path sorts before the paths
/// nested under it (`lib` < `lib/sub` < `lib-extra`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath {
    inner: String,
}

impl RelativePath {
    /// The managed root (`"."`).
    pub fn root() -> Self {
        Self {
            inner: ".".to_string(),
        }
    }

    /// Parse a path declared relative to the managed root.
    pub fn parse(raw: &str) -> Result<Self> {
        Self::root().join(raw)
    }

    /// Resolve `raw` relative to this path.
    ///
    /// Absolute input is rejected; `..` may climb out of `self` but never
    /// out of the managed root.
    pub fn join(&self, raw: &str) -> Result<Self> {
        let unified = raw.trim().replace('\\', "/");
        if unified.is_empty() {
            return Err(Error::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty".into(),
            });
        }
        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return Err(Error::InvalidPath {
                path: raw.to_string(),
                reason: "path must be relative".into(),
            });
        }

        let mut parts: Vec<&str> = self.components().collect();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(Error::PathEscape {
                            path: if self.is_root() {
                                unified.clone()
                            } else {
                                format!("{}/{}", self.inner, unified)
                            },
                        });
                    }
                }
                s => parts.push(s),
            }
        }

        let inner = if parts.is_empty() {
            ".".to_string()
        } else {
            parts.join("/")
        };
        Ok(Self { inner })
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_root(&self) -> bool {
        self.inner == "."
    }

    /// Path components; empty for the root.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|c| !c.is_empty() && *c != ".")
    }

    /// Number of components below the managed root.
    pub fn depth(&self) -> usize {
        self.components().count()
    }

    /// Whether `other` is strictly nested under this path.
    pub fn is_ancestor_of(&self, other: &RelativePath) -> bool {
        if self == other {
            return false;
        }
        if self.is_root() {
            return true;
        }
        other
            .inner
            .strip_prefix(self.inner.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Whether one of the two paths is nested under the other (or they are equal).
    pub fn overlaps(&self, other: &RelativePath) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.inner.rfind('/') {
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => Some(Self::root()),
        }
    }

    /// Platform-native location of this path under `root`.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        self.components()
            .fold(root.to_path_buf(), |acc, component| acc.join(component))
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl Ord for RelativePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(other.components())
    }
}

impl PartialOrd for RelativePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RelativePath> for String {
    fn from(value: RelativePath) -> Self {
        value.inner
    }
}
