//! Source locators: which VCS kind, and where.

use serde::{Deserialize, Serialize};

/// The version control backend a locator is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    /// A git repository, checked out as a working copy
    Git,
    /// A downloadable archive or single file, materialized as-is
    Archive,
}

impl VcsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Archive => "archive",
        }
    }
}

impl std::fmt::Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocator {
    pub kind: VcsKind,
    pub url: String,
}

impl SourceLocator {
    pub fn new(kind: VcsKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }

    pub fn git(url: impl Into<String>) -> Self {
        Self::new(VcsKind::Git, url)
    }

    pub fn archive(url: impl Into<String>) -> Self {
        Self::new(VcsKind::Archive, url)
    }

    /// Whether two URLs name the same source, ignoring a trailing `/` or `.git`.
    pub fn same_url(&self, other: &str) -> bool {
        fn strip(url: &str) -> &str {
            let url = url.trim_end_matches('/');
            url.strip_suffix(".git").unwrap_or(url)
        }
        strip(&self.url) == strip(other)
    }
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{}", self.kind, self.url)
    }
}
