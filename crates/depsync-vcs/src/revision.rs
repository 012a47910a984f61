//! Revision specifiers.

use serde::{Deserialize, Serialize};

/// What revision of a source to materialize.
///
/// `Commit` and `Digest` are pinned; everything else floats with the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum RevisionSpec {
    /// Whatever the remote's default branch points at
    #[default]
    Default,
    Branch(String),
    Tag(String),
    /// A full or abbreviated commit id
    Commit(String),
    /// Content digest of an archive (`sha256`)
    Digest(String),
}

impl RevisionSpec {
    /// Fixed revisions cannot move under the same name.
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Commit(_) | Self::Digest(_))
    }
}

impl std::fmt::Display for RevisionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Branch(b) => write!(f, "branch:{}", b),
            Self::Tag(t) => write!(f, "tag:{}", t),
            Self::Commit(c) => write!(f, "commit:{}", c),
            Self::Digest(d) => write!(f, "sha256:{}", d),
        }
    }
}

/// Whether `revision` looks like a hex commit id (6 to 40 digits).
pub fn is_commit_id(revision: &str) -> bool {
    (6..=40).contains(&revision.len()) && revision.chars().all(|c| c.is_ascii_hexdigit())
}
