//! The capability interface every VCS backend implements.

use std::path::Path;

use crate::{Result, RevisionSpec, SourceLocator, VcsKind};

/// Repository operations for one VCS kind.
///
/// Operations never fail for "nothing to do": fetching an up-to-date
/// checkout or checking out the current revision succeeds silently.
pub trait VersionControl: Send + Sync {
    /// The kind of locator this adapter serves.
    fn kind(&self) -> VcsKind;

    /// Materialize `locator` at `dest`, aiming at `revision`. `dest` must be
    /// absent or empty.
    ///
    /// Content that can be verified against `revision` (archive digests) is
    /// checked before anything is moved into `dest`.
    fn clone_source(&self, locator: &SourceLocator, revision: &RevisionSpec, dest: &Path) -> Result<()>;

    /// Bring remote state into an existing checkout without touching the working tree.
    fn fetch(&self, dest: &Path) -> Result<()>;

    /// Move the working tree at `dest` to `revision`, returning the resolved revision id.
    fn checkout(&self, dest: &Path, revision: &RevisionSpec) -> Result<String>;

    /// The revision id currently materialized at `dest`.
    fn current_revision(&self, dest: &Path) -> Result<String>;

    /// Whether the working tree at `dest` differs from its checked-out revision.
    fn has_local_modifications(&self, dest: &Path) -> Result<bool>;

    /// Whether `dest` holds a checkout managed by this adapter.
    fn is_checkout(&self, dest: &Path) -> bool;

    /// The source URL the checkout at `dest` was materialized from.
    fn source_url(&self, dest: &Path) -> Result<Option<String>>;
}
