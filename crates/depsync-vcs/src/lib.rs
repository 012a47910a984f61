//! Version control abstraction for depsync
//!
//! Every VCS kind a manifest can name is served by one implementation of
//! [`VersionControl`]. The sync engine only sees the trait; the concrete
//! adapter is picked from an [`AdapterSet`] by the locator's [`VcsKind`].

pub mod adapter;
pub mod archive;
pub mod error;
pub mod exclude;
pub mod git;
pub mod locator;
pub mod registry;
pub mod revision;

pub use adapter::VersionControl;
pub use archive::ArchiveAdapter;
pub use error::{Error, Result};
pub use git::GitAdapter;
pub use locator::{SourceLocator, VcsKind};
pub use registry::AdapterSet;
pub use revision::{RevisionSpec, is_commit_id};
