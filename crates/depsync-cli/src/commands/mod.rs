//! Command implementations for depsync-cli

pub mod check;
pub mod plan;
pub mod sync;

use std::path::Path;

use depsync_core::Synchronizer;
use depsync_fs::NormalizedPath;

use crate::error::Result;

pub use check::{run_check, run_clean};
pub use plan::{run_plan, run_tree};
pub use sync::run_sync;

/// Resolve the configuration of the managed root at `path`.
fn open(path: &Path) -> Result<Synchronizer> {
    let root = NormalizedPath::new(std::path::absolute(path)?);
    tracing::debug!(%root, "Opening managed root");
    Ok(Synchronizer::open(root)?)
}
