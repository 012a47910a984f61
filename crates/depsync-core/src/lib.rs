//! Dependency graph resolution and synchronization engine for depsync
//!
//! This crate turns a set of configured Solutions into a working tree of
//! pinned checkouts:
//!
//! - **Configuration resolution**: Layered merge of global, workspace, local and environment settings
//! - **Graph building**: Breadth-first discovery of manifests, cycle and escape detection
//! - **Resolution**: Deterministic reduction of competing requests to one target per path
//! - **SyncEngine**: Parent-before-child application through the VCS adapters
//! - **Synchronizer**: Fixed-point driver re-reading manifests of fresh checkouts
//!
//! # Architecture
//!
//! ```text
//!                      depsync-cli
//!                           |
//!                     depsync-core
//!                           |
//!                 +---------+---------+
//!                 |                   |
//!            depsync-fs          depsync-vcs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use depsync_core::{Synchronizer, SyncOptions};
//! use depsync_fs::NormalizedPath;
//!
//! fn example() -> depsync_core::Result<()> {
//!     let synchronizer = Synchronizer::open(NormalizedPath::new("/work"))?;
//!     let report = synchronizer.sync(&SyncOptions::default())?;
//!     println!("{}", report.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod model;
pub mod resolve;
pub mod state;
pub mod sync;

mod pool;

pub use config::{ConfigResolver, Rewrites, SyncSettings, WorkspaceConfig};
pub use error::{Error, Result};
pub use graph::{DependencyGraphBuilder, Graph, GraphNode, render_tree};
pub use manifest::{DeclaredDependency, ManifestSource, TomlManifestSource, parse_manifest};
pub use model::{DependencyKind, DependencyRequest, Diagnostic, DiagnosticKind, Solution};
pub use resolve::{ResolutionStatus, ResolvedDependency, Resolver, SyncPlan};
pub use state::{STATE_VERSION, StateRecord, StateStore};
pub use sync::{
    ApplyOptions, CancellationToken, CheckReport, CheckStatus, DriftItem, DriftKind, Outcome,
    PlanOutcome, SkipReason, SummaryStatus, SyncEngine, SyncOptions, SyncReport, SyncResult,
    Synchronizer,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_config_not_found_displays_correctly() {
        let path = PathBuf::from("/path/to/.depsync/config.toml");
        let error = Error::ConfigNotFound { path };

        let display = format!("{}", error);
        assert!(
            display.contains("/path/to/.depsync/config.toml"),
            "Error display should contain the path, got: {}",
            display
        );
    }

    #[test]
    fn fixed_point_error_names_the_budget() {
        let display = Error::FixedPointNotReached { passes: 8 }.to_string();
        assert!(display.contains('8'), "got: {}", display);
    }
}
