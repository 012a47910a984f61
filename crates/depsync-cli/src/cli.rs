//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use depsync_core::DependencyKind;

/// depsync - Synchronize a tree of repositories from their DEPS manifests
#[derive(Parser, Debug)]
#[command(name = "depsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Converge the managed tree to its manifests
    ///
    /// Examples:
    ///   depsync sync                 # Sync the tree under the current directory
    ///   depsync sync --main          # Also update the Solution checkouts
    ///   depsync sync --dry-run       # Show the plan without touching anything
    Sync(SyncArgs),

    /// Show the resolved sync plan
    ///
    /// Examples:
    ///   depsync plan --kind binary   # Only downloaded artifacts
    ///   depsync plan --stamps        # path: url@revision for every entry
    Plan(PlanArgs),

    /// Show who requests which dependency
    Tree {
        /// Managed root
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Compare checkouts with the last sync
    Check {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,

        /// Managed root
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Forget the recorded sync state
    Clean {
        /// Managed root
        #[arg(default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    /// Run VCS operations even for checkouts recorded as current
    #[arg(short, long)]
    pub force: bool,

    /// Concurrent operations
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Also sync the Solution repositories themselves
    #[arg(long = "main")]
    pub include_solutions: bool,

    /// Show the plan without touching the tree
    #[arg(long)]
    pub dry_run: bool,

    /// Clone git sources without their history
    #[arg(long)]
    pub no_history: bool,

    /// Fail on version conflicts instead of skipping the node
    #[arg(long)]
    pub strict: bool,

    /// Output as JSON for scripting
    #[arg(long)]
    pub json: bool,

    /// Managed root
    #[arg(default_value = ".")]
    pub root: PathBuf,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PlanArgs {
    /// Output as JSON for scripting
    #[arg(long)]
    pub json: bool,

    /// Only entries with this name or path
    #[arg(long)]
    pub name: Option<String>,

    /// Only entries of this kind
    #[arg(long, value_enum)]
    pub kind: Option<KindArg>,

    /// Print `path: url@revision` lines, using the synced revision where known
    #[arg(long, conflicts_with = "json")]
    pub stamps: bool,

    /// Managed root
    #[arg(default_value = ".")]
    pub root: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Source,
    Binary,
}

impl From<KindArg> for DependencyKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Source => DependencyKind::SourceCheckout,
            KindArg::Binary => DependencyKind::OpaqueBinary,
        }
    }
}
