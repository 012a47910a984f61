//! Read-only comparison of the working tree against the plan and state

use std::path::Path;

use depsync_vcs::AdapterSet;
use serde::{Deserialize, Serialize};

use crate::resolve::SyncPlan;
use crate::state::StateStore;

/// Overall health of the managed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Healthy,
    /// Planned dependencies that were never synced or are not on disk
    Missing,
    /// Checkouts that differ from what was synced or planned
    Drifted,
}

/// What is wrong at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Planned but never synced
    NotSynced,
    /// Synced once, checkout gone
    MissingCheckout,
    /// The plan asks for a different source or revision than was synced
    PlanChanged,
    /// The checkout moved away from the synced revision
    RevisionDrift,
    LocalModifications,
    /// Recorded in state but no longer planned
    Stale,
}

impl DriftKind {
    fn status(&self) -> CheckStatus {
        match self {
            Self::NotSynced | Self::MissingCheckout => CheckStatus::Missing,
            _ => CheckStatus::Drifted,
        }
    }
}

/// One finding of [`check_tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftItem {
    pub path: String,
    pub kind: DriftKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub items: Vec<DriftItem>,
}

impl CheckReport {
    fn from_items(items: Vec<DriftItem>) -> Self {
        // Drifted outranks Missing
        let status = if items.iter().any(|i| i.kind.status() == CheckStatus::Drifted) {
            CheckStatus::Drifted
        } else if items.is_empty() {
            CheckStatus::Healthy
        } else {
            CheckStatus::Missing
        };
        Self { status, items }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }
}

/// Compare the checkouts under `root` with `plan` and `state` without
/// touching the network or the disk.
pub fn check_tree(root: &Path, plan: &SyncPlan, state: &StateStore, adapters: &AdapterSet) -> CheckReport {
    let mut items = Vec::new();
    let mut push = |path: &str, kind: DriftKind, description: String| {
        items.push(DriftItem {
            path: path.to_string(),
            kind,
            description,
        });
    };

    for entry in plan.entries() {
        let path = entry.path.as_str();
        let record = state.record_of(&entry.path);

        // Solutions are managed by the user unless synced with --main
        if entry.is_solution && record.is_none() {
            continue;
        }
        let Some(record) = record else {
            push(path, DriftKind::NotSynced, format!("{} has never been synced", entry.locator));
            continue;
        };
        let Some(adapter) = adapters.get(entry.kind.adapter_kind(&entry.locator)) else {
            continue;
        };

        let dest = entry.path.to_native(root);
        if !adapter.is_checkout(&dest) {
            push(path, DriftKind::MissingCheckout, "checkout is missing".to_string());
            continue;
        }

        if !record.matches(&entry.locator, &entry.revision, entry.kind) {
            push(
                path,
                DriftKind::PlanChanged,
                format!(
                    "synced {} @ {}, planned {} @ {}",
                    record.locator, record.requested, entry.locator, entry.revision
                ),
            );
        }

        match adapter.current_revision(&dest) {
            Ok(current) if current != record.revision => push(
                path,
                DriftKind::RevisionDrift,
                format!("synced {}, found {}", record.revision, current),
            ),
            Ok(_) => {}
            Err(e) => push(path, DriftKind::RevisionDrift, format!("cannot read revision: {}", e)),
        }

        if adapter.has_local_modifications(&dest).unwrap_or(false) {
            push(path, DriftKind::LocalModifications, "checkout has local modifications".to_string());
        }
    }

    for path in state.records().keys() {
        if plan.get(path).is_none() {
            push(path.as_str(), DriftKind::Stale, "recorded but no longer planned".to_string());
        }
    }

    CheckReport::from_items(items)
}
