//! SyncEngine implementation
//!
//! Applies plan entries to the working tree in waves of equal nesting
//! depth. Entries within a wave never contain one another, so they run on
//! the worker pool concurrently; a wave starts only after the previous one
//! has finished and recorded its state, which orders `lib` before `lib/sub`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use depsync_fs::RelativePath;
use depsync_vcs::{AdapterSet, VersionControl};
use rayon::prelude::*;

use super::cancel::CancellationToken;
use super::report::{Outcome, SkipReason, SyncResult};
use crate::Result;
use crate::pool::{lock, worker_pool};
use crate::resolve::ResolvedDependency;
use crate::state::{StateRecord, StateStore};

/// Options for one [`SyncEngine::apply`] call
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Run VCS operations even when the state says the node is current
    pub force: bool,
    /// Concurrent nodes per wave
    pub jobs: usize,
    pub cancel: CancellationToken,
    /// Paths that did not sync earlier; entries nested under them are skipped
    pub blocked: BTreeSet<RelativePath>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            force: false,
            jobs: 1,
            cancel: CancellationToken::new(),
            blocked: BTreeSet::new(),
        }
    }
}

/// Result of converging one checkout.
struct Converged {
    outcome: Outcome,
    previous: Option<String>,
    current: String,
    /// Whether the state record must be rewritten
    record: bool,
}

/// Drives plan entries to the working tree through the adapters.
pub struct SyncEngine {
    root: PathBuf,
    adapters: AdapterSet,
}

impl SyncEngine {
    pub fn new(root: impl Into<PathBuf>, adapters: AdapterSet) -> Self {
        Self {
            root: root.into(),
            adapters,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply `entries` and return one result per entry, in entry order.
    ///
    /// Node failures are isolated into their results; the only errors
    /// returned are those preventing the run from starting.
    pub fn apply(
        &self,
        entries: &[ResolvedDependency],
        state: &mut StateStore,
        options: &ApplyOptions,
    ) -> Result<Vec<SyncResult>> {
        let pool = worker_pool(options.jobs)?;
        let state = Mutex::new(state);

        let mut waves: BTreeMap<usize, Vec<&ResolvedDependency>> = BTreeMap::new();
        for entry in entries {
            waves.entry(entry.path.depth()).or_default().push(entry);
        }

        let mut blocked = options.blocked.clone();
        let mut results: BTreeMap<RelativePath, SyncResult> = BTreeMap::new();

        for (depth, wave) in waves {
            let mut runnable = Vec::with_capacity(wave.len());
            for entry in wave {
                if let Some(skip) = pre_check(entry, &blocked, &options.cancel) {
                    blocked.insert(entry.path.clone());
                    results.insert(entry.path.clone(), skip);
                } else {
                    runnable.push(entry);
                }
            }

            tracing::debug!(depth, nodes = runnable.len(), "Applying wave");
            let wave_results: Vec<SyncResult> = pool.install(|| {
                runnable
                    .par_iter()
                    .map(|entry| {
                        if options.cancel.is_cancelled() {
                            return SyncResult::skipped(entry.path.clone(), SkipReason::Cancelled);
                        }
                        self.apply_one(entry, &state, options.force)
                    })
                    .collect()
            });

            for result in wave_results {
                if !result.outcome.is_success() {
                    blocked.insert(result.path.clone());
                }
                results.insert(result.path.clone(), result);
            }
        }

        Ok(entries
            .iter()
            .filter_map(|entry| results.remove(&entry.path))
            .collect())
    }

    fn apply_one(
        &self,
        entry: &ResolvedDependency,
        state: &Mutex<&mut StateStore>,
        force: bool,
    ) -> SyncResult {
        let path = entry.path.clone();
        let adapter_kind = entry.kind.adapter_kind(&entry.locator);
        let Some(adapter) = self.adapters.get(adapter_kind) else {
            return SyncResult::failed(path, format!("no adapter registered for {}", adapter_kind));
        };

        let dest = entry.path.to_native(&self.root);
        let record = lock(state).record_of(&path).cloned();

        match converge(entry, adapter.as_ref(), &dest, record.as_ref(), force) {
            Ok(converged) => {
                if converged.record {
                    let new_record = StateRecord::new(
                        entry.locator.clone(),
                        entry.revision.clone(),
                        converged.current.clone(),
                        entry.kind,
                    );
                    if let Err(e) = lock(state).save(&path, new_record) {
                        tracing::warn!(%path, error = %e, "Failed to record state");
                        return SyncResult::failed(path, format!("recording state: {}", e))
                            .with_revisions(converged.previous, Some(converged.current));
                    }
                }
                tracing::info!(%path, outcome = %converged.outcome, revision = %converged.current, "Synced");
                SyncResult::new(path, converged.outcome)
                    .with_revisions(converged.previous, Some(converged.current))
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "Sync failed");
                SyncResult::failed(path, e.to_string())
                    .with_revisions(record.map(|r| r.revision), None)
            }
        }
    }
}

/// Decide whether `entry` is skipped before any VCS call.
fn pre_check(
    entry: &ResolvedDependency,
    blocked: &BTreeSet<RelativePath>,
    cancel: &CancellationToken,
) -> Option<SyncResult> {
    if cancel.is_cancelled() {
        return Some(SyncResult::skipped(entry.path.clone(), SkipReason::Cancelled));
    }
    if let Some(parent) = blocked.iter().find(|b| b.is_ancestor_of(&entry.path)) {
        tracing::debug!(path = %entry.path, %parent, "Skipping, enclosing node not synced");
        return Some(SyncResult::skipped(
            entry.path.clone(),
            SkipReason::Parent {
                path: parent.clone(),
            },
        ));
    }
    if entry.is_conflicted() {
        return Some(SyncResult::skipped(entry.path.clone(), SkipReason::Conflict));
    }
    None
}

/// Bring the checkout at `dest` to `entry`'s target.
fn converge(
    entry: &ResolvedDependency,
    adapter: &dyn VersionControl,
    dest: &Path,
    record: Option<&StateRecord>,
    force: bool,
) -> depsync_vcs::Result<Converged> {
    let exists = adapter.is_checkout(dest);

    // Targets already recorded need no remote I/O; floating refs move only under force
    if exists
        && !force
        && let Some(record) = record
        && record.matches(&entry.locator, &entry.revision, entry.kind)
    {
        let current = adapter.current_revision(dest)?;
        if current == record.revision && !adapter.has_local_modifications(dest)? {
            tracing::debug!(path = %entry.path, "Unchanged since last sync");
            return Ok(Converged {
                outcome: Outcome::Unchanged,
                previous: Some(current.clone()),
                current,
                record: false,
            });
        }
    }

    let previous = if exists {
        adapter.current_revision(dest).ok()
    } else {
        None
    };

    let mut cloned = false;
    let mut dirty = false;
    if exists {
        let url = adapter.source_url(dest)?;
        if url.as_deref().is_some_and(|u| entry.locator.same_url(u)) {
            dirty = adapter.has_local_modifications(dest)?;
            adapter.fetch(dest)?;
        } else {
            tracing::info!(path = %entry.path, from = ?url, to = %entry.locator, "Source changed, cloning again");
            depsync_fs::io::remove_all(dest)?;
            adapter.clone_source(&entry.locator, &entry.revision, dest)?;
            cloned = true;
        }
    } else {
        if record.is_some() && depsync_fs::io::is_non_empty_dir(dest) {
            tracing::info!(path = %entry.path, "Replacing previously managed directory");
            depsync_fs::io::remove_all(dest)?;
        }
        adapter.clone_source(&entry.locator, &entry.revision, dest)?;
        cloned = true;
    }

    let current = adapter.checkout(dest, &entry.revision)?;
    let outcome = if cloned || dirty || previous.as_deref() != Some(current.as_str()) {
        Outcome::Updated
    } else {
        Outcome::Unchanged
    };

    Ok(Converged {
        outcome,
        previous,
        current,
        record: true,
    })
}
