//! Fixed-point synchronization driver
//!
//! Newly cloned checkouts may carry manifests that add dependencies, so a
//! sync alternates graph builds and applies until a build yields nothing
//! new to apply:
//!
//! 1. Build the graph from the Solutions and resolve it to a plan.
//! 2. Select entries whose target differs from what earlier passes applied,
//!    together with the entries nested under them.
//! 3. Empty selection: done. Otherwise apply it and start the next pass.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use depsync_fs::{NormalizedPath, RelativePath};
use depsync_vcs::{AdapterSet, RevisionSpec, SourceLocator};

use super::cancel::CancellationToken;
use super::check::{CheckReport, check_tree};
use super::engine::{ApplyOptions, SyncEngine};
use super::report::{Outcome, SyncReport, SyncResult};
use crate::config::{ConfigResolver, SyncSettings, WorkspaceConfig};
use crate::graph::{DependencyGraphBuilder, Graph};
use crate::manifest::{ManifestSource, TomlManifestSource};
use crate::model::{DependencyKind, Diagnostic, DiagnosticKind};
use crate::resolve::{ResolvedDependency, Resolver, SyncPlan};
use crate::state::StateStore;
use crate::{Error, Result};

/// Per-run overrides of the configured [`SyncSettings`].
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub force: Option<bool>,
    pub jobs: Option<usize>,
    pub max_passes: Option<usize>,
    /// Also sync Solutions whose checkouts already exist
    pub include_solutions: bool,
    pub shallow: Option<bool>,
    pub strict: Option<bool>,
    /// Build and resolve once without touching the tree
    pub dry_run: bool,
    pub cancel: CancellationToken,
}

/// A graph together with the plan and diagnostics derived from it.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub graph: Graph,
    pub plan: SyncPlan,
    pub diagnostics: Vec<Diagnostic>,
}

type Target = (SourceLocator, RevisionSpec, DependencyKind);

fn target_of(entry: &ResolvedDependency) -> Target {
    (entry.locator.clone(), entry.revision.clone(), entry.kind)
}

/// Entry point tying configuration, discovery, resolution and apply together.
pub struct Synchronizer {
    config: WorkspaceConfig,
    /// `None` selects the standard adapters per run settings
    adapters: Option<AdapterSet>,
    manifests: Arc<dyn ManifestSource>,
}

impl Synchronizer {
    /// A synchronizer using the standard adapters and TOML manifests.
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config,
            adapters: None,
            manifests: Arc::new(TomlManifestSource),
        }
    }

    /// Resolve the configuration of `root` and create a synchronizer for it.
    pub fn open(root: NormalizedPath) -> Result<Self> {
        Ok(Self::new(ConfigResolver::new(root).resolve()?))
    }

    pub fn with_adapters(mut self, adapters: AdapterSet) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn with_manifest_source(mut self, source: Arc<dyn ManifestSource>) -> Self {
        self.manifests = source;
        self
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Build and resolve the graph from the current tree.
    pub fn plan(&self) -> Result<PlanOutcome> {
        self.plan_with(&self.config.sync)
    }

    fn plan_with(&self, settings: &SyncSettings) -> Result<PlanOutcome> {
        let root = self.config.root.to_native();
        let (graph, mut diagnostics) = DependencyGraphBuilder::new(&root, self.manifests.as_ref())
            .recursive(settings.recursive)
            .rewrites(self.config.rewrites.clone())
            .jobs(settings.jobs)
            .build(&self.config.solutions)?;
        let (plan, conflicts) = Resolver::new().resolve(&graph);
        diagnostics.extend(conflicts);
        diagnostics.sort();
        Ok(PlanOutcome {
            graph,
            plan,
            diagnostics,
        })
    }

    fn effective_settings(&self, options: &SyncOptions) -> Result<SyncSettings> {
        let mut settings = self.config.sync.clone();
        if let Some(force) = options.force {
            settings.force = force;
        }
        if let Some(jobs) = options.jobs {
            settings.jobs = jobs;
        }
        if let Some(max_passes) = options.max_passes {
            settings.max_passes = max_passes;
        }
        if let Some(shallow) = options.shallow {
            settings.shallow = shallow;
        }
        if let Some(strict) = options.strict {
            settings.strict = strict;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Sync the tree to a fixed point.
    ///
    /// At most `max_passes` passes apply changes; one more build must then
    /// find nothing left to apply.
    ///
    /// # Errors
    ///
    /// Node failures are reported in the returned [`SyncReport`]. Errors are
    /// returned for configuration problems, state I/O, version conflicts under
    /// `strict` ([`Error::StrictConflict`]), and when the plan keeps changing
    /// after `max_passes` passes ([`Error::FixedPointNotReached`]).
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncReport> {
        let settings = self.effective_settings(options)?;

        if options.dry_run {
            let outcome = self.plan_with(&settings)?;
            if settings.strict {
                ensure_no_conflicts(&outcome)?;
            }
            tracing::info!(entries = outcome.plan.len(), "Dry run, tree left untouched");
            let mut report = SyncReport::new(Vec::new(), outcome.diagnostics, 0);
            report.dry_run = true;
            return Ok(report);
        }

        let mut state = StateStore::load(self.config.state_path())?;
        let engine = SyncEngine::new(self.config.root.to_native(), self.adapters_for(&settings));

        let mut applied: BTreeMap<RelativePath, Target> = BTreeMap::new();
        let mut results: BTreeMap<RelativePath, SyncResult> = BTreeMap::new();
        let mut blocked: BTreeSet<RelativePath> = BTreeSet::new();
        let mut last: Option<PlanOutcome> = None;
        let mut settled = false;
        let mut passes = 0;

        loop {
            if options.cancel.is_cancelled() {
                tracing::info!("Sync cancelled");
                break;
            }

            let outcome = self.plan_with(&settings)?;
            if settings.strict {
                ensure_no_conflicts(&outcome)?;
            }
            let changed = changed_entries(&outcome.plan, &applied);

            if changed.is_empty() {
                tracing::debug!(passes, "Plan settled");
                settled = true;
                last = Some(outcome);
                break;
            }
            if passes == settings.max_passes {
                last = Some(outcome);
                break;
            }
            passes += 1;

            let batch: Vec<ResolvedDependency> = changed
                .iter()
                .filter(|e| self.should_apply(e, options.include_solutions))
                .map(|e| (*e).clone())
                .collect();
            for entry in &changed {
                applied.insert(entry.path.clone(), target_of(entry));
            }

            tracing::info!(pass = passes, nodes = batch.len(), "Applying plan");
            let apply = ApplyOptions {
                force: settings.force,
                jobs: settings.jobs,
                cancel: options.cancel.clone(),
                blocked: blocked.clone(),
            };
            for result in engine.apply(&batch, &mut state, &apply)? {
                if result.outcome.is_success() {
                    blocked.remove(&result.path);
                } else {
                    blocked.insert(result.path.clone());
                }
                // A re-applied node that was already updated stays reported as updated
                let keep_earlier = matches!(result.outcome, Outcome::Unchanged)
                    && results.get(&result.path).is_some_and(|r| r.outcome.is_success());
                if !keep_earlier {
                    results.insert(result.path.clone(), result);
                }
            }
            last = Some(outcome);
        }

        if !settled && !options.cancel.is_cancelled() {
            return Err(Error::FixedPointNotReached { passes });
        }

        let (plan, diagnostics) = match last {
            Some(outcome) => (outcome.plan, outcome.diagnostics),
            None => (SyncPlan::default(), Vec::new()),
        };

        if settings.ignore_in_git {
            self.exclude_from_solutions(&results);
        }

        // Plan order first, then paths that dropped out of the plan
        let mut ordered: Vec<SyncResult> = plan
            .entries()
            .iter()
            .filter_map(|e| results.remove(&e.path))
            .collect();
        ordered.extend(results.into_values());

        let report = SyncReport::new(ordered, diagnostics, passes);
        tracing::info!(status = %report.status, passes, results = report.results.len(), "Sync finished");
        Ok(report)
    }

    /// The injected adapters, or the standard set configured by `settings`.
    fn adapters_for(&self, settings: &SyncSettings) -> AdapterSet {
        self.adapters
            .clone()
            .unwrap_or_else(|| AdapterSet::standard_with(settings.shallow))
    }

    /// Solutions are left to the user once materialized, unless requested.
    fn should_apply(&self, entry: &ResolvedDependency, include_solutions: bool) -> bool {
        if !entry.is_solution || include_solutions {
            return true;
        }
        let checkout = entry.path.to_native(&self.config.root.to_native());
        !depsync_fs::io::is_non_empty_dir(&checkout)
    }

    fn exclude_from_solutions(&self, results: &BTreeMap<RelativePath, SyncResult>) {
        let root = self.config.root.to_native();
        for solution in &self.config.solutions {
            let nested: Vec<String> = results
                .values()
                .filter(|r| r.outcome.is_success() && solution.path.is_ancestor_of(&r.path))
                .filter_map(|r| relative_to(&solution.path, &r.path))
                .collect();
            if nested.is_empty() {
                continue;
            }
            let solution_dir = solution.path.to_native(&root);
            if let Err(e) = depsync_vcs::exclude::ignore_paths_in_git(&solution_dir, &nested) {
                tracing::warn!(solution = %solution.name, error = %e, "Failed to update git excludes");
            }
        }
    }

    /// Compare the tree with the current plan and state.
    pub fn check(&self) -> Result<CheckReport> {
        let outcome = self.plan()?;
        let state = StateStore::load(self.config.state_path())?;
        Ok(check_tree(
            &self.config.root.to_native(),
            &outcome.plan,
            &state,
            &self.adapters_for(&self.config.sync),
        ))
    }

    /// Forget all recorded state. Returns whether a state file existed.
    pub fn clean(&self) -> Result<bool> {
        let path = self.config.state_path();
        let existed = path.exists();
        let mut state = StateStore::load(path)?;
        state.clear()?;
        tracing::info!(existed, "State cleared");
        Ok(existed)
    }
}

/// Entries whose target moved since it was applied, plus everything nested
/// under them: re-cloning a parent removes its nested checkouts.
fn changed_entries<'a>(
    plan: &'a SyncPlan,
    applied: &BTreeMap<RelativePath, Target>,
) -> Vec<&'a ResolvedDependency> {
    let moved: Vec<&RelativePath> = plan
        .entries()
        .iter()
        .filter(|e| applied.get(&e.path) != Some(&target_of(e)))
        .map(|e| &e.path)
        .collect();
    plan.entries()
        .iter()
        .filter(|e| moved.iter().any(|m| **m == e.path || m.is_ancestor_of(&e.path)))
        .collect()
}

fn ensure_no_conflicts(outcome: &PlanOutcome) -> Result<()> {
    match outcome
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::ConflictUnresolved)
    {
        Some(conflict) => Err(Error::StrictConflict {
            path: conflict.path.clone(),
            message: conflict.message.clone(),
        }),
        None => Ok(()),
    }
}

/// `path` relative to its ancestor `base`, e.g. `app` + `app/lib/x` gives `lib/x`.
fn relative_to(base: &RelativePath, path: &RelativePath) -> Option<String> {
    if base.is_root() {
        return Some(path.as_str().to_string());
    }
    path.as_str()
        .strip_prefix(base.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_strips_the_ancestor() {
        let base = RelativePath::parse("app").unwrap();
        let path = RelativePath::parse("app/lib/x").unwrap();
        assert_eq!(relative_to(&base, &path).as_deref(), Some("lib/x"));
        assert_eq!(relative_to(&RelativePath::root(), &path).as_deref(), Some("app/lib/x"));
        assert_eq!(relative_to(&base, &RelativePath::parse("other").unwrap()), None);
    }
}
