//! Conflict resolution and plan ordering
//!
//! Reduces every graph node to one authoritative source and revision:
//!
//! 1. A single distinct (locator, revision) among the requests wins outright.
//! 2. Otherwise pinned revisions (commit ids, digests) beat floating ones.
//! 3. Among the remaining candidates the shortest origin chain wins.
//! 4. Candidates still disagreeing leave the node conflicted-unresolved.

use depsync_fs::RelativePath;
use depsync_vcs::{RevisionSpec, SourceLocator};
use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphNode};
use crate::model::{DependencyKind, DependencyRequest, Diagnostic, DiagnosticKind};

/// Whether a node could be reduced to a single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStatus {
    Resolved,
    /// Requests disagree and no rule decides; the subtree is not synced
    ConflictedUnresolved,
}

/// The target state chosen for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub path: RelativePath,
    pub name: String,
    pub locator: SourceLocator,
    pub revision: RevisionSpec,
    pub kind: DependencyKind,
    pub manifest: String,
    pub digest: Option<String>,
    /// Requests that lost to the chosen one
    pub overridden: Vec<DependencyRequest>,
    pub status: ResolutionStatus,
    /// Placed by a configured Solution rather than declared in a manifest
    pub is_solution: bool,
}

impl ResolvedDependency {
    pub fn is_conflicted(&self) -> bool {
        self.status == ResolutionStatus::ConflictedUnresolved
    }

    /// What the working tree should hold at this path.
    pub fn target(&self) -> (&SourceLocator, &RevisionSpec, DependencyKind) {
        (&self.locator, &self.revision, self.kind)
    }

    fn from_request(
        request: &DependencyRequest,
        overridden: Vec<DependencyRequest>,
        status: ResolutionStatus,
        is_solution: bool,
    ) -> Self {
        Self {
            path: request.path.clone(),
            name: request.name.clone(),
            locator: request.locator.clone(),
            revision: request.revision.clone(),
            kind: request.kind,
            manifest: request.manifest.clone(),
            digest: request.digest.clone(),
            overridden,
            status,
            is_solution,
        }
    }
}

/// Ordered target state: a path always precedes the paths nested under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    entries: Vec<ResolvedDependency>,
}

impl SyncPlan {
    /// Build a plan from entries in any order.
    pub fn new(mut entries: Vec<ResolvedDependency>) -> Self {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries.dedup_by(|a, b| a.path == b.path);
        Self { entries }
    }

    pub fn entries(&self) -> &[ResolvedDependency] {
        &self.entries
    }

    pub fn get(&self, path: &RelativePath) -> Option<&ResolvedDependency> {
        self.entries
            .binary_search_by(|e| e.path.cmp(path))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn conflicted(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.entries.iter().filter(|e| e.is_conflicted())
    }

    /// Canonical JSON rendering; identical graphs give identical bytes.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Reduces a [`Graph`] to a [`SyncPlan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, graph: &Graph) -> (SyncPlan, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let entries = graph
            .nodes()
            .filter(|node| !node.requests.is_empty())
            .map(|node| resolve_node(node, &mut diagnostics))
            .collect();
        diagnostics.sort();
        (SyncPlan::new(entries), diagnostics)
    }
}

/// Canonical ordering of requests: shortest chain first, then by value.
fn canonical(a: &&DependencyRequest, b: &&DependencyRequest) -> std::cmp::Ordering {
    (a.origin.len(), &a.origin, &a.locator, &a.revision, &a.manifest).cmp(&(
        b.origin.len(),
        &b.origin,
        &b.locator,
        &b.revision,
        &b.manifest,
    ))
}

fn resolve_node(node: &GraphNode, diagnostics: &mut Vec<Diagnostic>) -> ResolvedDependency {
    let mut requests: Vec<&DependencyRequest> = node.requests.iter().collect();
    requests.sort_by(canonical);
    let is_solution = node.is_solution();

    let overridden_by = |winner: &DependencyRequest| -> Vec<DependencyRequest> {
        requests
            .iter()
            .filter(|r| !r.same_target(winner))
            .map(|r| (*r).clone())
            .collect()
    };

    let first = requests[0];
    if requests.iter().all(|r| r.same_target(first)) {
        return ResolvedDependency::from_request(first, Vec::new(), ResolutionStatus::Resolved, is_solution);
    }

    let mut candidates: Vec<&DependencyRequest> = requests.clone();
    if candidates.iter().any(|r| r.revision.is_pinned()) {
        candidates.retain(|r| r.revision.is_pinned());
    }
    let shortest = candidates.iter().map(|r| r.depth()).min().unwrap_or(0);
    candidates.retain(|r| r.depth() == shortest);

    let winner = candidates[0];
    if candidates.iter().all(|r| r.same_target(winner)) {
        tracing::debug!(
            path = %node.path,
            locator = %winner.locator,
            revision = %winner.revision,
            contenders = requests.len(),
            "Resolved conflicting requests"
        );
        return ResolvedDependency::from_request(
            winner,
            overridden_by(winner),
            ResolutionStatus::Resolved,
            is_solution,
        );
    }

    let contenders = candidates
        .iter()
        .map(|r| format!("{} @ {} from {}", r.locator.url, r.revision, r.origin_label()))
        .collect::<Vec<_>>()
        .join("; ");
    let diagnostic = Diagnostic::new(
        DiagnosticKind::ConflictUnresolved,
        node.path.as_str(),
        format!("requests disagree: {}", contenders),
    );
    tracing::warn!(%diagnostic, "Unresolved conflict");
    diagnostics.push(diagnostic);

    ResolvedDependency::from_request(
        winner,
        Vec::new(),
        ResolutionStatus::ConflictedUnresolved,
        is_solution,
    )
}
