//! Dependency graph keyed by target path
//!
//! - **builder**: breadth-first discovery from the Solutions through manifests
//! - **tree**: text rendering of who-requests-what for diagnostics

mod builder;
mod tree;

pub use builder::DependencyGraphBuilder;
pub use tree::render_tree;

use std::collections::{BTreeMap, BTreeSet};

use depsync_fs::RelativePath;
use serde::Serialize;

use crate::model::DependencyRequest;

/// Every request targeting one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub path: RelativePath,
    /// Distinct requests, deduplicated by value
    pub requests: Vec<DependencyRequest>,
    /// Declaring nodes; empty for a Solution placed by configuration
    pub requesters: BTreeSet<RelativePath>,
}

impl GraphNode {
    fn new(path: RelativePath) -> Self {
        Self {
            path,
            requests: Vec::new(),
            requesters: BTreeSet::new(),
        }
    }

    /// Add `request`, merging it into an equal-valued request if one exists.
    ///
    /// Returns `true` when the request was new. On a merge the shorter
    /// origin chain is kept (lexicographically smaller on equal length).
    fn add(&mut self, request: DependencyRequest) -> bool {
        if let Some(declared_by) = request.declared_by() {
            self.requesters.insert(declared_by.clone());
        }

        match self.requests.iter_mut().find(|r| r.same_value(&request)) {
            Some(existing) => {
                let shorter = (request.origin.len(), &request.origin)
                    < (existing.origin.len(), &existing.origin);
                if shorter {
                    existing.origin = request.origin;
                }
                false
            }
            None => {
                self.requests.push(request);
                true
            }
        }
    }

    /// Whether a Solution from the configuration targets this path.
    pub fn is_solution(&self) -> bool {
        self.requests.iter().any(|r| r.is_solution())
    }

    /// Canonical order, independent of insertion order.
    fn sort(&mut self) {
        self.requests.sort_by(|a, b| {
            (a.origin.len(), &a.origin, &a.locator, &a.revision, &a.manifest)
                .cmp(&(b.origin.len(), &b.origin, &b.locator, &b.revision, &b.manifest))
        });
    }
}

/// The raw dependency graph produced by one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    nodes: BTreeMap<RelativePath, GraphNode>,
    /// Nodes whose checkout is not materialized, so their manifest is unknown
    pending: BTreeSet<RelativePath>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `request` to its node, creating the node on first sight.
    pub fn insert(&mut self, request: DependencyRequest) -> bool {
        let path = request.path.clone();
        self.nodes
            .entry(path.clone())
            .or_insert_with(|| GraphNode::new(path))
            .add(request)
    }

    pub fn mark_pending(&mut self, path: RelativePath) {
        self.pending.insert(path);
    }

    pub fn node(&self, path: &RelativePath) -> Option<&GraphNode> {
        self.nodes.get(path)
    }

    /// Nodes in path order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn pending(&self) -> &BTreeSet<RelativePath> {
        &self.pending
    }

    pub fn is_pending(&self, path: &RelativePath) -> bool {
        self.pending.contains(path)
    }

    /// Paths of the nodes declared by `parent`.
    pub fn children_of(&self, parent: &RelativePath) -> Vec<&RelativePath> {
        self.nodes
            .values()
            .filter(|n| n.requesters.contains(parent))
            .map(|n| &n.path)
            .collect()
    }

    pub(crate) fn finalize(&mut self) {
        for node in self.nodes.values_mut() {
            node.sort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DependencyKind;
    use depsync_vcs::{RevisionSpec, SourceLocator};

    fn request(path: &str, origin: &[&str]) -> DependencyRequest {
        DependencyRequest {
            path: RelativePath::parse(path).unwrap(),
            name: path.into(),
            locator: SourceLocator::git("https://example.com/dep.git"),
            revision: RevisionSpec::Default,
            kind: DependencyKind::SourceCheckout,
            manifest: "DEPS".into(),
            digest: None,
            origin: origin.iter().map(|p| RelativePath::parse(p).unwrap()).collect(),
        }
    }

    #[test]
    fn equal_requests_merge_keeping_shortest_chain() {
        let mut graph = Graph::new();
        assert!(graph.insert(request("app/dep", &["app", "app/x"])));
        assert!(!graph.insert(request("app/dep", &["app"])));

        let node = graph.node(&RelativePath::parse("app/dep").unwrap()).unwrap();
        assert_eq!(node.requests.len(), 1);
        assert_eq!(node.requests[0].depth(), 1);
        assert_eq!(node.requesters.len(), 2);
    }
}
