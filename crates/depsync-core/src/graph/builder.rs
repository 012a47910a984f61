//! Breadth-first graph discovery
//!
//! Each BFS level reads the manifests of its nodes concurrently. Workers
//! insert the requests they discover straight into the shared graph; the
//! choice of which nodes to descend into next is made after the level
//! completes, from a sorted candidate list, so the result does not depend on
//! which worker finished first.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use depsync_fs::RelativePath;
use depsync_vcs::SourceLocator;
use rayon::prelude::*;

use super::Graph;
use crate::config::Rewrites;
use crate::manifest::{DeclaredDependency, ManifestSource};
use crate::model::{DependencyRequest, Diagnostic, DiagnosticKind, Solution};
use crate::pool::{lock, worker_pool};
use crate::{Error, Result};

/// Builds a [`Graph`] from the Solutions through their manifests.
pub struct DependencyGraphBuilder<'a> {
    root: &'a Path,
    source: &'a dyn ManifestSource,
    rewrites: Rewrites,
    recursive: bool,
    jobs: usize,
}

impl<'a> DependencyGraphBuilder<'a> {
    /// A builder reading manifests below `root` through `source`.
    pub fn new(root: &'a Path, source: &'a dyn ManifestSource) -> Self {
        Self {
            root,
            source,
            rewrites: Rewrites::default(),
            recursive: true,
            jobs: 1,
        }
    }

    /// When disabled, only the Solutions' own manifests are read.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn rewrites(mut self, rewrites: Rewrites) -> Self {
        self.rewrites = rewrites;
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Discover the graph rooted at `solutions`.
    ///
    /// Problems scoped to one declaration become diagnostics; only I/O
    /// failures outside of manifest parsing abort the build.
    pub fn build(&self, solutions: &[Solution]) -> Result<(Graph, Vec<Diagnostic>)> {
        let graph = Mutex::new(Graph::new());
        let diagnostics = Mutex::new(Vec::new());
        let mut visited: HashSet<(RelativePath, String)> = HashSet::new();
        let pool = worker_pool(self.jobs)?;

        let mut level: Vec<DependencyRequest> = Vec::new();
        for solution in solutions {
            let request = solution.as_request();
            lock(&graph).insert(request.clone());
            if visited.insert((request.path.clone(), request.manifest.clone())) {
                level.push(request);
            }
        }

        let mut depth = 0;
        while !level.is_empty() {
            tracing::debug!(depth, nodes = level.len(), "Reading manifests");
            let discovered: Vec<Vec<DependencyRequest>> = pool.install(|| {
                level
                    .par_iter()
                    .map(|request| self.expand(request, &graph, &diagnostics))
                    .collect::<Result<Vec<_>>>()
            })?;

            let mut candidates: Vec<DependencyRequest> = discovered
                .into_iter()
                .flatten()
                .filter(|r| self.recursive && r.kind.is_recursive())
                .collect();
            candidates.sort_by(|a, b| {
                (a.origin.len(), &a.origin, &a.path, &a.locator, &a.revision, &a.manifest).cmp(&(
                    b.origin.len(),
                    &b.origin,
                    &b.path,
                    &b.locator,
                    &b.revision,
                    &b.manifest,
                ))
            });

            level = candidates
                .into_iter()
                .filter(|r| visited.insert((r.path.clone(), r.manifest.clone())))
                .collect();
            depth += 1;
        }

        let mut graph = graph.into_inner().unwrap_or_else(|e| e.into_inner());
        graph.finalize();
        let mut diagnostics = diagnostics.into_inner().unwrap_or_else(|e| e.into_inner());
        diagnostics.sort();
        diagnostics.dedup();

        tracing::debug!(
            nodes = graph.len(),
            pending = graph.pending().len(),
            diagnostics = diagnostics.len(),
            "Graph built"
        );
        Ok((graph, diagnostics))
    }

    /// Read the manifest of `request`'s checkout and insert what it declares.
    fn expand(
        &self,
        request: &DependencyRequest,
        graph: &Mutex<Graph>,
        diagnostics: &Mutex<Vec<Diagnostic>>,
    ) -> Result<Vec<DependencyRequest>> {
        let report = |diagnostic: Diagnostic| {
            tracing::warn!(%diagnostic, "Graph diagnostic");
            lock(diagnostics).push(diagnostic);
        };

        let checkout = request.path.to_native(self.root);
        let declared = match self.source.load(&checkout, &request.manifest) {
            Ok(Some(declared)) => declared,
            Ok(None) => {
                tracing::debug!(path = %request.path, "Checkout not materialized, pending");
                lock(graph).mark_pending(request.path.clone());
                return Ok(Vec::new());
            }
            Err(Error::MalformedManifest { path, message }) => {
                report(Diagnostic::new(DiagnosticKind::MalformedManifest, path, message));
                return Ok(Vec::new());
            }
            Err(Error::UnsupportedKind { path, kind }) => {
                report(Diagnostic::new(
                    DiagnosticKind::UnsupportedKind,
                    path,
                    format!("unsupported dependency kind '{}'", kind),
                ));
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut chain = request.origin.clone();
        chain.push(request.path.clone());

        let mut children = Vec::with_capacity(declared.len());
        for dependency in declared {
            let path = match request.path.join(&dependency.path) {
                Ok(path) => path,
                Err(e) => {
                    let kind = match e {
                        depsync_fs::Error::PathEscape { .. } => DiagnosticKind::PathEscape,
                        _ => DiagnosticKind::MalformedManifest,
                    };
                    report(Diagnostic::new(
                        kind,
                        dependency.path.clone(),
                        format!("declared by {}: {}", request.path, e),
                    ));
                    continue;
                }
            };

            if chain.contains(&path) {
                report(Diagnostic::new(
                    DiagnosticKind::CycleDetected,
                    path.as_str(),
                    format!(
                        "declared by {} but already on the chain {}",
                        request.path,
                        chain
                            .iter()
                            .map(|p| p.as_str())
                            .collect::<Vec<_>>()
                            .join(" -> ")
                    ),
                ));
                continue;
            }

            let child = self.child_request(path, dependency, chain.clone());
            lock(graph).insert(child.clone());
            children.push(child);
        }
        Ok(children)
    }

    fn child_request(
        &self,
        path: RelativePath,
        dependency: DeclaredDependency,
        origin: Vec<RelativePath>,
    ) -> DependencyRequest {
        DependencyRequest {
            path,
            name: dependency.name,
            locator: SourceLocator::new(
                dependency.locator.kind,
                self.rewrites.apply(&dependency.locator.url),
            ),
            revision: dependency.revision,
            kind: dependency.kind,
            manifest: dependency.manifest,
            digest: dependency.digest,
            origin,
        }
    }
}
