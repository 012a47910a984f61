//! Shared data model: solutions, dependency requests and diagnostics

use depsync_fs::RelativePath;
use depsync_vcs::{RevisionSpec, SourceLocator, VcsKind};
use serde::{Deserialize, Serialize};

/// How a dependency is materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// A working copy managed by the adapter for the locator's VCS kind
    #[default]
    SourceCheckout,
    /// A downloaded blob, always handled by the archive adapter
    OpaqueBinary,
}

impl DependencyKind {
    /// The adapter kind that materializes a dependency of this kind.
    pub fn adapter_kind(&self, locator: &SourceLocator) -> VcsKind {
        match self {
            Self::SourceCheckout => locator.kind,
            Self::OpaqueBinary => VcsKind::Archive,
        }
    }

    /// Only source checkouts carry a nested manifest.
    pub fn is_recursive(&self) -> bool {
        matches!(self, Self::SourceCheckout)
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceCheckout => write!(f, "source"),
            Self::OpaqueBinary => write!(f, "binary"),
        }
    }
}

/// A top-level configured repository acting as a graph root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub name: String,
    pub path: RelativePath,
    pub locator: SourceLocator,
    /// Manifest file name inside the checkout
    pub manifest: String,
    pub revision: RevisionSpec,
}

impl Solution {
    /// The request that places this Solution itself in the graph.
    pub fn as_request(&self) -> DependencyRequest {
        DependencyRequest {
            path: self.path.clone(),
            name: self.name.clone(),
            locator: self.locator.clone(),
            revision: self.revision.clone(),
            kind: DependencyKind::SourceCheckout,
            manifest: self.manifest.clone(),
            digest: None,
            origin: Vec::new(),
        }
    }
}

/// One declared edge of the raw graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRequest {
    /// Target path relative to the managed root
    pub path: RelativePath,
    pub name: String,
    pub locator: SourceLocator,
    pub revision: RevisionSpec,
    pub kind: DependencyKind,
    /// Nested manifest file name
    pub manifest: String,
    /// Expected content digest of an opaque binary
    pub digest: Option<String>,
    /// Paths from the Solution root down to the declaring node.
    /// Empty for the Solution itself.
    pub origin: Vec<RelativePath>,
}

impl DependencyRequest {
    /// Number of declaring nodes between the Solution root and this request.
    pub fn depth(&self) -> usize {
        self.origin.len()
    }

    /// Whether this request places a Solution rather than a declared dependency.
    pub fn is_solution(&self) -> bool {
        self.origin.is_empty()
    }

    /// The node whose manifest declared this request.
    pub fn declared_by(&self) -> Option<&RelativePath> {
        self.origin.last()
    }

    /// Everything except the origin chain: two requests with the same value
    /// are the same declaration reached along different branches.
    pub fn same_value(&self, other: &DependencyRequest) -> bool {
        self.path == other.path
            && self.locator == other.locator
            && self.revision == other.revision
            && self.kind == other.kind
            && self.manifest == other.manifest
            && self.digest == other.digest
    }

    /// Whether both requests ask for the same source at the same revision.
    pub fn same_target(&self, other: &DependencyRequest) -> bool {
        self.locator == other.locator && self.revision == other.revision
    }

    /// Human readable origin, e.g. `src -> src/third_party`.
    pub fn origin_label(&self) -> String {
        if self.origin.is_empty() {
            "<config>".to_string()
        } else {
            self.origin
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        }
    }
}

/// Category of a non-fatal problem found while building or resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    CycleDetected,
    ConflictUnresolved,
    PathEscape,
    MalformedManifest,
    UnsupportedKind,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CycleDetected => "cycle",
            Self::ConflictUnresolved => "conflict",
            Self::PathEscape => "path-escape",
            Self::MalformedManifest => "malformed-manifest",
            Self::UnsupportedKind => "unsupported-kind",
        };
        f.write_str(name)
    }
}

/// A problem scoped to one declaration or node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The affected path or manifest, as written
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
    }
}
