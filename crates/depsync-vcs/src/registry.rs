//! Adapter registry keyed by VCS kind.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{ArchiveAdapter, GitAdapter, VcsKind, VersionControl};

/// The set of adapters a sync run dispatches to.
#[derive(Clone, Default)]
pub struct AdapterSet {
    adapters: BTreeMap<VcsKind, Arc<dyn VersionControl>>,
}

impl AdapterSet {
    /// An empty set; every lookup fails until adapters are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Git and archive adapters with full git history.
    pub fn standard() -> Self {
        Self::standard_with(false)
    }

    /// Git and archive adapters; `shallow` limits git to recent history.
    pub fn standard_with(shallow: bool) -> Self {
        Self::new()
            .with(Arc::new(GitAdapter::new().shallow(shallow)))
            .with(Arc::new(ArchiveAdapter::new()))
    }

    /// Register `adapter` for its kind, replacing any previous one.
    pub fn with(mut self, adapter: Arc<dyn VersionControl>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn get(&self, kind: VcsKind) -> Option<Arc<dyn VersionControl>> {
        self.adapters.get(&kind).cloned()
    }
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSet")
            .field("kinds", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}
