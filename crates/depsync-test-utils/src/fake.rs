//! [`RecordingVcs`], an in-memory adapter for engine and driver tests.
//!
//! Remotes are scripted up front: refs map to revision ids and files are
//! written into every checkout. Each call is recorded so tests can assert on
//! ordering, and URLs can be marked as failing to exercise error isolation.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use depsync_vcs::{Error, Result, RevisionSpec, SourceLocator, VcsKind, VersionControl};
use serde::{Deserialize, Serialize};

/// Marker written into every fake checkout.
pub const FAKE_MARKER: &str = ".fake-vcs";
/// Presence of this file makes a checkout report local modifications.
pub const DIRTY_MARKER: &str = ".fake-dirty";

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Clone { url: String, dest: PathBuf },
    Fetch { dest: PathBuf },
    Checkout { dest: PathBuf, revision: RevisionSpec },
    /// Emitted when a checkout returns successfully
    CheckedOut { dest: PathBuf, id: String },
}

impl VcsCall {
    pub fn dest(&self) -> &Path {
        match self {
            Self::Clone { dest, .. }
            | Self::Fetch { dest }
            | Self::Checkout { dest, .. }
            | Self::CheckedOut { dest, .. } => dest,
        }
    }

    /// Whether this call touched the remote or the working tree.
    pub fn is_io(&self) -> bool {
        !matches!(self, Self::CheckedOut { .. })
    }
}

#[derive(Debug, Clone, Default)]
struct FakeRemote {
    default: String,
    refs: BTreeMap<String, String>,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Marker {
    url: String,
    revision: String,
}

/// A scripted [`VersionControl`] that materializes checkouts as plain directories.
pub struct RecordingVcs {
    kind: VcsKind,
    remotes: Mutex<BTreeMap<String, FakeRemote>>,
    failing: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<VcsCall>>,
    delay: Option<Duration>,
}

impl RecordingVcs {
    pub fn new(kind: VcsKind) -> Self {
        Self {
            kind,
            remotes: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(BTreeSet::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn git() -> Self {
        Self::new(VcsKind::Git)
    }

    pub fn archive() -> Self {
        Self::new(VcsKind::Archive)
    }

    /// Sleep this long inside every clone and checkout.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register a remote whose default branch `main` points at `head`.
    pub fn add_remote(&self, url: &str, head: &str) {
        let mut remotes = self.remotes.lock().unwrap();
        let remote = remotes.entry(url.to_string()).or_default();
        remote.default = head.to_string();
        remote.refs.insert("main".to_string(), head.to_string());
    }

    /// Point a branch or tag `name` of `url` at `id`.
    pub fn set_ref(&self, url: &str, name: &str, id: &str) {
        let mut remotes = self.remotes.lock().unwrap();
        let remote = remotes.entry(url.to_string()).or_default();
        remote.refs.insert(name.to_string(), id.to_string());
        if name == "main" {
            remote.default = id.to_string();
        }
    }

    /// A file written into every checkout of `url`.
    pub fn add_file(&self, url: &str, path: &str, content: &str) {
        let mut remotes = self.remotes.lock().unwrap();
        remotes
            .entry(url.to_string())
            .or_default()
            .files
            .insert(path.to_string(), content.to_string());
    }

    /// Make every operation on `url` fail.
    pub fn fail_url(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that performed I/O, excluding completion events.
    pub fn io_calls(&self) -> Vec<VcsCall> {
        self.calls().into_iter().filter(VcsCall::is_io).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Simulate a local edit in the checkout at `dest`.
    pub fn make_dirty(dest: &Path) {
        fs::write(dest.join(DIRTY_MARKER), "edited").unwrap();
    }

    fn record(&self, call: VcsCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn pause(&self) {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
    }

    fn check_failure(&self, url: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(url) {
            return Err(Error::Transport {
                url: url.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn read_marker(dest: &Path) -> Result<Marker> {
        let content =
            fs::read_to_string(dest.join(FAKE_MARKER)).map_err(|_| Error::NotACheckout {
                path: dest.to_path_buf(),
            })?;
        toml::from_str(&content).map_err(|e| Error::Transport {
            url: dest.display().to_string(),
            message: e.to_string(),
        })
    }

    fn write_marker(dest: &Path, marker: &Marker) -> Result<()> {
        let content = toml::to_string(marker).map_err(|e| Error::Transport {
            url: marker.url.clone(),
            message: e.to_string(),
        })?;
        fs::write(dest.join(FAKE_MARKER), content)?;
        Ok(())
    }

    fn resolve(&self, url: &str, dest: &Path, revision: &RevisionSpec) -> Result<String> {
        let remotes = self.remotes.lock().unwrap();
        let not_found = || Error::RevisionNotFound {
            revision: revision.to_string(),
            path: dest.to_path_buf(),
        };
        let remote = remotes.get(url).ok_or_else(not_found)?;
        match revision {
            RevisionSpec::Default => Ok(remote.default.clone()),
            RevisionSpec::Branch(name) | RevisionSpec::Tag(name) => {
                remote.refs.get(name).cloned().ok_or_else(not_found)
            }
            RevisionSpec::Commit(id) | RevisionSpec::Digest(id) => Ok(id.clone()),
        }
    }
}

impl VersionControl for RecordingVcs {
    fn kind(&self) -> VcsKind {
        self.kind
    }

    fn clone_source(&self, locator: &SourceLocator, _revision: &RevisionSpec, dest: &Path) -> Result<()> {
        self.record(VcsCall::Clone {
            url: locator.url.clone(),
            dest: dest.to_path_buf(),
        });
        self.pause();
        self.check_failure(&locator.url)?;
        if !self.remotes.lock().unwrap().contains_key(&locator.url) {
            return Err(Error::Transport {
                url: locator.url.clone(),
                message: "repository not found".to_string(),
            });
        }

        fs::create_dir_all(dest)?;
        Self::write_marker(
            dest,
            &Marker {
                url: locator.url.clone(),
                revision: String::new(),
            },
        )
    }

    fn fetch(&self, dest: &Path) -> Result<()> {
        self.record(VcsCall::Fetch {
            dest: dest.to_path_buf(),
        });
        let marker = Self::read_marker(dest)?;
        self.check_failure(&marker.url)
    }

    fn checkout(&self, dest: &Path, revision: &RevisionSpec) -> Result<String> {
        self.record(VcsCall::Checkout {
            dest: dest.to_path_buf(),
            revision: revision.clone(),
        });
        self.pause();
        let marker = Self::read_marker(dest)?;
        self.check_failure(&marker.url)?;

        let id = self.resolve(&marker.url, dest, revision)?;
        let files = self
            .remotes
            .lock()
            .unwrap()
            .get(&marker.url)
            .map(|r| r.files.clone())
            .unwrap_or_default();
        for (path, content) in files {
            let target = dest.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, content)?;
        }
        let _ = fs::remove_file(dest.join(DIRTY_MARKER));

        Self::write_marker(
            dest,
            &Marker {
                url: marker.url,
                revision: id.clone(),
            },
        )?;
        self.record(VcsCall::CheckedOut {
            dest: dest.to_path_buf(),
            id: id.clone(),
        });
        Ok(id)
    }

    fn current_revision(&self, dest: &Path) -> Result<String> {
        Ok(Self::read_marker(dest)?.revision)
    }

    fn has_local_modifications(&self, dest: &Path) -> Result<bool> {
        Self::read_marker(dest)?;
        Ok(dest.join(DIRTY_MARKER).exists())
    }

    fn is_checkout(&self, dest: &Path) -> bool {
        dest.join(FAKE_MARKER).is_file()
    }

    fn source_url(&self, dest: &Path) -> Result<Option<String>> {
        Ok(Some(Self::read_marker(dest)?.url))
    }
}
