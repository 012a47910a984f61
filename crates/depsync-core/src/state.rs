//! Persisted record of the last successful sync of every managed path
//!
//! The store is a versioned TOML document at `.depsync/state.toml`:
//!
//! ```toml
//! version = 1
//!
//! [entries."app/third_party/zlib"]
//! revision = "0123abcd..."
//! kind = "source-checkout"
//! synced_at = "2024-01-01T00:00:00Z"
//!
//! [entries."app/third_party/zlib".locator]
//! kind = "git"
//! url = "https://example.com/zlib.git"
//! ```
//!
//! Every [`StateStore::save`] rewrites the whole document atomically, so a
//! crash mid-sync leaves completed nodes recorded and in-flight nodes absent.
//!
//! Writers serialize on an exclusive lock of the sibling `state.lock` file and
//! merge into whatever is on disk at that moment, so concurrent syncs of one
//! root keep each other's records.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use depsync_fs::{NormalizedPath, RelativePath};
use depsync_vcs::{RevisionSpec, SourceLocator};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::model::DependencyKind;
use crate::{Error, Result};

/// Current state document format.
pub const STATE_VERSION: u32 = 1;

/// What was last synced at one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub locator: SourceLocator,
    /// Resolved revision id reported by the adapter
    #[serde(default)]
    pub revision: String,
    /// The revision spec that was requested
    #[serde(default)]
    pub requested: RevisionSpec,
    #[serde(default)]
    pub kind: DependencyKind,
    /// Unix epoch when absent
    #[serde(default)]
    pub synced_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(
        locator: SourceLocator,
        requested: RevisionSpec,
        revision: impl Into<String>,
        kind: DependencyKind,
    ) -> Self {
        Self {
            locator,
            revision: revision.into(),
            requested,
            kind,
            synced_at: Utc::now(),
        }
    }

    /// Whether this record was written for exactly this target.
    pub fn matches(&self, locator: &SourceLocator, requested: &RevisionSpec, kind: DependencyKind) -> bool {
        &self.locator == locator && &self.requested == requested && self.kind == kind
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default = "current_version")]
    version: u32,
    #[serde(default)]
    entries: BTreeMap<RelativePath, StateRecord>,
}

fn current_version() -> u32 {
    STATE_VERSION
}

/// Last-known-synced state of the managed tree.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: NormalizedPath,
    records: BTreeMap<RelativePath, StateRecord>,
}

impl StateStore {
    /// An empty store that will persist to `path`.
    pub fn new(path: NormalizedPath) -> Self {
        Self {
            path,
            records: BTreeMap::new(),
        }
    }

    /// Load the store at `path` under a shared lock. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or was written
    /// by a newer format version.
    pub fn load(path: NormalizedPath) -> Result<Self> {
        let native = path.to_native();
        if !native.exists() {
            tracing::debug!(state = %path, "No state file, starting empty");
            return Ok(Self::new(path));
        }

        let lock = open_lock(&native)?;
        lock.lock_shared()?;
        let records = read_records(&native)?;

        // Lock released when the handle is dropped
        tracing::debug!(state = %path, records = records.len(), "Loaded state");
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn records(&self) -> &BTreeMap<RelativePath, StateRecord> {
        &self.records
    }

    pub fn record_of(&self, path: &RelativePath) -> Option<&StateRecord> {
        self.records.get(path)
    }

    /// Record `record` for `path` and persist the store.
    ///
    /// The document is re-read under the exclusive lock first; records other
    /// writers saved since this store was loaded are kept and become visible
    /// through [`records`](Self::records).
    pub fn save(&mut self, path: &RelativePath, record: StateRecord) -> Result<()> {
        let native = self.path.to_native();
        let lock = open_lock(&native)?;
        lock.lock_exclusive()?;

        let mut document = StateDocument {
            version: STATE_VERSION,
            entries: read_records(&native)?,
        };
        document.entries.insert(path.clone(), record);
        let content = toml::to_string_pretty(&document)?;
        depsync_fs::io::write_atomic(&self.path, content.as_bytes())?;

        self.records = document.entries;
        Ok(())
    }

    /// Forget every record and delete the state file.
    pub fn clear(&mut self) -> Result<()> {
        let native = self.path.to_native();
        self.records.clear();
        if !native.exists() {
            return Ok(());
        }
        let lock = open_lock(&native)?;
        lock.lock_exclusive()?;
        std::fs::remove_file(&native).map_err(|e| depsync_fs::Error::io(&native, e))?;
        Ok(())
    }
}

fn lock_path(state: &Path) -> PathBuf {
    state.with_extension("lock")
}

/// Open (creating if needed) the lock file guarding `state`.
fn open_lock(state: &Path) -> Result<File> {
    if let Some(parent) = state.parent() {
        std::fs::create_dir_all(parent).map_err(|e| depsync_fs::Error::io(parent, e))?;
    }
    let path = lock_path(state);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .map_err(|e| depsync_fs::Error::io(&path, e).into())
}

/// Records currently on disk; empty when the file does not exist. Callers
/// hold the lock.
fn read_records(state: &Path) -> Result<BTreeMap<RelativePath, StateRecord>> {
    let mut content = String::new();
    match File::open(state) {
        Ok(mut file) => {
            file.read_to_string(&mut content)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(depsync_fs::Error::io(state, e).into()),
    }
    let document: StateDocument = toml::from_str(&content)?;

    if document.version > STATE_VERSION {
        return Err(Error::UnsupportedStateVersion {
            path: state.to_path_buf(),
            found: document.version,
            supported: STATE_VERSION,
        });
    }
    Ok(document.entries)
}
