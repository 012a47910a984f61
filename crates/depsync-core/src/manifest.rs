//! Manifest parsing
//!
//! A manifest (`DEPS` by default) is a TOML document listing the direct
//! dependencies of the repository it lives in:
//!
//! ```toml
//! [deps."third_party/zlib"]
//! url = "https://example.com/zlib.git"
//! commit = "0123abcd"
//!
//! [deps."tools/ninja"]
//! url = "https://example.com/ninja.zip"
//! kind = "archive"
//! sha256 = "..."
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use depsync_fs::{DepsyncPath, NormalizedPath};
use depsync_vcs::{RevisionSpec, SourceLocator, VcsKind, is_commit_id};
use serde::Deserialize;

use crate::model::DependencyKind;
use crate::{Error, Result};

/// One dependency as written in a manifest, before its path is resolved
/// against the declaring node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    /// Target path as written, relative to the declaring repository
    pub path: String,
    pub name: String,
    pub locator: SourceLocator,
    pub revision: RevisionSpec,
    pub kind: DependencyKind,
    pub manifest: String,
    pub digest: Option<String>,
}

/// Reads the dependency declarations of a checkout.
pub trait ManifestSource: Send + Sync {
    /// Declarations in `manifest` inside `checkout`.
    ///
    /// Returns `Ok(None)` when the checkout is not materialized yet, and an
    /// empty list when it is but carries no manifest.
    fn load(&self, checkout: &Path, manifest: &str) -> Result<Option<Vec<DeclaredDependency>>>;
}

/// [`ManifestSource`] reading TOML manifests from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlManifestSource;

impl ManifestSource for TomlManifestSource {
    fn load(&self, checkout: &Path, manifest: &str) -> Result<Option<Vec<DeclaredDependency>>> {
        if !depsync_fs::io::is_non_empty_dir(checkout) {
            return Ok(None);
        }
        let path = NormalizedPath::new(checkout.join(manifest));
        match depsync_fs::io::read_text_if_exists(&path)? {
            Some(content) => parse_manifest(&content, path.as_str()).map(Some),
            None => {
                tracing::debug!(manifest = %path, "No manifest, treating as leaf");
                Ok(Some(Vec::new()))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    deps: BTreeMap<String, RawDependency>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependency {
    url: String,
    kind: Option<String>,
    name: Option<String>,
    branch: Option<String>,
    tag: Option<String>,
    commit: Option<String>,
    manifest: Option<String>,
    sha256: Option<String>,
}

/// Parse manifest `content`; `origin` names the file in error messages.
pub fn parse_manifest(content: &str, origin: &str) -> Result<Vec<DeclaredDependency>> {
    let raw: RawManifest = toml::from_str(content).map_err(|e| Error::MalformedManifest {
        path: origin.to_string(),
        message: e.message().to_string(),
    })?;

    raw.deps
        .into_iter()
        .map(|(path, dep)| declared(origin, path, dep))
        .collect()
}

fn declared(origin: &str, path: String, dep: RawDependency) -> Result<DeclaredDependency> {
    let malformed = |message: String| Error::MalformedManifest {
        path: origin.to_string(),
        message: format!("deps.\"{}\": {}", path, message),
    };

    let (kind, vcs) = match dep.kind.as_deref().unwrap_or("git") {
        "git" => (DependencyKind::SourceCheckout, VcsKind::Git),
        "archive" => (DependencyKind::OpaqueBinary, VcsKind::Archive),
        other => {
            return Err(Error::UnsupportedKind {
                path: format!("{} (deps.\"{}\")", origin, path),
                kind: other.to_string(),
            });
        }
    };

    if dep.url.trim().is_empty() {
        return Err(malformed("url is empty".into()));
    }

    let refs = [&dep.branch, &dep.tag, &dep.commit]
        .iter()
        .filter(|r| r.is_some())
        .count();
    if refs > 1 {
        return Err(malformed(
            "at most one of branch, tag and commit may be given".into(),
        ));
    }

    let revision = match kind {
        DependencyKind::SourceCheckout => {
            if dep.sha256.is_some() {
                return Err(malformed("sha256 is only valid for archives".into()));
            }
            match (dep.branch, dep.tag, dep.commit) {
                (Some(branch), _, _) => RevisionSpec::Branch(branch),
                (_, Some(tag), _) => RevisionSpec::Tag(tag),
                (_, _, Some(commit)) if is_commit_id(&commit) => {
                    RevisionSpec::Commit(commit.to_ascii_lowercase())
                }
                (_, _, Some(commit)) => {
                    return Err(malformed(format!("'{}' is not a commit id", commit)));
                }
                (None, None, None) => RevisionSpec::Default,
            }
        }
        DependencyKind::OpaqueBinary => {
            if refs > 0 || dep.manifest.is_some() {
                return Err(malformed(
                    "archives take no branch, tag, commit or manifest".into(),
                ));
            }
            match &dep.sha256 {
                Some(digest) => RevisionSpec::Digest(depsync_fs::checksum::canonical_hex(digest)),
                None => RevisionSpec::Default,
            }
        }
    };

    Ok(DeclaredDependency {
        name: dep.name.unwrap_or_else(|| path.clone()),
        path,
        locator: SourceLocator::new(vcs, dep.url),
        revision,
        kind,
        manifest: dep
            .manifest
            .unwrap_or_else(|| DepsyncPath::DefaultManifest.as_str().to_string()),
        digest: dep.sha256.map(|d| depsync_fs::checksum::canonical_hex(&d)),
    })
}
