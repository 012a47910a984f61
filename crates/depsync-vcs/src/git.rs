//! Git adapter backed by libgit2
//!
//! Checkouts are always left on a detached HEAD at the resolved commit, so
//! the working copy never tracks a local branch that could diverge from the
//! remote.
//!
//! With shallow history enabled, clones and fetches ask for depth 1. Transports
//! without shallow support (local paths) fall back to a full clone, and a
//! pinned commit missing from a shallow history triggers one full fetch.

use std::path::Path;
use std::time::Duration;

use backoff::ExponentialBackoff;
use depsync_fs::DepsyncPath;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{AutotagOption, Commit, ErrorClass, FetchOptions, Repository, Status, StatusOptions};

use crate::{Error, Result, RevisionSpec, SourceLocator, VcsKind, VersionControl};

const REMOTE: &str = "origin";

const FETCH_REFSPECS: [&str; 2] = [
    "+refs/heads/*:refs/remotes/origin/*",
    "+refs/tags/*:refs/tags/*",
];

/// How long transient fetch failures are retried.
const RETRY_WINDOW: Duration = Duration::from_secs(30);

/// libgit2's depth value for converting a shallow repository to a full one.
const UNSHALLOW: i32 = i32::MAX;

/// [`VersionControl`] implementation for git repositories.
#[derive(Debug, Clone, Default)]
pub struct GitAdapter {
    shallow: bool,
}

impl GitAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only fetch the most recent commit of each ref.
    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }

    fn open(dest: &Path) -> Result<Repository> {
        Repository::open(dest).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::NotACheckout {
                    path: dest.to_path_buf(),
                }
            } else {
                Error::Git(e)
            }
        })
    }

    fn clone_with_depth(url: &str, dest: &Path, depth: Option<i32>) -> Result<()> {
        let mut options = FetchOptions::new();
        if let Some(depth) = depth {
            options.depth(depth);
        }
        RepoBuilder::new().fetch_options(options).clone(url, dest)?;
        Ok(())
    }

    fn fetch_once(repo: &Repository, dest: &Path, depth: Option<i32>) -> Result<()> {
        let mut remote = repo.find_remote(REMOTE).map_err(|_| Error::RemoteNotFound {
            name: REMOTE.to_string(),
            path: dest.to_path_buf(),
        })?;
        let mut options = FetchOptions::new();
        options.download_tags(AutotagOption::All);
        if let Some(depth) = depth {
            options.depth(depth);
        }
        remote.fetch(&FETCH_REFSPECS, Some(&mut options), None)?;
        Ok(())
    }

    /// Peel `revision` to the commit it designates in `repo`.
    fn resolve<'r>(repo: &'r Repository, dest: &Path, revision: &RevisionSpec) -> Result<Commit<'r>> {
        let not_found = || Error::RevisionNotFound {
            revision: revision.to_string(),
            path: dest.to_path_buf(),
        };

        match revision {
            RevisionSpec::Branch(branch) => {
                let remote_ref = format!("refs/remotes/{}/{}", REMOTE, branch);
                let local_ref = format!("refs/heads/{}", branch);
                repo.find_reference(&remote_ref)
                    .or_else(|_| repo.find_reference(&local_ref))
                    .and_then(|r| r.peel_to_commit())
                    .map_err(|_| not_found())
            }
            RevisionSpec::Tag(tag) => repo
                .find_reference(&format!("refs/tags/{}", tag))
                .and_then(|r| r.peel_to_commit())
                .map_err(|_| not_found()),
            RevisionSpec::Commit(id) => repo
                .revparse_single(id)
                .and_then(|object| object.peel_to_commit())
                .map_err(|_| not_found()),
            RevisionSpec::Default => {
                let candidates = [
                    format!("refs/remotes/{}/HEAD", REMOTE),
                    format!("refs/remotes/{}/main", REMOTE),
                    format!("refs/remotes/{}/master", REMOTE),
                    "HEAD".to_string(),
                ];
                candidates
                    .iter()
                    .find_map(|name| {
                        repo.find_reference(name)
                            .and_then(|r| r.resolve())
                            .and_then(|r| r.peel_to_commit())
                            .ok()
                    })
                    .ok_or_else(not_found)
            }
            RevisionSpec::Digest(_) => Err(Error::UnsupportedRevision {
                revision: revision.to_string(),
                kind: VcsKind::Git.to_string(),
            }),
        }
    }
}

/// Fetch errors worth retrying: network, transport and OS level failures.
fn is_transient(error: &git2::Error) -> bool {
    matches!(
        error.class(),
        ErrorClass::Net | ErrorClass::Os | ErrorClass::Ssl | ErrorClass::Http
    )
}

/// Untracked directories holding only managed checkouts (such as
/// `third_party/` around `third_party/lib`) do not count as modifications
/// of the enclosing repository.
fn is_nested_checkout(workdir: &Path, entry_path: &str) -> bool {
    holds_only_checkouts(&workdir.join(entry_path.trim_end_matches('/')))
}

fn holds_only_checkouts(dir: &Path) -> bool {
    if dir.join(DepsyncPath::GitDir).exists() || dir.join(DepsyncPath::ArchiveMarker).exists() {
        return true;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .all(|e| e.path().is_dir() && holds_only_checkouts(&e.path()))
}

impl VersionControl for GitAdapter {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn clone_source(&self, locator: &SourceLocator, _revision: &RevisionSpec, dest: &Path) -> Result<()> {
        if depsync_fs::io::is_non_empty_dir(dest) {
            return Err(Error::DestinationOccupied {
                path: dest.to_path_buf(),
            });
        }
        tracing::info!(url = %locator.url, dest = %dest.display(), shallow = self.shallow, "Cloning");
        if self.shallow {
            match Self::clone_with_depth(&locator.url, dest, Some(1)) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(url = %locator.url, error = %e, "Shallow clone unavailable, cloning full history");
                    depsync_fs::io::remove_all(dest)?;
                }
            }
        }
        Self::clone_with_depth(&locator.url, dest, None)
    }

    fn fetch(&self, dest: &Path) -> Result<()> {
        let repo = Self::open(dest)?;
        let depth = (self.shallow && repo.is_shallow()).then_some(1);
        tracing::info!(dest = %dest.display(), shallow = depth.is_some(), "Fetching");

        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_elapsed_time: Some(RETRY_WINDOW),
            ..ExponentialBackoff::default()
        };

        backoff::retry(policy, || {
            Self::fetch_once(&repo, dest, depth).map_err(|e| {
                if matches!(&e, Error::Git(inner) if is_transient(inner)) {
                    tracing::warn!(dest = %dest.display(), error = %e, "Fetch failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }

    fn checkout(&self, dest: &Path, revision: &RevisionSpec) -> Result<String> {
        let repo = Self::open(dest)?;
        let commit = match Self::resolve(&repo, dest, revision) {
            Err(Error::RevisionNotFound { .. }) if repo.is_shallow() => {
                tracing::info!(dest = %dest.display(), %revision, "Revision outside shallow history, fetching all of it");
                Self::fetch_once(&repo, dest, Some(UNSHALLOW))?;
                Self::resolve(&repo, dest, revision)?
            }
            resolved => resolved?,
        };

        // Update the tree before moving HEAD so a failed checkout leaves HEAD intact
        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
        repo.set_head_detached(commit.id())?;

        let id = commit.id().to_string();
        tracing::info!(dest = %dest.display(), %revision, commit = %id, "Checked out");
        Ok(id)
    }

    fn current_revision(&self, dest: &Path) -> Result<String> {
        let repo = Self::open(dest)?;
        let head = repo.head()?.peel_to_commit()?;
        Ok(head.id().to_string())
    }

    fn has_local_modifications(&self, dest: &Path) -> Result<bool> {
        let repo = Self::open(dest)?;
        let Some(workdir) = repo.workdir().map(Path::to_path_buf) else {
            return Ok(false);
        };

        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .include_ignored(false)
            .recurse_untracked_dirs(false);

        let statuses = repo.statuses(Some(&mut options))?;
        let modified = statuses.iter().any(|entry| {
            let status = entry.status();
            if status == Status::WT_NEW {
                return entry
                    .path()
                    .is_some_and(|p| !is_nested_checkout(&workdir, p));
            }
            !status.is_empty() && !status.contains(Status::IGNORED)
        });
        Ok(modified)
    }

    fn is_checkout(&self, dest: &Path) -> bool {
        dest.join(DepsyncPath::GitDir).exists() && Repository::open(dest).is_ok()
    }

    fn source_url(&self, dest: &Path) -> Result<Option<String>> {
        let repo = Self::open(dest)?;
        let url = match repo.find_remote(REMOTE) {
            Ok(remote) => remote.url().map(String::from),
            Err(_) => None,
        };
        Ok(url)
    }
}
