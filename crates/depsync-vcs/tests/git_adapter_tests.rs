//! Tests for the git adapter against real repositories

use std::fs;

use depsync_test_utils::git::{commit_file, create_branch, real_git_repo_with_commit, switch_branch, tag};
use depsync_vcs::{Error, GitAdapter, RevisionSpec, SourceLocator, VersionControl};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    upstream: std::path::PathBuf,
    dest: std::path::PathBuf,
    initial: String,
}

fn setup() -> Fixture {
    let temp = TempDir::new().unwrap();
    let upstream = temp.path().join("upstream");
    let initial = real_git_repo_with_commit(&upstream);
    let dest = temp.path().join("work").join("dep");
    Fixture {
        _temp: temp,
        upstream,
        dest,
        initial,
    }
}

fn locator(fixture: &Fixture) -> SourceLocator {
    SourceLocator::git(fixture.upstream.to_string_lossy())
}

#[test]
fn test_clone_then_checkout_default() {
    let fx = setup();
    let git = GitAdapter::new();

    git.clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest).unwrap();
    assert!(git.is_checkout(&fx.dest));

    let id = git.checkout(&fx.dest, &RevisionSpec::Default).unwrap();
    assert_eq!(id, fx.initial);
    assert_eq!(git.current_revision(&fx.dest).unwrap(), fx.initial);
    assert!(fx.dest.join("README.md").exists());
}

#[test]
fn test_clone_into_occupied_destination_fails() {
    let fx = setup();
    fs::create_dir_all(&fx.dest).unwrap();
    fs::write(fx.dest.join("stray.txt"), "x").unwrap();

    let err = GitAdapter::new()
        .clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest)
        .unwrap_err();
    assert!(matches!(err, Error::DestinationOccupied { .. }), "got {err}");
}

#[rstest]
#[case::tag(RevisionSpec::Tag("v1".into()))]
#[case::branch(RevisionSpec::Branch("release".into()))]
fn test_checkout_named_refs(#[case] revision: RevisionSpec) {
    let fx = setup();
    tag(&fx.upstream, "v1");
    create_branch(&fx.upstream, "release");
    switch_branch(&fx.upstream, "main");
    let later = commit_file(&fx.upstream, "later.txt", "later", "Later");

    let git = GitAdapter::new();
    git.clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest).unwrap();
    let id = git.checkout(&fx.dest, &revision).unwrap();

    assert_eq!(id, fx.initial);
    assert!(!fx.dest.join("later.txt").exists());

    let head = git.checkout(&fx.dest, &RevisionSpec::Branch("main".into())).unwrap();
    assert_eq!(head, later);
    assert!(fx.dest.join("later.txt").exists());
}

#[test]
fn test_checkout_abbreviated_commit() {
    let fx = setup();
    let second = commit_file(&fx.upstream, "a.txt", "a", "Second");

    let git = GitAdapter::new();
    git.clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest).unwrap();

    let id = git
        .checkout(&fx.dest, &RevisionSpec::Commit(fx.initial[..10].to_string()))
        .unwrap();
    assert_eq!(id, fx.initial);

    let id = git
        .checkout(&fx.dest, &RevisionSpec::Commit(second.clone()))
        .unwrap();
    assert_eq!(id, second);
}

#[test]
fn test_fetch_brings_new_commits() {
    let fx = setup();
    let git = GitAdapter::new();
    git.clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest).unwrap();
    git.checkout(&fx.dest, &RevisionSpec::Default).unwrap();

    let newer = commit_file(&fx.upstream, "new.txt", "new", "Newer");
    tag(&fx.upstream, "v2");

    git.fetch(&fx.dest).unwrap();
    let id = git.checkout(&fx.dest, &RevisionSpec::Branch("main".into())).unwrap();
    assert_eq!(id, newer);
    let id = git.checkout(&fx.dest, &RevisionSpec::Tag("v2".into())).unwrap();
    assert_eq!(id, newer);

    // Fetching again with nothing new is not an error
    git.fetch(&fx.dest).unwrap();
}

#[test]
fn test_unknown_revision_is_reported() {
    let fx = setup();
    let git = GitAdapter::new();
    git.clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest).unwrap();

    let err = git
        .checkout(&fx.dest, &RevisionSpec::Branch("nope".into()))
        .unwrap_err();
    assert!(matches!(err, Error::RevisionNotFound { .. }), "got {err}");

    let err = git
        .checkout(&fx.dest, &RevisionSpec::Digest("00".into()))
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedRevision { .. }), "got {err}");
}

#[test]
fn test_local_modifications() {
    let fx = setup();
    let git = GitAdapter::new();
    git.clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest).unwrap();
    git.checkout(&fx.dest, &RevisionSpec::Default).unwrap();
    assert!(!git.has_local_modifications(&fx.dest).unwrap());

    // A nested managed checkout is not a modification of the parent
    real_git_repo_with_commit(&fx.dest.join("nested"));
    assert!(!git.has_local_modifications(&fx.dest).unwrap());

    fs::write(fx.dest.join("README.md"), "edited").unwrap();
    assert!(git.has_local_modifications(&fx.dest).unwrap());

    // Checkout discards tracked edits
    git.checkout(&fx.dest, &RevisionSpec::Default).unwrap();
    assert!(!git.has_local_modifications(&fx.dest).unwrap());

    fs::write(fx.dest.join("untracked.txt"), "new").unwrap();
    assert!(git.has_local_modifications(&fx.dest).unwrap());
}

#[test]
fn test_source_url_and_missing_checkout() {
    let fx = setup();
    let git = GitAdapter::new();
    assert!(!git.is_checkout(&fx.dest));
    assert!(matches!(
        git.current_revision(&fx.dest),
        Err(Error::NotACheckout { .. })
    ));

    git.clone_source(&locator(&fx), &RevisionSpec::Default, &fx.dest).unwrap();
    let url = git.source_url(&fx.dest).unwrap().unwrap();
    assert!(locator(&fx).same_url(&url), "unexpected url {url}");
}

#[test]
fn test_shallow_clone_still_reaches_older_commits() {
    let fx = setup();
    let later = commit_file(&fx.upstream, "later.txt", "later", "Later");
    let pinned = RevisionSpec::Commit(fx.initial.clone());

    let git = GitAdapter::new().shallow(true);
    git.clone_source(&locator(&fx), &pinned, &fx.dest).unwrap();
    assert_eq!(git.checkout(&fx.dest, &pinned).unwrap(), fx.initial);
    assert!(!fx.dest.join("later.txt").exists());

    git.fetch(&fx.dest).unwrap();
    let head = git.checkout(&fx.dest, &RevisionSpec::Branch("main".into())).unwrap();
    assert_eq!(head, later);
}
