//! Git repository fixtures.
//!
//! Choose the lowest-realism fixture that satisfies your test's needs.
//! Real repositories are slower and require a `git` binary on `PATH`.

use std::fs;
use std::path::Path;
use std::process::Command;

/// Run `git` in `path`, returning trimmed stdout.
///
/// # Panics
/// Panics if the command cannot be spawned or exits unsuccessfully.
pub fn git(path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .unwrap_or_else(|e| panic!("git: failed to run `git {args:?}`: {e}"));
    if !output.status.success() {
        panic!(
            "git: `git {args:?}` failed in {}:\n{}",
            path.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Initialises a real git repository with an initial commit on `main`.
///
/// Realism level: **REAL WITH HISTORY**.
///
/// # Panics
/// Panics if any git operation fails.
pub fn real_git_repo_with_commit(path: &Path) -> String {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("real_git_repo_with_commit: failed to create dir: {e}"));

    git(path, &["init", "--initial-branch=main"]);
    git(path, &["config", "user.email", "test@test.com"]);
    git(path, &["config", "user.name", "Test User"]);
    git(path, &["config", "commit.gpgsign", "false"]);

    commit_file(path, "README.md", "# Test", "Initial commit")
}

/// Write `file` with `content` and commit it. Returns the new commit id.
///
/// # Panics
/// Panics if the write or any git operation fails.
pub fn commit_file(repo: &Path, file: &str, content: &str, message: &str) -> String {
    let target = repo.join(file);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("commit_file: failed to create {}: {e}", parent.display()));
    }
    fs::write(&target, content)
        .unwrap_or_else(|e| panic!("commit_file: failed to write {}: {e}", target.display()));
    git(repo, &["add", file]);
    git(repo, &["commit", "-m", message]);
    head_commit(repo)
}

/// The full id of the commit `HEAD` points at.
pub fn head_commit(repo: &Path) -> String {
    git(repo, &["rev-parse", "HEAD"])
}

/// Create a lightweight tag at `HEAD`.
pub fn tag(repo: &Path, name: &str) {
    git(repo, &["tag", name]);
}

/// Create `name` at `HEAD` and switch to it.
pub fn create_branch(repo: &Path, name: &str) {
    git(repo, &["checkout", "-b", name]);
}

/// Switch to an existing branch.
pub fn switch_branch(repo: &Path, name: &str) {
    git(repo, &["checkout", name]);
}
