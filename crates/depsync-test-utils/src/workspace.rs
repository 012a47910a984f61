//! [`TestWorkspace`] builder for sync scenarios.
//!
//! Lays out a temporary directory with two halves: `upstreams/` holds real
//! git repositories acting as remotes, `work/` is the managed root that
//! `.depsync/config.toml` and the synced checkouts live in.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::git;

/// A temporary managed root plus upstream repositories.
///
/// # Example
///
/// ```rust,no_run
/// use depsync_test_utils::workspace::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// let app = ws.create_upstream("app");
/// ws.commit_upstream("app", "DEPS", "[deps]\n");
/// ws.write_config(&format!(
///     "[[solutions]]\nname = \"app\"\npath = \"app\"\nurl = \"{app}\"\n"
/// ));
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("work")).unwrap();
        fs::create_dir_all(temp_dir.path().join("upstreams")).unwrap();
        Self { temp_dir }
    }

    /// The managed root.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("work")
    }

    /// Location of the upstream repository `name`.
    pub fn upstream(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("upstreams").join(name)
    }

    /// URL the upstream `name` is cloned from.
    pub fn url(&self, name: &str) -> String {
        self.upstream(name).to_string_lossy().replace('\\', "/")
    }

    /// Create an upstream git repository with one commit. Returns its URL.
    pub fn create_upstream(&self, name: &str) -> String {
        git::real_git_repo_with_commit(&self.upstream(name));
        self.url(name)
    }

    /// Commit `file` into upstream `name`. Returns the new commit id.
    pub fn commit_upstream(&self, name: &str, file: &str, content: &str) -> String {
        git::commit_file(&self.upstream(name), file, content, &format!("Update {file}"))
    }

    /// Initialise the managed root itself as a git repository.
    pub fn init_git(&self) {
        git2::Repository::init(self.root())
            .expect("TestWorkspace::init_git: failed to init git repository");
    }

    /// Write `.depsync/config.toml`.
    pub fn write_config(&self, content: &str) {
        self.write_file(".depsync/config.toml", content);
    }

    /// Write `.depsync/config.local.toml`.
    pub fn write_local_config(&self, content: &str) {
        self.write_file(".depsync/config.local.toml", content);
    }

    /// Write a file relative to the managed root, creating parents.
    pub fn write_file(&self, path: &str, content: &str) {
        let target = self.root().join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, content).unwrap();
    }

    pub fn read_file(&self, path: &str) -> String {
        let full_path = self.root().join(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Assert that `path` (relative to the managed root) exists.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the managed root) does **not** exist.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` contains `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let file_content = self.read_file(path);
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            path,
            content,
            file_content
        );
    }
}

/// Head commit of the checkout at `path`.
pub fn checkout_head(path: &Path) -> String {
    git::head_commit(path)
}
