//! Keep synced dependency directories out of the enclosing repository's status.

use std::path::Path;

use depsync_fs::{DepsyncPath, NormalizedPath};

use crate::Result;

/// Append `paths` (relative to `repo_root`) to `.git/info/exclude`.
///
/// Entries already present are left alone. Returns how many lines were added.
/// A `repo_root` without a `.git` directory is ignored.
pub fn ignore_paths_in_git(repo_root: &Path, paths: &[String]) -> Result<usize> {
    let git_dir = repo_root.join(DepsyncPath::GitDir);
    if !git_dir.is_dir() {
        tracing::debug!(root = %repo_root.display(), "Not a git working copy, skipping exclude update");
        return Ok(0);
    }

    let exclude = NormalizedPath::new(git_dir.join("info").join("exclude"));
    let mut content = depsync_fs::io::read_text_if_exists(&exclude)?.unwrap_or_default();

    let mut added = 0;
    for path in paths {
        let entry = format!("/{}", path.trim_start_matches('/'));
        if content.lines().any(|line| line.trim() == entry) {
            continue;
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&entry);
        content.push('\n');
        added += 1;
    }

    if added > 0 {
        depsync_fs::io::write_atomic(&exclude, content.as_bytes())?;
        tracing::debug!(root = %repo_root.display(), added, "Updated git exclude");
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_each_path_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".git/info")).unwrap();
        std::fs::write(dir.path().join(".git/info/exclude"), "# comment").unwrap();

        let paths = vec!["third_party/zlib".to_string()];
        assert_eq!(ignore_paths_in_git(dir.path(), &paths).unwrap(), 1);
        assert_eq!(ignore_paths_in_git(dir.path(), &paths).unwrap(), 0);

        let content = std::fs::read_to_string(dir.path().join(".git/info/exclude")).unwrap();
        assert_eq!(content, "# comment\n/third_party/zlib\n");
    }

    #[test]
    fn non_repository_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec!["x".to_string()];
        assert_eq!(ignore_paths_in_git(dir.path(), &paths).unwrap(), 0);
    }
}
