//! Configuration file schema
//!
//! ```toml
//! [[solutions]]
//! name = "app"
//! url = "https://example.com/app.git"
//! branch = "main"
//!
//! [sync]
//! jobs = 4
//! max_passes = 8
//! shallow = true
//!
//! [rewrites]
//! "https://github.com/" = "https://mirror.internal/github/"
//! ```

use depsync_fs::{DepsyncPath, NormalizedPath, RelativePath};
use depsync_vcs::{RevisionSpec, SourceLocator, is_commit_id};
use serde::{Deserialize, Serialize};

use super::Rewrites;
use crate::model::Solution;
use crate::{Error, Result};

/// One configuration file as written. Every layer shares this schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solutions: Vec<SolutionConfig>,
    #[serde(default)]
    pub sync: SettingsLayer,
    #[serde(default, skip_serializing_if = "Rewrites::is_empty")]
    pub rewrites: Rewrites,
}

impl ConfigFile {
    pub fn parse(content: &str, source_name: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::InvalidConfig {
            source_name: source_name.to_string(),
            message: e.message().to_string(),
        })
    }
}

/// A `[[solutions]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolutionConfig {
    pub name: String,
    /// Checkout location relative to the managed root; defaults to `name`
    pub path: Option<String>,
    pub url: String,
    pub branch: Option<String>,
    pub tag: Option<String>,
    pub commit: Option<String>,
    /// Manifest file name; defaults to `DEPS`
    pub manifest: Option<String>,
}

impl SolutionConfig {
    /// Validate and convert into a [`Solution`], applying `rewrites` to its URL.
    pub fn to_solution(&self, rewrites: &Rewrites) -> Result<Solution> {
        let invalid = |message: String| Error::InvalidConfig {
            source_name: format!("solution '{}'", self.name),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if self.url.trim().is_empty() {
            return Err(invalid("url is empty".into()));
        }

        let raw_path = self.path.as_deref().unwrap_or(&self.name);
        let path = RelativePath::parse(raw_path).map_err(|e| match e {
            depsync_fs::Error::PathEscape { .. } => Error::SolutionPathEscape {
                name: self.name.clone(),
                path: raw_path.to_string(),
            },
            other => invalid(other.to_string()),
        })?;

        let revision = match (&self.branch, &self.tag, &self.commit) {
            (None, None, None) => RevisionSpec::Default,
            (Some(branch), None, None) => RevisionSpec::Branch(branch.clone()),
            (None, Some(tag), None) => RevisionSpec::Tag(tag.clone()),
            (None, None, Some(commit)) if is_commit_id(commit) => {
                RevisionSpec::Commit(commit.to_ascii_lowercase())
            }
            (None, None, Some(commit)) => {
                return Err(invalid(format!("'{}' is not a commit id", commit)));
            }
            _ => {
                return Err(invalid(
                    "at most one of branch, tag and commit may be given".into(),
                ));
            }
        };

        Ok(Solution {
            name: self.name.clone(),
            path,
            locator: SourceLocator::git(rewrites.apply(&self.url)),
            manifest: self
                .manifest
                .clone()
                .unwrap_or_else(|| DepsyncPath::DefaultManifest.as_str().to_string()),
            revision,
        })
    }
}

/// A partial `[sync]` table; unset keys fall through to earlier layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsLayer {
    pub jobs: Option<usize>,
    pub max_passes: Option<usize>,
    pub recursive: Option<bool>,
    pub force: Option<bool>,
    pub ignore_in_git: Option<bool>,
    pub shallow: Option<bool>,
    pub strict: Option<bool>,
}

/// Effective synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Worker threads for manifest reads and VCS operations
    pub jobs: usize,
    /// Pass budget of the fixed-point driver
    pub max_passes: usize,
    /// Descend into the manifests of source checkouts
    pub recursive: bool,
    /// Re-run VCS operations even when the state says nothing changed
    pub force: bool,
    /// Add synced paths to the enclosing Solution's `.git/info/exclude`
    pub ignore_in_git: bool,
    /// Clone git sources without history
    pub shallow: bool,
    /// Treat version conflicts as fatal instead of skipping the node
    pub strict: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_passes: 8,
            recursive: true,
            force: false,
            ignore_in_git: true,
            shallow: false,
            strict: false,
        }
    }
}

impl SyncSettings {
    /// Override every key set in `layer`.
    pub fn apply(&mut self, layer: &SettingsLayer) {
        if let Some(jobs) = layer.jobs {
            self.jobs = jobs;
        }
        if let Some(max_passes) = layer.max_passes {
            self.max_passes = max_passes;
        }
        if let Some(recursive) = layer.recursive {
            self.recursive = recursive;
        }
        if let Some(force) = layer.force {
            self.force = force;
        }
        if let Some(ignore_in_git) = layer.ignore_in_git {
            self.ignore_in_git = ignore_in_git;
        }
        if let Some(shallow) = layer.shallow {
            self.shallow = shallow;
        }
        if let Some(strict) = layer.strict {
            self.strict = strict;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(Error::InvalidConfig {
                source_name: "sync".into(),
                message: "jobs must be at least 1".into(),
            });
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidConfig {
                source_name: "sync".into(),
                message: "max_passes must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// The resolved, immutable configuration of one managed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub root: NormalizedPath,
    pub solutions: Vec<Solution>,
    pub sync: SyncSettings,
    pub rewrites: Rewrites,
}

impl WorkspaceConfig {
    /// Location of the state file under this root.
    pub fn state_path(&self) -> NormalizedPath {
        self.root
            .join(DepsyncPath::ConfigDir.as_str())
            .join(DepsyncPath::StateFile.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(name: &str) -> SolutionConfig {
        SolutionConfig {
            name: name.into(),
            url: "https://example.com/app.git".into(),
            ..Default::default()
        }
    }

    #[test]
    fn solution_defaults() {
        let solution = solution("app").to_solution(&Rewrites::default()).unwrap();
        assert_eq!(solution.path.as_str(), "app");
        assert_eq!(solution.manifest, "DEPS");
        assert_eq!(solution.revision, RevisionSpec::Default);
    }

    #[test]
    fn solution_path_escape_is_fatal() {
        let mut config = solution("app");
        config.path = Some("../outside".into());
        let err = config.to_solution(&Rewrites::default()).unwrap_err();
        assert!(matches!(err, Error::SolutionPathEscape { .. }));
    }

    #[test]
    fn solution_rejects_two_revisions() {
        let mut config = solution("app");
        config.branch = Some("main".into());
        config.tag = Some("v1".into());
        assert!(config.to_solution(&Rewrites::default()).is_err());
    }

    #[test]
    fn layer_overrides_only_set_keys() {
        let mut settings = SyncSettings {
            jobs: 2,
            ..Default::default()
        };
        settings.apply(&SettingsLayer {
            max_passes: Some(3),
            ..Default::default()
        });
        assert_eq!(settings.jobs, 2);
        assert_eq!(settings.max_passes, 3);
        assert!(settings.recursive);
        assert!(!settings.shallow);

        settings.apply(&SettingsLayer {
            shallow: Some(true),
            strict: Some(true),
            ..Default::default()
        });
        assert!(settings.shallow && settings.strict);
        assert_eq!(settings.max_passes, 3);
    }
}
