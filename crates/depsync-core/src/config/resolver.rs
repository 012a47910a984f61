//! Configuration resolution with hierarchical merge
//!
//! The `ConfigResolver` loads and merges configuration from multiple sources
//! in a defined hierarchy, with later sources overriding earlier ones.

use std::collections::BTreeMap;
use std::path::PathBuf;

use depsync_fs::{DepsyncPath, NormalizedPath};

use super::{ConfigFile, Rewrites, SettingsLayer, SolutionConfig, SyncSettings, WorkspaceConfig};
use crate::{Error, Result};

/// Overrides `sync.jobs`
pub const ENV_JOBS: &str = "DEPSYNC_JOBS";
/// Overrides `sync.max_passes`
pub const ENV_MAX_PASSES: &str = "DEPSYNC_MAX_PASSES";
/// Overrides `sync.force`
pub const ENV_FORCE: &str = "DEPSYNC_FORCE";

/// Resolves configuration by merging multiple sources
///
/// Configuration is loaded from a hierarchy of sources:
/// 1. Global defaults (`<config_dir>/depsync/config.toml`), settings and rewrites only
/// 2. Workspace config (`.depsync/config.toml`), required
/// 3. Local overrides (`.depsync/config.local.toml`), git-ignored
/// 4. Environment (`DEPSYNC_JOBS`, `DEPSYNC_MAX_PASSES`, `DEPSYNC_FORCE`)
pub struct ConfigResolver {
    /// Managed root directory
    root: NormalizedPath,

    /// Override for the global config directory (used for testing).
    /// When `None`, the platform-appropriate directory is used via `dirs::config_dir()`.
    global_config_dir_override: Option<PathBuf>,

    /// Fixed environment (used for testing). When `None`, the process
    /// environment is read.
    env_override: Option<BTreeMap<String, String>>,
}

impl ConfigResolver {
    pub fn new(root: NormalizedPath) -> Self {
        Self {
            root,
            global_config_dir_override: None,
            env_override: None,
        }
    }

    /// Use `dir` instead of the platform config directory.
    pub fn with_global_config_dir(mut self, dir: PathBuf) -> Self {
        self.global_config_dir_override = Some(dir);
        self
    }

    /// Read environment overrides from `vars` instead of the process.
    pub fn with_env(mut self, vars: BTreeMap<String, String>) -> Self {
        self.env_override = Some(vars);
        self
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("depsync"))
    }

    fn env_var(&self, name: &str) -> Option<String> {
        match &self.env_override {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn config_path(&self) -> NormalizedPath {
        self.root
            .join(DepsyncPath::ConfigDir.as_str())
            .join(DepsyncPath::ConfigFile.as_str())
    }

    pub fn local_config_path(&self) -> NormalizedPath {
        self.root
            .join(DepsyncPath::ConfigDir.as_str())
            .join(DepsyncPath::LocalConfigFile.as_str())
    }

    /// Check if a workspace configuration exists
    pub fn has_config(&self) -> bool {
        self.config_path().is_file()
    }

    fn read_layer(path: &NormalizedPath) -> Result<Option<ConfigFile>> {
        match depsync_fs::io::read_text_if_exists(path)? {
            Some(content) => ConfigFile::parse(&content, path.as_str()).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve the configuration by merging all layers.
    ///
    /// Missing optional layers are skipped. A missing workspace config is a
    /// [`Error::ConfigNotFound`]; invalid TOML in any layer is an error.
    pub fn resolve(&self) -> Result<WorkspaceConfig> {
        let mut settings = SyncSettings::default();
        let mut rewrites = Rewrites::default();
        let mut solutions: Vec<SolutionConfig> = Vec::new();

        // Layer 1 - Global defaults
        if let Some(global_dir) = self.global_config_dir() {
            let global_path = NormalizedPath::new(global_dir.join("config.toml"));
            match Self::read_layer(&global_path)? {
                Some(global) => {
                    tracing::debug!(%global_path, "Loading global config (layer 1)");
                    if !global.solutions.is_empty() {
                        return Err(Error::InvalidConfig {
                            source_name: global_path.to_string(),
                            message: "solutions belong in the workspace config".into(),
                        });
                    }
                    settings.apply(&global.sync);
                    rewrites.extend(&global.rewrites);
                }
                None => tracing::debug!(%global_path, "No global config found (layer 1), skipping"),
            }
        }

        // Layer 2 - Workspace config
        let workspace_path = self.config_path();
        let workspace = Self::read_layer(&workspace_path)?.ok_or_else(|| Error::ConfigNotFound {
            path: workspace_path.to_native(),
        })?;
        tracing::debug!(%workspace_path, "Loading workspace config (layer 2)");
        settings.apply(&workspace.sync);
        rewrites.extend(&workspace.rewrites);
        solutions.extend(workspace.solutions);

        // Layer 3 - Local overrides; solutions replace same-named entries
        let local_path = self.local_config_path();
        if let Some(local) = Self::read_layer(&local_path)? {
            tracing::debug!(%local_path, "Loading local config (layer 3)");
            settings.apply(&local.sync);
            rewrites.extend(&local.rewrites);
            for solution in local.solutions {
                match solutions.iter_mut().find(|s| s.name == solution.name) {
                    Some(existing) => *existing = solution,
                    None => solutions.push(solution),
                }
            }
        }

        // Layer 4 - Environment
        settings.apply(&self.env_layer()?);
        settings.validate()?;

        let solutions = solutions
            .iter()
            .map(|s| s.to_solution(&rewrites))
            .collect::<Result<Vec<_>>>()?;

        for (i, a) in solutions.iter().enumerate() {
            if let Some(b) = solutions[i + 1..].iter().find(|b| b.path.overlaps(&a.path)) {
                if b.path == a.path {
                    return Err(Error::InvalidConfig {
                        source_name: workspace_path.to_string(),
                        message: format!(
                            "solutions '{}' and '{}' share the path '{}'",
                            a.name, b.name, a.path
                        ),
                    });
                }
                tracing::debug!(outer = %a.path, inner = %b.path, "Nested solutions");
            }
        }

        Ok(WorkspaceConfig {
            root: self.root.clone(),
            solutions,
            sync: settings,
            rewrites,
        })
    }

    fn env_layer(&self) -> Result<SettingsLayer> {
        fn invalid(name: &str, value: &str) -> Error {
            Error::InvalidConfig {
                source_name: name.to_string(),
                message: format!("unrecognized value '{}'", value),
            }
        }

        let parse_count = |name: &str| -> Result<Option<usize>> {
            self.env_var(name)
                .map(|value| value.trim().parse::<usize>().map_err(|_| invalid(name, &value)))
                .transpose()
        };

        let force = self
            .env_var(ENV_FORCE)
            .map(|value| match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" | "" => Ok(false),
                _ => Err(invalid(ENV_FORCE, &value)),
            })
            .transpose()?;

        Ok(SettingsLayer {
            jobs: parse_count(ENV_JOBS)?,
            max_passes: parse_count(ENV_MAX_PASSES)?,
            force,
            ..SettingsLayer::default()
        })
    }
}
