//! Layered configuration
//!
//! - **settings**: the `[[solutions]]`, `[sync]` and `[rewrites]` schema
//! - **resolver**: merge of global, workspace, local and environment layers
//! - **rewrite**: URL replacement applied to every declared locator

mod resolver;
mod rewrite;
mod settings;

pub use resolver::{ConfigResolver, ENV_FORCE, ENV_JOBS, ENV_MAX_PASSES};
pub use rewrite::Rewrites;
pub use settings::{ConfigFile, SettingsLayer, SolutionConfig, SyncSettings, WorkspaceConfig};
