//! Filesystem primitives for depsync
//!
//! Provides managed-tree relative paths, atomic locked I/O and content
//! digests used by the synchronization engine and the VCS adapters.

pub mod checksum;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use constants::DepsyncPath;
pub use error::{Error, Result};
pub use path::{NormalizedPath, RelativePath};
