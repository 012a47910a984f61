//! Shared test utilities for the depsync workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`] — git repository fixtures backed by the `git` CLI
//! - [`workspace`] — [`TestWorkspace`](workspace::TestWorkspace) with upstream repositories and a managed root
//! - [`fake`] — [`RecordingVcs`](fake::RecordingVcs), a scripted in-memory adapter

pub mod fake;
pub mod git;
pub mod workspace;
