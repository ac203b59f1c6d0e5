//! xccache - build-avoidance cache for Xcode build graphs
//!
//! Fingerprints every target of a dependency graph, reuses prebuilt
//! artifacts whose fingerprint is already stored and rewrites the consuming
//! targets so the toolchain links the artifacts instead of rebuilding them.

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod injection;
pub mod project;
pub mod runner;
pub mod settings;

pub use error::{CacheError, CacheResult};
