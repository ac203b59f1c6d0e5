//! Toolchain invocation
//!
//! The core needs two things from the outside world: the raw build
//! settings of a project and a way to build one scheme. Both are traits so
//! tests and alternative toolchains can stand in for `xcodebuild`.

mod products;
mod shell;
mod xcodebuild;

pub use products::{copy_recursively, ProductExtractor};
pub use shell::ShellExecutor;
pub use xcodebuild::{Xcodebuild, ARCHIVE_ACTION, GENERIC_DESTINATION};

use crate::error::CacheResult;
use std::path::Path;

/// Source of raw per-project settings text
pub trait SettingsQuery: Send + Sync {
    /// Raw `-showBuildSettings` style output for every target of `project`
    fn load_build_settings(&self, project: &Path, platform: &str) -> CacheResult<String>;
}

/// One scheme build
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub project: &'a Path,
    pub scheme: &'a str,
    pub platform: &'a str,
    pub derived_data: &'a Path,
}

/// Runs the toolchain for a scheme
pub trait BuildInvoker {
    /// Returns whether the build succeeded
    fn build(&self, request: &BuildRequest<'_>) -> CacheResult<bool>;
}
