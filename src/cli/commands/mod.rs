//! CLI command implementations

pub mod config;
pub mod graph;
pub mod inject;

pub use config::execute as config;
pub use graph::execute as graph;
pub use inject::execute as inject;

use crate::build::Xcodebuild;
use crate::cache::LocalStorage;
use crate::config::{BuildConfig, Config, ConfigManager};
use crate::error::CacheResult;
use crate::graph::{GraphBuilder, TargetResolver};
use crate::project::{JsonProjectStore, Workspace};
use crate::runner::Runner;
use crate::settings::SettingsLoader;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Command line values taking precedence over the cache file
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub storage: Option<PathBuf>,
    pub destination: Option<String>,
}

/// Wire a runner for the selected configuration
pub(crate) fn prepare_runner(
    manager: &ConfigManager,
    config: &Config,
    configuration: &BuildConfig,
    overrides: Overrides,
) -> CacheResult<Runner> {
    let projects: Vec<PathBuf> = config.projects.iter().map(|p| manager.resolve(p)).collect();
    let derived_data = manager.resolve(&config.settings.derived_data_path);
    let storage = overrides
        .storage
        .unwrap_or_else(|| manager.resolve(&config.storage.path));
    let destination = overrides
        .destination
        .unwrap_or_else(|| config.settings.destination.clone());
    debug!(
        "Using store {} and derived data {}",
        storage.display(),
        derived_data.display()
    );

    let xcodebuild = Xcodebuild::new(
        &configuration.build_configuration,
        destination,
        &configuration.action,
        &configuration.xcodebuild_args,
    );
    let workspace = Workspace::open(Box::new(JsonProjectStore), &projects)?;
    let builder = GraphBuilder::new(
        TargetResolver::new(&projects),
        SettingsLoader::new(Arc::new(xcodebuild.clone())),
    );
    let store = LocalStorage::new(storage).with_debug_manifest(config.storage.debug_manifest);

    Ok(Runner::new(
        workspace,
        builder,
        Box::new(store),
        Box::new(xcodebuild),
        &configuration.build_configuration,
        derived_data,
    ))
}
