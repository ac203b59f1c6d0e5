//! Cache file schema
//!
//! The cache file (`Cachefile` by default) is TOML:
//!
//! ```toml
//! projects = ["Pods/Pods.json", "App.json"]
//!
//! [[configurations]]
//! name = "debug"
//! build_configuration = "Debug"
//!
//! [storage]
//! path = "/var/cache/xccache"
//!
//! [[targets]]
//! name = "App"
//! dependencies = ["Pods-App"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project files of the workspace, relative to the cache file
    pub projects: Vec<PathBuf>,

    /// Named build configurations to inject for
    pub configurations: Vec<BuildConfig>,

    /// Toolchain settings
    pub settings: SettingsConfig,

    /// Artifact store settings
    pub storage: StorageConfig,

    /// Consumers and their cacheable dependencies
    pub targets: Vec<TargetConfig>,
}

impl Config {
    pub fn configuration(&self, name: &str) -> Option<&BuildConfig> {
        self.configurations.iter().find(|c| c.name == name)
    }
}

/// One selectable configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Name used on the command line
    pub name: String,

    /// Project build configuration, e.g. `Debug`
    pub build_configuration: String,

    /// Build action passed to xcodebuild
    pub action: String,

    /// Extra arguments for every xcodebuild call
    pub xcodebuild_args: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            name: "debug".to_string(),
            build_configuration: "Debug".to_string(),
            action: crate::build::ARCHIVE_ACTION.to_string(),
            xcodebuild_args: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Derived data directory, relative to the cache file
    pub derived_data_path: PathBuf,

    /// xcodebuild destination
    pub destination: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            derived_data_path: PathBuf::from("build"),
            destination: crate::build::GENERIC_DESTINATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the local artifact store
    pub path: PathBuf,

    /// Write a `.state` manifest next to every artifact
    pub debug_manifest: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("xccache"),
            debug_manifest: true,
        }
    }
}

/// Consumer target and the dependencies replaced by cached artifacts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub name: String,

    /// Names of cacheable dependency targets
    pub dependencies: Vec<String>,

    /// Generated script embedding frameworks, rewritten to the cache container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_frameworks_script: Option<PathBuf>,
}
