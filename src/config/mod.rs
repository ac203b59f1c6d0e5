//! Cache file loading

pub mod schema;

pub use schema::{BuildConfig, Config, SettingsConfig, StorageConfig, TargetConfig};

use crate::error::{CacheError, CacheResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default cache file name, looked up in the current directory
pub const DEFAULT_CACHEFILE: &str = "Cachefile";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CACHEFILE),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Load the cache file; it has to exist
    pub fn load(&self) -> CacheResult<Config> {
        if !self.config_path.is_file() {
            return Err(CacheError::ConfigNotFound(self.config_path.clone()));
        }

        self.load_from_file(&self.config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&self, path: &Path) -> CacheResult<Config> {
        debug!("Loading cache file {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| CacheError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> CacheResult<()> {
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CacheError::io(format!("creating {}", parent.display()), e))?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).map_err(|e| {
            CacheError::io(format!("writing config to {}", self.config_path.display()), e)
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Configuration named `name`
    pub fn select<'c>(&self, config: &'c Config, name: &str) -> CacheResult<&'c BuildConfig> {
        config.configuration(name).ok_or_else(|| {
            let known: Vec<&str> = config.configurations.iter().map(|c| c.name.as_str()).collect();
            CacheError::ConfigInvalid {
                path: self.config_path.clone(),
                reason: format!(
                    "configuration '{}' is not defined (known: {})",
                    name,
                    if known.is_empty() { "none".to_string() } else { known.join(", ") }
                ),
            }
        })
    }

    /// Path from the cache file resolved against the cache file's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        self.base_dir().join(path)
    }

    /// Configured targets with their script paths resolved like [`resolve`](Self::resolve)
    pub fn resolve_targets(&self, targets: &[TargetConfig]) -> Vec<TargetConfig> {
        targets
            .iter()
            .map(|target| TargetConfig {
                embed_frameworks_script: target
                    .embed_frameworks_script
                    .as_deref()
                    .map(|script| self.resolve(script)),
                ..target.clone()
            })
            .collect()
    }

    fn base_dir(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
