//! Parallel settings loading, one query per project and platform

use crate::build::SettingsQuery;
use crate::error::{CacheError, CacheResult};
use crate::settings::container::SettingsContainer;
use crate::settings::extractor::SettingsExtractor;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loads and memoizes per-target settings for project files
pub struct SettingsLoader {
    query: Arc<dyn SettingsQuery>,
    extractor: SettingsExtractor,
    settings: HashMap<(PathBuf, String), HashMap<String, SettingsContainer>>,
}

impl SettingsLoader {
    pub fn new(query: Arc<dyn SettingsQuery>) -> Self {
        Self {
            query,
            extractor: SettingsExtractor::default(),
            settings: HashMap::new(),
        }
    }

    /// Query settings for every path not loaded yet for `platform`
    ///
    /// Each pending project gets its own worker; the call returns once all
    /// of them finished. The first failure is returned.
    pub fn load(&mut self, project_paths: &[PathBuf], platform: &str) -> CacheResult<()> {
        let mut pending: Vec<&PathBuf> = project_paths
            .iter()
            .filter(|path| !self.settings.contains_key(&((*path).clone(), platform.to_string())))
            .collect();
        pending.sort();
        pending.dedup();

        if pending.is_empty() {
            return Ok(());
        }

        info!(
            "Loading {} build settings for {} project(s)",
            platform,
            pending.len()
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(pending.len())
            .build()
            .map_err(|e| CacheError::Internal(format!("settings worker pool: {}", e)))?;

        let query = self.query.as_ref();
        let extractor = &self.extractor;
        let loaded: Vec<(PathBuf, HashMap<String, SettingsContainer>)> = pool.install(|| {
            pending
                .par_iter()
                .map(|path| {
                    debug!("Querying build settings of {}", path.display());
                    let output = query.load_build_settings(path, platform)?;
                    Ok(((*path).clone(), extractor.extract_per_target(&output)))
                })
                .collect::<CacheResult<Vec<_>>>()
        })?;

        for (path, per_target) in loaded {
            debug!(
                "Loaded settings of {} target(s) from {}",
                per_target.len(),
                path.display()
            );
            self.settings.insert((path, platform.to_string()), per_target);
        }
        Ok(())
    }

    pub fn get(&self, project: &Path, platform: &str, target_name: &str) -> Option<&SettingsContainer> {
        self.settings
            .get(&(project.to_path_buf(), platform.to_string()))?
            .get(target_name)
    }

    /// Like [`get`](Self::get), but a missing entry is an error
    pub fn require(
        &self,
        project: &Path,
        platform: &str,
        target_name: &str,
    ) -> CacheResult<&SettingsContainer> {
        self.get(project, platform, target_name)
            .ok_or_else(|| CacheError::SettingsMissing {
                target: target_name.to_string(),
                project: project.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingQuery {
        calls: AtomicUsize,
    }

    impl SettingsQuery for CountingQuery {
        fn load_build_settings(&self, project: &Path, _platform: &str) -> CacheResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = project.file_stem().unwrap().to_string_lossy();
            Ok(format!(
                "Build settings for action build and target {name}:\n    TARGETNAME = {name}\n    ARCH = arm64\n"
            ))
        }
    }

    struct FailingQuery;

    impl SettingsQuery for FailingQuery {
        fn load_build_settings(&self, project: &Path, _platform: &str) -> CacheResult<String> {
            Err(CacheError::command_exec(
                format!("xcodebuild -project '{}'", project.display()),
                "boom",
            ))
        }
    }

    #[test]
    fn loads_each_project_once() {
        let query = Arc::new(CountingQuery {
            calls: AtomicUsize::new(0),
        });
        let mut loader = SettingsLoader::new(query.clone());
        let paths = vec![PathBuf::from("/p/Core.json"), PathBuf::from("/p/Ui.json")];

        loader.load(&paths, "iphoneos").unwrap();
        loader.load(&paths, "iphoneos").unwrap();

        assert_eq!(query.calls.load(Ordering::SeqCst), 2);
        let core = loader.get(Path::new("/p/Core.json"), "iphoneos", "Core").unwrap();
        assert_eq!(core.get("ARCH"), Some("arm64"));
        assert!(loader.get(Path::new("/p/Core.json"), "iphoneos", "Ui").is_none());
        assert!(loader.get(Path::new("/p/Core.json"), "watchos", "Core").is_none());
    }

    struct PlatformQuery;

    impl SettingsQuery for PlatformQuery {
        fn load_build_settings(&self, _project: &Path, platform: &str) -> CacheResult<String> {
            Ok(format!(
                "Build settings for action build and target Core:\n    PLATFORM_NAME = {platform}\n"
            ))
        }
    }

    #[test]
    fn settings_are_kept_per_platform() {
        let mut loader = SettingsLoader::new(Arc::new(PlatformQuery));
        let paths = vec![PathBuf::from("/p/Pods.json")];

        loader.load(&paths, "iphoneos").unwrap();
        loader.load(&paths, "watchos").unwrap();

        let ios = loader.require(Path::new("/p/Pods.json"), "iphoneos", "Core").unwrap();
        let watch = loader.require(Path::new("/p/Pods.json"), "watchos", "Core").unwrap();
        assert_eq!(ios.get("PLATFORM_NAME"), Some("iphoneos"));
        assert_eq!(watch.get("PLATFORM_NAME"), Some("watchos"));
    }

    #[test]
    fn query_failure_is_propagated() {
        let mut loader = SettingsLoader::new(Arc::new(FailingQuery));
        let err = loader
            .load(&[PathBuf::from("/p/App.json")], "iphoneos")
            .unwrap_err();
        assert!(err.to_string().contains("execution failed"));
    }

    #[test]
    fn missing_target_settings_is_an_error() {
        let loader = SettingsLoader::new(Arc::new(FailingQuery));
        let err = loader.require(Path::new("/p/App.json"), "iphoneos", "App").unwrap_err();
        assert!(matches!(err, CacheError::SettingsMissing { .. }));
    }
}
