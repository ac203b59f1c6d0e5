//! Project persistence
//!
//! The file format is an external concern; the core talks to it through
//! [`ProjectStore`]. `JsonProjectStore` keeps one JSON document per project.

use crate::error::{CacheError, CacheResult};
use crate::project::model::Project;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Loads and persists projects
pub trait ProjectStore: Send + Sync {
    /// Load the project stored at `path`
    fn open(&self, path: &Path) -> CacheResult<Project>;

    /// Persist a project back to `project.path`
    fn save(&self, project: &Project) -> CacheResult<()>;
}

/// Store keeping each project as a JSON document
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonProjectStore;

impl JsonProjectStore {
    pub fn new() -> Self {
        Self
    }
}

impl ProjectStore for JsonProjectStore {
    fn open(&self, path: &Path) -> CacheResult<Project> {
        if !path.is_file() {
            return Err(CacheError::ProjectNotFound(path.to_path_buf()));
        }

        debug!("Opening project {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| CacheError::io(format!("reading project {}", path.display()), e))?;
        let mut project: Project = serde_json::from_str(&content)?;
        project.path = path.to_path_buf();
        Ok(project)
    }

    fn save(&self, project: &Project) -> CacheResult<()> {
        debug!("Saving project {}", project.path.display());
        let mut content = serde_json::to_string_pretty(project)?;
        content.push('\n');
        fs::write(&project.path, content).map_err(|e| {
            CacheError::io(format!("writing project {}", project.path.display()), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::model::Scheme;
    use tempfile::TempDir;

    #[test]
    fn open_missing_project() {
        let temp = TempDir::new().unwrap();
        let err = JsonProjectStore
            .open(&temp.path().join("Nope.json"))
            .unwrap_err();
        assert!(matches!(err, CacheError::ProjectNotFound(_)));
    }

    #[test]
    fn save_then_open_keeps_schemes_and_sets_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("App.json");
        let mut project = Project::new(&path);
        project.schemes.push(Scheme {
            name: "App".into(),
            build_entries: vec![],
        });

        JsonProjectStore.save(&project).unwrap();
        let loaded = JsonProjectStore.open(&path).unwrap();

        assert_eq!(loaded.path, path);
        assert_eq!(loaded.schemes.len(), 1);
    }
}
