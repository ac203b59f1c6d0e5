//! Loaded projects and deferred persistence
//!
//! Every project touched during a run lives here. Mutations mark the owning
//! project dirty; target removals are queued and only applied once every
//! graph of the run has been injected, so targets stay readable until then.

use crate::error::{CacheError, CacheResult};
use crate::project::model::{normalize_path, Project, Target, TargetId};
use crate::project::store::ProjectStore;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Set of loaded projects backed by a store
pub struct Workspace {
    store: Box<dyn ProjectStore>,
    projects: Vec<Project>,
    dirty: BTreeSet<PathBuf>,
    pending_removals: Vec<TargetId>,
}

impl Workspace {
    /// Empty workspace
    pub fn new(store: Box<dyn ProjectStore>) -> Self {
        Self {
            store,
            projects: Vec::new(),
            dirty: BTreeSet::new(),
            pending_removals: Vec::new(),
        }
    }

    /// Workspace with the given top-level projects loaded
    pub fn open(store: Box<dyn ProjectStore>, paths: &[PathBuf]) -> CacheResult<Self> {
        let mut workspace = Self::new(store);
        for path in paths {
            workspace.ensure_loaded(path)?;
        }
        Ok(workspace)
    }

    /// Load a project unless it is already loaded; returns its normalized path
    pub fn ensure_loaded(&mut self, path: &Path) -> CacheResult<PathBuf> {
        let path = normalize_path(path);
        if self.project(&path).is_none() {
            let mut project = self.store.open(&path)?;
            project.path = path.clone();
            self.projects.push(project);
        }
        Ok(path)
    }

    /// Add an in-memory project (replacing one with the same path)
    pub fn insert(&mut self, mut project: Project) {
        project.path = normalize_path(&project.path);
        self.projects.retain(|p| p.path != project.path);
        self.projects.push(project);
    }

    pub fn project(&self, path: &Path) -> Option<&Project> {
        self.projects.iter().find(|p| p.path == path)
    }

    /// Mutable project access; marks the project for saving
    pub fn project_mut(&mut self, path: &Path) -> Option<&mut Project> {
        let project = self.projects.iter_mut().find(|p| p.path == path)?;
        self.dirty.insert(project.path.clone());
        Some(project)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    pub fn target(&self, id: &TargetId) -> Option<&Target> {
        self.project(&id.project)?.target(&id.uuid)
    }

    pub fn require_target(&self, id: &TargetId) -> CacheResult<&Target> {
        self.target(id)
            .ok_or_else(|| CacheError::TargetNotFound(id.to_string()))
    }

    /// Mutable target access; marks the owning project for saving
    pub fn target_mut(&mut self, id: &TargetId) -> CacheResult<&mut Target> {
        self.project_mut(&id.project)
            .and_then(|p| p.target_mut(&id.uuid))
            .ok_or_else(|| CacheError::TargetNotFound(id.to_string()))
    }

    /// Schedule a target for deletion by [`Workspace::apply_removals`]
    pub fn queue_target_removal(&mut self, id: &TargetId) {
        if !self.pending_removals.contains(id) {
            debug!("Queueing removal of {}", id);
            self.pending_removals.push(id.clone());
        }
    }

    pub fn is_removal_queued(&self, id: &TargetId) -> bool {
        self.pending_removals.contains(id)
    }

    /// Delete every queued target from its project
    ///
    /// Removals wait until the whole run is done: later graphs may still
    /// resolve through a target that an earlier consumer stopped using.
    pub fn apply_removals(&mut self) -> usize {
        let removals = std::mem::take(&mut self.pending_removals);
        for id in &removals {
            if let Some(project) = self.projects.iter_mut().find(|p| p.path == id.project) {
                project.targets.retain(|t| t.uuid != id.uuid);
                self.dirty.insert(project.path.clone());
            }
            // Schemes of any project may build the removed target
            for project in &mut self.projects {
                let mut touched = false;
                for scheme in &mut project.schemes {
                    let before = scheme.build_entries.len();
                    scheme.build_entries.retain(|e| e.target_uuid != id.uuid);
                    touched |= scheme.build_entries.len() != before;
                }
                if touched {
                    self.dirty.insert(project.path.clone());
                }
            }
        }
        info!("Removed {} prebuilt target(s)", removals.len());
        removals.len()
    }

    /// Persist every modified project
    pub fn save(&mut self) -> CacheResult<usize> {
        let dirty = std::mem::take(&mut self.dirty);
        for path in &dirty {
            if let Some(project) = self.project(path) {
                self.store.save(project)?;
            }
        }

        info!("Updated {} project(s)", dirty.len());
        Ok(dirty.len())
    }
}
