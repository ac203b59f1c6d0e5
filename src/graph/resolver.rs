//! Target resolution across projects
//!
//! Maps dependency declarations and linked products to target identities.
//! Nested projects are flattened once; the flattened target list is cached
//! until [`TargetResolver::invalidate`] is called (after projects change).

use crate::error::{CacheError, CacheResult};
use crate::project::model::{file_name_of, normalize_path};
use crate::project::{BuildFile, FileReference, Target, TargetDependency, TargetId, Workspace};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default)]
struct TargetIndex {
    projects: Vec<PathBuf>,
    targets: Vec<TargetId>,
    by_product_uuid: HashMap<String, TargetId>,
}

/// Resolves targets within a set of root projects and everything they nest
#[derive(Debug)]
pub struct TargetResolver {
    roots: Vec<PathBuf>,
    extra: Vec<PathBuf>,
    index: Option<TargetIndex>,
}

impl TargetResolver {
    pub fn new(roots: &[PathBuf]) -> Self {
        Self {
            roots: roots.iter().map(|p| normalize_path(p)).collect(),
            extra: Vec::new(),
            index: None,
        }
    }

    /// Drop the cached target list
    pub fn invalidate(&mut self) {
        self.index = None;
    }

    /// Every project the resolver sees, nested ones included
    pub fn projects(&mut self, workspace: &mut Workspace) -> CacheResult<Vec<PathBuf>> {
        Ok(self.index(workspace)?.projects.clone())
    }

    /// Every resolvable (non-test, non-aggregate) target
    pub fn targets(&mut self, workspace: &mut Workspace) -> CacheResult<Vec<TargetId>> {
        Ok(self.index(workspace)?.targets.clone())
    }

    /// Direct dependencies of a target, declared or linked, without duplicates
    ///
    /// Only targets built for `platform` are returned.
    pub fn find_native_dependencies(
        &mut self,
        workspace: &mut Workspace,
        id: &TargetId,
        platform: &str,
    ) -> CacheResult<Vec<TargetId>> {
        let target = workspace.require_target(id)?.clone();
        let mut result: Vec<TargetId> = Vec::new();

        for dependency in &target.dependencies {
            if let Some(found) = self.find_for_dependency(workspace, id, &target, dependency)? {
                if !result.contains(&found) {
                    result.push(found);
                }
            }
        }

        for file in target.linked_files() {
            if let Some(found) = self.find_for_file(workspace, id, &target, file, platform)? {
                if !result.contains(&found) {
                    result.push(found);
                }
            }
        }

        let result: Vec<TargetId> = result
            .into_iter()
            .filter(|found| {
                workspace
                    .target(found)
                    .map(|t| platform_matches(&t.platform, platform))
                    .unwrap_or(false)
            })
            .collect();

        debug!(
            "{} depends on {} target(s)",
            target.name,
            result.len()
        );
        Ok(result)
    }

    /// Target a dependency declaration points at
    ///
    /// Test and aggregate targets are not graph nodes and yield `None`.
    pub fn find_for_dependency(
        &mut self,
        workspace: &mut Workspace,
        requester_id: &TargetId,
        requester: &Target,
        dependency: &TargetDependency,
    ) -> CacheResult<Option<TargetId>> {
        let found = match dependency {
            TargetDependency::Target { uuid } => TargetId::new(requester_id.project.clone(), uuid),
            TargetDependency::Proxy {
                remote_uuid,
                container,
            } => {
                let container = self.container_path(workspace, requester_id, container)?;
                TargetId::new(container, remote_uuid)
            }
        };

        match workspace.target(&found) {
            Some(target) if target.is_test_target() || target.aggregate => Ok(None),
            Some(_) => Ok(Some(found)),
            None => Err(CacheError::DependencyTargetNotFound {
                reference: dependency.target_uuid().to_string(),
                requester: requester.name.clone(),
            }),
        }
    }

    /// Target producing a linked file, if any
    ///
    /// System frameworks and other files no target builds yield `None`.
    pub fn find_for_file(
        &mut self,
        workspace: &mut Workspace,
        requester_id: &TargetId,
        requester: &Target,
        file: &BuildFile,
        platform: &str,
    ) -> CacheResult<Option<TargetId>> {
        match &file.reference {
            FileReference::Proxy {
                path,
                remote_product_uuid,
                container,
            } => {
                if let Some(found) = self.index(workspace)?.by_product_uuid.get(remote_product_uuid) {
                    return Ok(Some(found.clone()));
                }

                // Not reachable from the roots: pull the container in so later
                // lookups and removals operate on the same loaded project.
                let container = self.container_path(workspace, requester_id, container)?;
                if !self.extra.contains(&container) && !self.roots.contains(&container) {
                    self.extra.push(container.clone());
                    self.invalidate();
                }

                let found = workspace.project(&container).and_then(|project| {
                    project
                        .targets
                        .iter()
                        .find(|t| &t.product.uuid == remote_product_uuid)
                        .map(|t| TargetId::new(container.clone(), t.uuid.clone()))
                });

                found.map(Some).ok_or_else(|| CacheError::DependencyTargetNotFound {
                    reference: path.display().to_string(),
                    requester: requester.name.clone(),
                })
            }
            FileReference::File { path, .. } => {
                let product_path = path.to_string_lossy();
                let candidates: Vec<TargetId> = self
                    .index(workspace)?
                    .targets
                    .iter()
                    .filter(|candidate| {
                        workspace.target(candidate).is_some_and(|t| {
                            platform_matches(&t.platform, platform) && t.product.path == product_path
                        })
                    })
                    .cloned()
                    .collect();

                if candidates.len() > 1 {
                    return Err(CacheError::AmbiguousTarget {
                        product: file_name_of(path),
                        candidates: candidates
                            .iter()
                            .map(|c| c.project.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
                Ok(candidates.into_iter().next())
            }
        }
    }

    /// Target with the given target name or product name
    pub fn find_by_name(&mut self, workspace: &mut Workspace, name: &str) -> CacheResult<TargetId> {
        self.index(workspace)?
            .targets
            .iter()
            .find(|id| {
                workspace
                    .target(id)
                    .is_some_and(|t| t.name == name || t.product.display_name() == name)
            })
            .cloned()
            .ok_or_else(|| CacheError::TargetNotFound(name.to_string()))
    }

    fn container_path(
        &mut self,
        workspace: &mut Workspace,
        requester_id: &TargetId,
        container: &Path,
    ) -> CacheResult<PathBuf> {
        let base = requester_id
            .project
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        workspace.ensure_loaded(&base.join(container))
    }

    fn index(&mut self, workspace: &mut Workspace) -> CacheResult<&TargetIndex> {
        if self.index.is_none() {
            self.index = Some(self.build_index(workspace)?);
        }
        self.index
            .as_ref()
            .ok_or_else(|| CacheError::Internal("target index unavailable".into()))
    }

    fn build_index(&self, workspace: &mut Workspace) -> CacheResult<TargetIndex> {
        let mut projects: Vec<PathBuf> = Vec::new();
        let mut pending: Vec<PathBuf> = self.roots.iter().chain(&self.extra).cloned().collect();

        while let Some(path) = pending.pop() {
            let path = workspace.ensure_loaded(&path)?;
            if projects.contains(&path) {
                continue;
            }
            if let Some(project) = workspace.project(&path) {
                pending.extend(
                    project
                        .nested_project_paths()
                        .into_iter()
                        .filter(|nested| nested.is_file() || workspace.project(nested).is_some()),
                );
            }
            projects.push(path);
        }
        projects.sort();

        let mut index = TargetIndex {
            projects,
            ..TargetIndex::default()
        };
        for path in &index.projects {
            let Some(project) = workspace.project(path) else {
                continue;
            };
            for target in &project.targets {
                if target.is_test_target() || target.aggregate {
                    continue;
                }
                let id = TargetId::new(path.clone(), target.uuid.clone());
                index
                    .by_product_uuid
                    .entry(target.product.uuid.clone())
                    .or_insert_with(|| id.clone());
                index.targets.push(id);
            }
        }

        debug!(
            "Indexed {} target(s) in {} project(s)",
            index.targets.len(),
            index.projects.len()
        );
        Ok(index)
    }
}

/// Platforms match when equal or when either side is unspecified
fn platform_matches(candidate: &str, platform: &str) -> bool {
    candidate.is_empty() || platform.is_empty() || candidate == platform
}
