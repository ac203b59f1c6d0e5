//! Content fingerprints
//!
//! A node's fingerprint folds in its input files, its filtered settings and
//! the fingerprints of its direct dependencies, so any change below a node
//! changes the node itself. Fingerprints are memoized on the node for the
//! lifetime of the registry and never persisted.

use crate::error::{CacheError, CacheResult};
use crate::graph::node::NodeId;
use crate::graph::registry::NodeRegistry;
use crate::project::{Target, Workspace};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Fingerprint of the caching logic itself
///
/// Part of every node fingerprint, so a new release never reuses artifacts
/// produced under different rules.
pub const TOOL_FINGERPRINT: &str = concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));

pub struct FingerprintCalculator<'a> {
    workspace: &'a Workspace,
}

impl<'a> FingerprintCalculator<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    /// Fingerprint `id` and everything below it, dependencies first
    pub fn calculate(&self, registry: &mut NodeRegistry, id: NodeId) -> CacheResult<()> {
        let mut stack = vec![(id, false)];

        while let Some((current, expanded)) = stack.pop() {
            if registry.node(current).sha.is_some() {
                continue;
            }

            if !expanded {
                stack.push((current, true));
                for dependency in registry.node(current).dependencies().iter().rev() {
                    if registry.node(*dependency).sha.is_none() {
                        stack.push((*dependency, false));
                    }
                }
                continue;
            }

            let sha = self.fingerprint(registry, current)?;
            debug!("{} fingerprint {}", registry.node(current).name, sha);
            registry.node_mut(current).sha = Some(sha);
        }
        Ok(())
    }

    fn fingerprint(&self, registry: &NodeRegistry, id: NodeId) -> CacheResult<String> {
        let node = registry.node(id);
        let target = self.workspace.require_target(&node.target)?;

        let mut hasher = Sha256::new();
        for path in input_files(target, &node.project_dir())? {
            hasher.update(hash_file(&path)?);
        }

        let dependency_shas = node
            .dependencies()
            .iter()
            .map(|dependency| registry.node(*dependency).sha())
            .collect::<CacheResult<Vec<&str>>>()?;
        let settings = format!(
            "{}\n{}",
            node.settings()?.filtered_to_string(),
            dependency_shas.join("\n")
        );
        hasher.update(hex_digest(settings.as_bytes()));
        hasher.update(TOOL_FINGERPRINT);

        Ok(hex::encode(hasher.finalize()))
    }
}

/// Every file a target's build phases reach, directories expanded, sorted
fn input_files(target: &Target, project_dir: &Path) -> CacheResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for phase in target.phases.iter().filter(|p| p.contributes_inputs()) {
        for file in phase.files() {
            let Some(path) = file.reference.real_path(project_dir) else {
                continue;
            };

            if path.is_dir() {
                for entry in WalkDir::new(&path).follow_links(true) {
                    let entry = entry.map_err(|e| CacheError::InputFile {
                        path: path.clone(),
                        source: e.into(),
                    })?;
                    if entry.file_type().is_file() {
                        files.push(entry.into_path());
                    }
                }
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn hash_file(path: &Path) -> CacheResult<String> {
    let contents = fs::read(path).map_err(|e| CacheError::InputFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(hex_digest(&contents))
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
