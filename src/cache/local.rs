//! Artifact store on the local file system

use crate::cache::archive::{archive, unarchive};
use crate::cache::{ArtifactStore, DependencyFingerprint};
use crate::error::{CacheError, CacheResult};
use crate::graph::Node;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix of the plain-text manifest written next to an artifact
pub const MANIFEST_EXTENSION: &str = "state";

/// Format bytes as human-readable size (e.g., "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Store rooted at a directory, one archive per `<name>/<sha>`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    debug_manifest: bool,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debug_manifest: true,
        }
    }

    /// Whether `store` writes the `.state` manifest
    pub fn with_debug_manifest(mut self, enabled: bool) -> Self {
        self.debug_manifest = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, node: &Node) -> CacheResult<PathBuf> {
        Ok(self.root.join(&node.name).join(node.sha()?))
    }

    fn write_manifest(
        &self,
        node: &Node,
        dependencies: &[DependencyFingerprint],
        artifact: &Path,
    ) -> CacheResult<()> {
        let path = artifact.with_extension(MANIFEST_EXTENSION);
        if path.exists() {
            return Err(CacheError::ManifestExists(path));
        }

        fs::write(&path, manifest(node, dependencies)?)
            .map_err(|e| CacheError::io(format!("writing {}", path.display()), e))?;
        debug!("Wrote manifest {}", path.display());
        Ok(())
    }
}

/// Filtered settings, a blank line, then one `name: sha` line per dependency
fn manifest(node: &Node, dependencies: &[DependencyFingerprint]) -> CacheResult<String> {
    let mut content = node.settings()?.filtered_to_string();
    content.push_str("\n\nDependencies:\n");
    for dependency in dependencies {
        content.push_str(&format!("{}: {}\n", dependency.name, dependency.sha));
    }
    Ok(content)
}

impl ArtifactStore for LocalStorage {
    fn cached_artifact_path(&self, node: &Node) -> CacheResult<Option<PathBuf>> {
        let path = self.artifact_path(node)?;
        Ok(path.is_file().then_some(path))
    }

    fn store(
        &self,
        node: &Node,
        dependencies: &[DependencyFingerprint],
        source: &Path,
    ) -> CacheResult<()> {
        let path = self.artifact_path(node)?;
        archive(source, &path)?;

        if self.debug_manifest {
            self.write_manifest(node, dependencies, &path)?;
        }

        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        info!("Stored {} ({})", node.name, format_bytes(size));
        Ok(())
    }

    fn unpack(&self, node: &Node, destination: &Path) -> CacheResult<()> {
        let Some(path) = self.cached_artifact_path(node)? else {
            return Err(CacheError::ArtifactNotFound {
                name: node.name.clone(),
                sha: node.sha()?.to_string(),
            });
        };

        unarchive(&path, destination)?;
        info!("Unpacked {} into {}", node.name, destination.display());
        Ok(())
    }
}
