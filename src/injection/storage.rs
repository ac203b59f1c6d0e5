//! Staging area for unpacked artifacts and relocated headers
//!
//! Every node gets `<container>/<node name>`. Cached artifacts are unpacked
//! there, rebuilt products are copied there, and headers a consumer needs
//! are copied into it so the consumer no longer depends on the source tree.

use crate::build::copy_recursively;
use crate::error::{CacheError, CacheResult};
use crate::graph::Node;
use crate::project::model::file_name_of;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_HEADERS_DIR: &str = "include";

#[derive(Debug)]
pub struct InjectionStorage {
    container: PathBuf,
    header_paths: HashMap<String, Vec<PathBuf>>,
    modulemaps: HashMap<String, PathBuf>,
}

impl InjectionStorage {
    pub fn new(container: impl Into<PathBuf>) -> Self {
        Self {
            container: container.into(),
            header_paths: HashMap::new(),
            modulemaps: HashMap::new(),
        }
    }

    /// Remove leftovers of earlier runs
    pub fn reset(&mut self) -> CacheResult<()> {
        if self.container.exists() {
            debug!("Clearing {}", self.container.display());
            fs::remove_dir_all(&self.container)
                .map_err(|e| CacheError::io(format!("clearing {}", self.container.display()), e))?;
        }
        self.header_paths.clear();
        self.modulemaps.clear();
        Ok(())
    }

    pub fn container(&self) -> &Path {
        &self.container
    }

    pub fn storage_path(&self, node: &Node) -> PathBuf {
        self.container.join(&node.name)
    }

    /// Create the node's directory; it must not exist yet
    pub fn prepare_storage(&self, node: &Node) -> CacheResult<PathBuf> {
        let path = self.storage_path(node);
        if path.exists() {
            return Err(CacheError::StagingBusy(path));
        }
        fs::create_dir_all(&path)
            .map_err(|e| CacheError::io(format!("creating {}", path.display()), e))?;
        Ok(path)
    }

    /// Whether headers of the node were already staged
    pub fn has_headers(&self, node: &Node) -> bool {
        self.header_paths.contains_key(&node.name)
    }

    /// Copy headers into `relative_dir` of the node's directory
    pub fn store_headers(
        &mut self,
        node: &Node,
        relative_dir: &Path,
        headers: &[PathBuf],
    ) -> CacheResult<()> {
        let relative = relative_dir.strip_prefix("/").unwrap_or(relative_dir);
        let dir = self.storage_path(node).join(relative);
        self.copy_headers(node, &dir, headers)
    }

    /// Copy public headers into `include/<module>`
    ///
    /// Both `include` and `include/<module>` become search paths, so
    /// `<Module/Header.h>` and `"Header.h"` imports resolve.
    pub fn store_default_headers(&mut self, node: &Node, headers: &[PathBuf]) -> CacheResult<()> {
        let include = self.storage_path(node).join(DEFAULT_HEADERS_DIR);
        self.record_header_path(node, include.clone());
        self.copy_headers(node, &include.join(node.module_name()), headers)
    }

    /// Stage a module map and the headers it declares side by side
    pub fn store_modulemap(
        &mut self,
        node: &Node,
        modulemap: &Path,
        headers: &[PathBuf],
    ) -> CacheResult<PathBuf> {
        let dir = self.storage_path(node);
        self.copy_headers(node, &dir, headers)?;

        let staged = dir.join(file_name_of(modulemap));
        copy_recursively(modulemap, &staged)?;
        debug!("Staged module map {}", staged.display());
        self.modulemaps.insert(node.name.clone(), staged.clone());
        Ok(staged)
    }

    /// Header directories staged for the node, in staging order
    pub fn header_paths(&self, node: &Node) -> &[PathBuf] {
        self.header_paths
            .get(&node.name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn modulemap_path(&self, node: &Node) -> Option<&Path> {
        self.modulemaps.get(&node.name).map(PathBuf::as_path)
    }

    fn copy_headers(&mut self, node: &Node, dir: &Path, headers: &[PathBuf]) -> CacheResult<()> {
        fs::create_dir_all(dir)
            .map_err(|e| CacheError::io(format!("creating {}", dir.display()), e))?;
        for header in headers {
            copy_recursively(header, &dir.join(file_name_of(header)))?;
        }
        debug!("Staged {} header(s) of {} in {}", headers.len(), node.name, dir.display());
        self.record_header_path(node, dir.to_path_buf());
        Ok(())
    }

    fn record_header_path(&mut self, node: &Node, path: PathBuf) {
        let paths = self.header_paths.entry(node.name.clone()).or_default();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
}
