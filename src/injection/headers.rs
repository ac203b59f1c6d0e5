//! Header relocation for prebuilt targets

use crate::error::CacheResult;
use crate::graph::Node;
use crate::injection::modulemap::extract_header_paths;
use crate::injection::storage::InjectionStorage;
use crate::project::{BuildFile, BuildPhase, ProductKind, Workspace};
use crate::settings::Interpolator;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Copy every header a consumer may include into the node's staging area
///
/// Covers `.h` files of copy-files phases (placed at the interpolated
/// destination), public headers of static libraries and the headers a
/// module map declares, together with the module map itself.
pub fn prepare_headers_for_injection(
    workspace: &Workspace,
    storage: &mut InjectionStorage,
    node: &Node,
) -> CacheResult<()> {
    debug!("Checking {} headers", node.name);
    let target = workspace.require_target(&node.target)?;
    let project_dir = node.project_dir();
    let interpolator = Interpolator::new(node.settings()?);
    let mut count = 0;

    for phase in &target.phases {
        let BuildPhase::CopyFiles {
            dst_path, files, ..
        } = phase
        else {
            continue;
        };
        let headers: Vec<PathBuf> = real_paths(files, &project_dir)
            .into_iter()
            .filter(|path| path.extension().is_some_and(|ext| ext == "h"))
            .collect();
        let destination = interpolator.interpolate(dst_path);
        storage.store_headers(node, Path::new(&destination), &headers)?;
        count += headers.len();
    }

    if node.product_kind == ProductKind::StaticLibrary {
        let public: Vec<BuildFile> = target
            .header_files()
            .iter()
            .filter(|file| file.is_public())
            .cloned()
            .collect();
        let headers = real_paths(&public, &project_dir);
        storage.store_default_headers(node, &headers)?;
        count += headers.len();
    }

    if let Some(modulemap) = node.modulemap_file_path().filter(|path| path.exists()) {
        let (headers, missing): (Vec<PathBuf>, Vec<PathBuf>) = extract_header_paths(&modulemap)?
            .into_iter()
            .partition(|path| path.exists());
        for path in &missing {
            warn!("{} declares missing header {}", modulemap.display(), path.display());
        }
        storage.store_modulemap(node, &modulemap, &headers)?;
        count += headers.len();
    }

    debug!("Found {} header(s) for {}", count, node.name);
    Ok(())
}

/// Drop header references of a prebuilt framework target
///
/// The framework's own headers ship inside the bundle; leaving them in the
/// project makes consumers pick up non-modular includes.
pub fn delete_headers(workspace: &mut Workspace, node: &Node) -> CacheResult<()> {
    let target = workspace.target_mut(&node.target)?;
    if let Some(headers) = target.headers_mut() {
        if !headers.is_empty() {
            debug!("Removing {} header reference(s) from {}", headers.len(), node.name);
            headers.clear();
        }
    }
    Ok(())
}

fn real_paths(files: &[BuildFile], project_dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for path in files
        .iter()
        .filter_map(|file| file.reference.real_path(project_dir))
    {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}
