//! Fixups for scripts and settings generated by CocoaPods
//!
//! Pods aggregate targets embed and copy frameworks through generated
//! shell scripts that read products from the build directory. Once the
//! products come from the cache those locations have to point at the
//! injection container instead.

use crate::error::{CacheError, CacheResult};
use crate::project::xcconfig::walk_include_chain;
use crate::project::{TargetId, Workspace};
use crate::settings::{Interpolator, SettingsContainer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const EMBED_FRAMEWORKS_SCRIPT: &str = "[CP] Embed Pods Frameworks";
pub const COPY_XCFRAMEWORKS_SCRIPT: &str = "[CP] Copy XCFrameworks";

const BUILT_PRODUCTS_DIR: &str = "${BUILT_PRODUCTS_DIR}";
const PODS_XCFRAMEWORKS_BUILD_DIR: &str = "${PODS_XCFRAMEWORKS_BUILD_DIR}";
const SRCROOT: &str = "${SRCROOT}";

/// Name of the Pods aggregate target generated for `target_name`
pub fn pods_target_name(target_name: &str) -> String {
    format!("Pods-{}", target_name)
}

/// Make the consumer's embed script take frameworks from `products_dir`
///
/// Returns the rewritten script path, if the consumer has such a script.
pub fn fix_embed_frameworks_script(
    workspace: &Workspace,
    consumer: &TargetId,
    settings: &SettingsContainer,
    products_dir: &Path,
) -> CacheResult<Option<PathBuf>> {
    let Some(path) = find_script(workspace, consumer, settings, EMBED_FRAMEWORKS_SCRIPT)? else {
        debug!("No {} script on {}", EMBED_FRAMEWORKS_SCRIPT, consumer);
        return Ok(None);
    };
    replace_in_file(&path, BUILT_PRODUCTS_DIR, products_dir)?;
    Ok(Some(path))
}

/// Point `${PODS_XCFRAMEWORKS_BUILD_DIR}` at `container`
///
/// Rewrites the copy and embed scripts of the consumer and every settings
/// file reachable from its build configuration.
pub fn fix_xcframeworks(
    workspace: &Workspace,
    consumer: &TargetId,
    settings: &SettingsContainer,
    configuration_name: &str,
    container: &Path,
) -> CacheResult<()> {
    let target = workspace.require_target(consumer)?;
    let configuration = target.find_build_configuration(configuration_name)?;

    for script in [COPY_XCFRAMEWORKS_SCRIPT, EMBED_FRAMEWORKS_SCRIPT] {
        if let Some(path) = find_script(workspace, consumer, settings, script)? {
            replace_in_file(&path, PODS_XCFRAMEWORKS_BUILD_DIR, container)?;
        }
    }

    let Some(base) = &configuration.base_configuration else {
        return Ok(());
    };

    let replacement = container.display().to_string();
    walk_include_chain(&project_dir(consumer).join(base), |xcconfig| {
        let changed = xcconfig.rewrite_values(|_, value| {
            value
                .contains(PODS_XCFRAMEWORKS_BUILD_DIR)
                .then(|| value.replace(PODS_XCFRAMEWORKS_BUILD_DIR, &replacement))
        });
        if changed {
            debug!("Fixing {}", xcconfig.path().display());
            xcconfig.write()?;
        }
        Ok(())
    })
}

/// Replace every `token` in a script file with `replacement`
pub fn replace_in_file(path: &Path, token: &str, replacement: &Path) -> CacheResult<()> {
    debug!("Fixing {}", path.display());
    let content = fs::read_to_string(path)
        .map_err(|e| CacheError::io(format!("reading {}", path.display()), e))?;
    let mut fixed = content.replace(token, &replacement.display().to_string());
    if !fixed.ends_with('\n') {
        fixed.push('\n');
    }
    fs::write(path, fixed).map_err(|e| CacheError::io(format!("writing {}", path.display()), e))
}

/// Existing script file a shell script phase runs
fn find_script(
    workspace: &Workspace,
    target_id: &TargetId,
    settings: &SettingsContainer,
    phase_name: &str,
) -> CacheResult<Option<PathBuf>> {
    let target = workspace.require_target(target_id)?;
    let Some(script) = target.script(phase_name) else {
        return Ok(None);
    };

    let script = script.replace(SRCROOT, &project_dir(target_id).display().to_string());
    let resolved = Interpolator::new(settings).interpolate(&script);
    let path = PathBuf::from(resolved.trim().trim_matches('"').trim());
    if !path.is_file() {
        warn!("{} of {} runs missing script {}", phase_name, target.name, path.display());
        return Ok(None);
    }
    Ok(Some(path))
}

fn project_dir(id: &TargetId) -> PathBuf {
    id.project
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
