//! Embedding cached frameworks into an application target

use crate::error::CacheResult;
use crate::project::{BuildFile, BuildPhase, FileReference, SourceTree, TargetId, Workspace};
use std::path::PathBuf;
use tracing::debug;

pub const EMBED_PHASE_NAME: &str = "Embed xccache Frameworks";
const FRAMEWORKS_SUBFOLDER: &str = "frameworks";
const EMBED_ATTRIBUTES: [&str; 2] = ["CodeSignOnCopy", "RemoveHeadersOnCopy"];

/// Copy the given framework bundles into the consumer's frameworks folder
///
/// Frameworks go into one copy-files phase that later calls extend.
pub fn embed_frameworks(
    workspace: &mut Workspace,
    consumer: &TargetId,
    framework_paths: &[PathBuf],
) -> CacheResult<()> {
    if framework_paths.is_empty() {
        return Ok(());
    }

    let target = workspace.target_mut(consumer)?;
    debug!(
        "Embedding frameworks into {}:\n\t{}",
        target.name,
        framework_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n\t")
    );

    let position = target.phases.iter().position(
        |phase| matches!(phase, BuildPhase::CopyFiles { name, .. } if name == EMBED_PHASE_NAME),
    );
    let position = match position {
        Some(position) => position,
        None => {
            target.phases.push(BuildPhase::CopyFiles {
                name: EMBED_PHASE_NAME.to_string(),
                dst_path: String::new(),
                dst_subfolder: FRAMEWORKS_SUBFOLDER.to_string(),
                files: Vec::new(),
            });
            target.phases.len() - 1
        }
    };

    if let BuildPhase::CopyFiles { files, .. } = &mut target.phases[position] {
        for path in framework_paths {
            let file = embedded_file(path.clone());
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }
    Ok(())
}

fn embedded_file(path: PathBuf) -> BuildFile {
    BuildFile {
        reference: FileReference::File {
            path,
            name: None,
            source_tree: SourceTree::Absolute,
        },
        attributes: EMBED_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
    }
}
