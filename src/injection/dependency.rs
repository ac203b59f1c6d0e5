//! Detaching a prebuilt target from its consumer

use crate::error::CacheResult;
use crate::graph::Node;
use crate::project::{TargetId, Workspace};
use tracing::debug;

/// Remove the prebuilt node from the consumer's linked binaries and
/// declared dependencies
///
/// The build tool infers implicit dependencies from linker flags, so the
/// edge has to go even though the flags now point at the artifact.
pub fn remove_dependency(workspace: &mut Workspace, prebuilt: &Node, consumer: &TargetId) -> CacheResult<()> {
    let product = prebuilt.product_file_name();
    let target = workspace.target_mut(consumer)?;
    debug!("Removing {} from {}", prebuilt.name, target.name);

    if let Some(files) = target.linked_files_mut() {
        let before = files.len();
        files.retain(|file| file.display_name() != product);
        debug!("Found {} linked product(s) named {}", before - files.len(), product);
    }

    let before = target.dependencies.len();
    target
        .dependencies
        .retain(|dependency| dependency.target_uuid() != prebuilt.target.uuid);
    let removed = before - target.dependencies.len();
    if removed == 0 {
        debug!("Found nothing in dependencies");
    } else {
        debug!("Removed {} dependencies", removed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::model::product_types;
    use crate::project::{
        BuildFile, BuildPhase, FileReference, JsonProjectStore, ProductReference, Project, Target,
        TargetDependency,
    };
    use std::path::PathBuf;

    fn target(uuid: &str, product: &str) -> Target {
        Target {
            uuid: uuid.into(),
            name: uuid.into(),
            platform: "ios".into(),
            product_type: product_types::FRAMEWORK.into(),
            product: ProductReference {
                uuid: format!("{}-product", uuid),
                name: None,
                path: product.into(),
            },
            aggregate: false,
            dependencies: vec![],
            phases: vec![],
            configurations: vec![],
        }
    }

    #[test]
    fn removes_links_and_dependencies() {
        let mut project = Project::new("/w/App.json");
        let core = target("CORE", "Core.framework");
        let mut app = target("APP", "App.app");
        app.dependencies = vec![
            TargetDependency::Target { uuid: "CORE".into() },
            TargetDependency::Proxy {
                remote_uuid: "CORE".into(),
                container: PathBuf::from("Pods.json"),
            },
            TargetDependency::Target { uuid: "OTHER".into() },
        ];
        app.phases.push(BuildPhase::Frameworks {
            files: vec![
                BuildFile::new(FileReference::file("Core.framework")),
                BuildFile::new(FileReference::file("Other.framework")),
            ],
        });
        project.targets = vec![core.clone(), app];

        let mut workspace = Workspace::new(Box::new(JsonProjectStore));
        workspace.insert(project);
        let prebuilt = Node::new(TargetId::new("/w/App.json", "CORE"), &core);
        let consumer = TargetId::new("/w/App.json", "APP");

        remove_dependency(&mut workspace, &prebuilt, &consumer).unwrap();

        let app = workspace.require_target(&consumer).unwrap();
        assert_eq!(app.dependencies, vec![TargetDependency::Target { uuid: "OTHER".into() }]);
        let linked: Vec<String> = app.linked_files().iter().map(BuildFile::display_name).collect();
        assert_eq!(linked, vec!["Other.framework"]);
    }
}
