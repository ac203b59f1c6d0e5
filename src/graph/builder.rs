//! Dependency graph construction
//!
//! Depth-first over resolved dependencies with an explicit stack of the
//! targets being visited. A node is created and wired only after all of its
//! dependency nodes exist, so nothing above it ever sees a partial node.
//! Revisiting a target still on the stack is a cycle.

use crate::error::{CacheError, CacheResult};
use crate::graph::fingerprint::FingerprintCalculator;
use crate::graph::node::{Node, NodeId};
use crate::graph::registry::NodeRegistry;
use crate::graph::resolver::TargetResolver;
use crate::graph::Graph;
use crate::project::{TargetId, Workspace};
use crate::settings::SettingsLoader;
use std::path::PathBuf;
use tracing::{debug, info};

/// Target being visited
struct Frame {
    target: TargetId,
    name: String,
    /// Dependencies still to visit, last one first
    pending: Vec<TargetId>,
    /// Dependency nodes in declaration order
    resolved: Vec<NodeId>,
}

/// Builds graphs into a registry shared by every graph of a run
pub struct GraphBuilder {
    resolver: TargetResolver,
    registry: NodeRegistry,
    loader: SettingsLoader,
}

impl GraphBuilder {
    pub fn new(resolver: TargetResolver, loader: SettingsLoader) -> Self {
        Self {
            resolver,
            registry: NodeRegistry::new(),
            loader,
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    pub fn resolver_mut(&mut self) -> &mut TargetResolver {
        &mut self.resolver
    }

    /// Graph of `root`'s dependency closure with settings and fingerprints
    ///
    /// `consumer` is the target that will link the graph; its settings are
    /// loaded alongside and kept as the graph's dependent settings.
    pub fn build_graph(
        &mut self,
        workspace: &mut Workspace,
        root: &TargetId,
        consumer: Option<&TargetId>,
    ) -> CacheResult<Graph> {
        let platform = workspace.require_target(root)?.platform.clone();
        let root_id = match self.registry.find(root) {
            Some(existing) => existing,
            None => self.traverse(workspace, root, &platform)?,
        };

        let mut graph = Graph::new(root_id);
        for id in self.registry.closure(root_id) {
            graph.add(id);
        }

        self.attach_settings(workspace, &graph, consumer, &platform)?;
        if let Some(consumer) = consumer {
            let name = workspace.require_target(consumer)?.name.clone();
            graph.dependent_settings =
                Some(self.loader.require(&consumer.project, &platform, &name)?.clone());
        }

        FingerprintCalculator::new(workspace).calculate(&mut self.registry, root_id)?;

        info!(
            "Built graph for {} with {} node(s)",
            self.registry.node(root_id).name,
            graph.len()
        );
        Ok(graph)
    }

    fn traverse(
        &mut self,
        workspace: &mut Workspace,
        root: &TargetId,
        platform: &str,
    ) -> CacheResult<NodeId> {
        let mut stack = vec![self.frame(workspace, root, platform)?];

        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.pending.pop(),
                None => return Err(CacheError::Internal("graph traversal lost its root".into())),
            };

            if let Some(next) = next {
                if let Some(existing) = self.registry.find(&next) {
                    if let Some(frame) = stack.last_mut() {
                        frame.resolved.push(existing);
                    }
                    continue;
                }

                if let Some(start) = stack.iter().position(|frame| frame.target == next) {
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|frame| frame.name.clone()).collect();
                    cycle.push(stack[start].name.clone());
                    return Err(CacheError::CircularDependency { cycle });
                }

                let frame = self.frame(workspace, &next, platform)?;
                stack.push(frame);
                continue;
            }

            let Some(frame) = stack.pop() else {
                continue;
            };
            let target = workspace.require_target(&frame.target)?;
            let id = self.registry.insert(Node::new(frame.target.clone(), target));
            for dependency in frame.resolved {
                self.registry.add_dependency(id, dependency);
            }
            debug!("Created node {}", frame.name);

            match stack.last_mut() {
                Some(parent) => parent.resolved.push(id),
                None => return Ok(id),
            }
        }
    }

    fn frame(&mut self, workspace: &mut Workspace, id: &TargetId, platform: &str) -> CacheResult<Frame> {
        let name = workspace.require_target(id)?.name.clone();
        debug!("Visiting {}", name);

        let mut pending = self.resolver.find_native_dependencies(workspace, id, platform)?;
        pending.reverse();
        Ok(Frame {
            target: id.clone(),
            name,
            pending,
            resolved: Vec::new(),
        })
    }

    /// Load settings for every project of the graph in one batch and assign them
    fn attach_settings(
        &mut self,
        workspace: &Workspace,
        graph: &Graph,
        consumer: Option<&TargetId>,
        platform: &str,
    ) -> CacheResult<()> {
        let mut projects: Vec<PathBuf> = graph
            .nodes()
            .iter()
            .map(|id| self.registry.node(*id).target.project.clone())
            .chain(consumer.map(|c| c.project.clone()))
            .collect();
        projects.sort();
        projects.dedup();
        self.loader.load(&projects, platform)?;

        for id in graph.nodes() {
            if self.registry.node(*id).settings.is_some() {
                continue;
            }
            let node = self.registry.node(*id);
            let name = workspace.require_target(&node.target)?.name.clone();
            let settings = self.loader.require(&node.target.project, platform, &name)?.clone();
            self.registry.node_mut(*id).settings = Some(settings);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::SettingsQuery;
    use crate::project::model::product_types;
    use crate::project::{JsonProjectStore, ProductReference, Project, Target, TargetDependency};
    use std::path::Path;
    use std::sync::Arc;

    /// Same settings text for every project: one block per known target
    struct StaticQuery(String);

    impl StaticQuery {
        fn for_targets(names: &[&str]) -> Arc<Self> {
            let text = names
                .iter()
                .map(|name| {
                    format!(
                        "Build settings for action build and target {name}:\n    TARGETNAME = {name}\n    ARCHS = arm64\n"
                    )
                })
                .collect::<String>();
            Arc::new(Self(text))
        }
    }

    impl SettingsQuery for StaticQuery {
        fn load_build_settings(&self, _project: &Path, _platform: &str) -> CacheResult<String> {
            Ok(self.0.clone())
        }
    }

    /// Settings echoing the queried platform for every known target
    struct PlatformQuery(Vec<String>);

    impl SettingsQuery for PlatformQuery {
        fn load_build_settings(&self, _project: &Path, platform: &str) -> CacheResult<String> {
            Ok(self
                .0
                .iter()
                .map(|name| {
                    format!(
                        "Build settings for action build and target {name}:\n    TARGETNAME = {name}\n    PLATFORM_NAME = {platform}\n"
                    )
                })
                .collect())
        }
    }

    const PROJECT: &str = "/w/Pods.json";

    fn target(name: &str, dependencies: &[&str]) -> Target {
        Target {
            uuid: name.into(),
            name: name.into(),
            platform: "ios".into(),
            product_type: product_types::FRAMEWORK.into(),
            product: ProductReference {
                uuid: format!("{}-product", name),
                name: None,
                path: format!("{}.framework", name),
            },
            aggregate: false,
            dependencies: dependencies
                .iter()
                .map(|d| TargetDependency::Target { uuid: d.to_string() })
                .collect(),
            phases: vec![],
            configurations: vec![],
        }
    }

    fn setup(targets: Vec<Target>) -> (Workspace, GraphBuilder) {
        let names: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        let mut project = Project::new(PROJECT);
        project.targets = targets;
        let mut workspace = Workspace::new(Box::new(JsonProjectStore));
        workspace.insert(project);

        let builder = GraphBuilder::new(
            TargetResolver::new(&[PathBuf::from(PROJECT)]),
            SettingsLoader::new(StaticQuery::for_targets(&names)),
        );
        (workspace, builder)
    }

    fn id(name: &str) -> TargetId {
        TargetId::new(PROJECT, name)
    }

    fn names(builder: &GraphBuilder, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| builder.registry().node(*id).name.clone())
            .collect()
    }

    #[test]
    fn graph_is_the_dependency_closure() {
        let (mut workspace, mut builder) = setup(vec![
            target("A", &["B", "C"]),
            target("B", &["C"]),
            target("C", &[]),
            target("Unrelated", &[]),
        ]);

        let graph = builder.build_graph(&mut workspace, &id("A"), None).unwrap();
        assert_eq!(names(&builder, graph.nodes()), vec!["A", "B", "C"]);

        let a = graph.root();
        assert_eq!(names(&builder, builder.registry().node(a).dependencies()), vec!["B", "C"]);
        let c = graph.node_by_name(builder.registry(), "C").unwrap();
        assert_eq!(names(&builder, builder.registry().node(c).dependents()), vec!["B", "A"]);

        for node in graph.nodes() {
            let node = builder.registry().node(*node);
            assert!(node.settings.is_some());
            assert!(node.sha.is_some());
        }
    }

    #[test]
    fn cycle_is_reported_with_full_path() {
        let (mut workspace, mut builder) = setup(vec![
            target("A", &["B"]),
            target("B", &["C"]),
            target("C", &["A"]),
        ]);

        let err = builder.build_graph(&mut workspace, &id("A"), None).unwrap_err();
        match err {
            CacheError::CircularDependency { cycle } => {
                assert_eq!(cycle, vec!["A", "B", "C", "A"]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(builder.registry().is_empty());
    }

    #[test]
    fn registry_is_shared_between_graphs() {
        let (mut workspace, mut builder) = setup(vec![
            target("A", &["Shared"]),
            target("B", &["Shared"]),
            target("Shared", &[]),
        ]);

        let first = builder.build_graph(&mut workspace, &id("A"), None).unwrap();
        let second = builder.build_graph(&mut workspace, &id("B"), None).unwrap();

        let shared_first = first.node_by_name(builder.registry(), "Shared").unwrap();
        let shared_second = second.node_by_name(builder.registry(), "Shared").unwrap();
        assert_eq!(shared_first, shared_second);
        assert_eq!(builder.registry().len(), 3);
        assert_eq!(
            names(&builder, builder.registry().node(shared_first).dependents()),
            vec!["A", "B"]
        );
    }

    #[test]
    fn consumer_settings_become_dependent_settings() {
        let (mut workspace, mut builder) = setup(vec![target("App", &[]), target("Core", &[])]);

        let graph = builder
            .build_graph(&mut workspace, &id("Core"), Some(&id("App")))
            .unwrap();
        let settings = graph.dependent_settings.as_ref().unwrap();
        assert_eq!(settings.target_name(), Some("App"));
    }

    #[test]
    fn settings_follow_the_platform_of_each_graph() {
        let mut ios = target("CoreiOS", &[]);
        ios.platform = "iphoneos".into();
        let mut watch = target("CoreWatch", &[]);
        watch.platform = "watchos".into();

        let mut project = Project::new(PROJECT);
        project.targets = vec![ios, watch];
        let mut workspace = Workspace::new(Box::new(JsonProjectStore));
        workspace.insert(project);
        let mut builder = GraphBuilder::new(
            TargetResolver::new(&[PathBuf::from(PROJECT)]),
            SettingsLoader::new(Arc::new(PlatformQuery(vec![
                "CoreiOS".into(),
                "CoreWatch".into(),
            ]))),
        );

        let first = builder.build_graph(&mut workspace, &id("CoreiOS"), None).unwrap();
        let second = builder.build_graph(&mut workspace, &id("CoreWatch"), None).unwrap();

        let platform_of = |root: NodeId| {
            builder
                .registry()
                .node(root)
                .settings
                .as_ref()
                .and_then(|s| s.get("PLATFORM_NAME"))
                .map(str::to_string)
        };
        assert_eq!(platform_of(first.root()).as_deref(), Some("iphoneos"));
        assert_eq!(platform_of(second.root()).as_deref(), Some("watchos"));
    }

    #[test]
    fn missing_settings_are_fatal() {
        let mut project = Project::new(PROJECT);
        project.targets = vec![target("A", &[])];
        let mut workspace = Workspace::new(Box::new(JsonProjectStore));
        workspace.insert(project);
        let mut builder = GraphBuilder::new(
            TargetResolver::new(&[PathBuf::from(PROJECT)]),
            SettingsLoader::new(StaticQuery::for_targets(&["Other"])),
        );

        let err = builder.build_graph(&mut workspace, &id("A"), None).unwrap_err();
        assert!(matches!(err, CacheError::SettingsMissing { .. }));
    }
}
