//! Pipeline orchestration
//!
//! For every configured consumer and each of its cacheable dependencies:
//!
//! 1. build the dependency's graph with fingerprints
//! 2. evaluate it against the store and unpack every hit
//! 3. inject the hits into the targets that still build from source
//! 4. build the graph root once and archive what was rebuilt
//! 5. inject the whole graph into the consumer
//!
//! Replaced targets are removed from their projects only after every
//! consumer has been processed.

use crate::build::{BuildInvoker, BuildRequest, ProductExtractor};
use crate::cache::{ArtifactStore, DependencyFingerprint};
use crate::config::TargetConfig;
use crate::error::{CacheError, CacheResult};
use crate::graph::{Graph, GraphBuilder, NodeId, RebuildEvaluator, RebuildState};
use crate::injection::{pods, InjectionStorage, Injector};
use crate::project::{TargetId, Workspace};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory under derived data holding unpacked and rebuilt products
pub const CONTAINER_DIR: &str = "cached";

const BUILT_PRODUCTS_DIR: &str = "${BUILT_PRODUCTS_DIR}";

/// Nodes touched by a run, by name
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub unpacked: Vec<String>,
    pub rebuilt: Vec<String>,
    pub removed_targets: usize,
}

pub struct Runner {
    workspace: Workspace,
    builder: GraphBuilder,
    store: Box<dyn ArtifactStore>,
    invoker: Box<dyn BuildInvoker>,
    injector: Injector,
    products: ProductExtractor,
    derived_data: PathBuf,
}

impl Runner {
    pub fn new(
        workspace: Workspace,
        builder: GraphBuilder,
        store: Box<dyn ArtifactStore>,
        invoker: Box<dyn BuildInvoker>,
        configuration_name: &str,
        derived_data: impl Into<PathBuf>,
    ) -> Self {
        let derived_data = derived_data.into();
        let container = derived_data.join(CONTAINER_DIR);
        Self {
            workspace,
            builder,
            store,
            invoker,
            injector: Injector::new(configuration_name, InjectionStorage::new(&container)),
            products: ProductExtractor::new(&derived_data).excluding(&container),
            derived_data,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn container(&self) -> &Path {
        self.injector.storage().container()
    }

    /// Run the whole pipeline for every configured target
    pub fn run(&mut self, targets: &[TargetConfig]) -> CacheResult<RunReport> {
        self.injector.reset_storage()?;
        let mut report = RunReport::default();

        for target in targets {
            let consumer = self
                .builder
                .resolver_mut()
                .find_by_name(&mut self.workspace, &target.name)?;
            info!("Processing {}", target.name);

            for dependency in &target.dependencies {
                self.handle_dependency(&consumer, dependency, &mut report)?;
            }

            if let Some(script) = &target.embed_frameworks_script {
                let container = self.container().to_path_buf();
                pods::replace_in_file(script, BUILT_PRODUCTS_DIR, &container)?;
            }
        }

        report.removed_targets = self.workspace.apply_removals();
        self.workspace.save()?;
        self.builder.resolver_mut().invalidate();

        info!(
            "Done: {} unpacked, {} rebuilt, {} target(s) replaced",
            report.unpacked.len(),
            report.rebuilt.len(),
            report.removed_targets
        );
        Ok(report)
    }

    /// Graph dump of every configured dependency, optionally evaluated
    ///
    /// Nothing is unpacked, built or written.
    pub fn describe(&mut self, targets: &[TargetConfig], evaluate: bool) -> CacheResult<String> {
        let mut output = String::new();
        for target in targets {
            let consumer = self
                .builder
                .resolver_mut()
                .find_by_name(&mut self.workspace, &target.name)?;

            for dependency in &target.dependencies {
                let graph = self.build_graph(&consumer, dependency)?;
                if evaluate {
                    RebuildEvaluator::new(self.store.as_ref())
                        .evaluate(self.builder.registry_mut(), graph.root())?;
                }
                output.push_str(&format!("# {} <- {}\n", target.name, dependency));
                output.push_str(&graph.render(self.builder.registry()));
                output.push('\n');
            }
        }
        Ok(output)
    }

    fn build_graph(&mut self, consumer: &TargetId, dependency: &str) -> CacheResult<Graph> {
        let dependency = self
            .builder
            .resolver_mut()
            .find_by_name(&mut self.workspace, dependency)?;
        self.builder
            .build_graph(&mut self.workspace, &dependency, Some(consumer))
    }

    fn handle_dependency(
        &mut self,
        consumer: &TargetId,
        dependency: &str,
        report: &mut RunReport,
    ) -> CacheResult<()> {
        let graph = self.build_graph(consumer, dependency)?;
        RebuildEvaluator::new(self.store.as_ref()).evaluate(self.builder.registry_mut(), graph.root())?;

        report.unpacked.extend(self.unpack_available(&graph)?);

        self.injector
            .perform_internal_injection(&mut self.workspace, self.builder.registry(), &graph)?;
        self.workspace.save()?;

        report.rebuilt.extend(self.rebuild_missing(&graph)?);

        self.injector.perform_outgoing_injection(
            &mut self.workspace,
            self.builder.registry(),
            &graph,
            consumer,
        )?;
        self.workspace.save()?;
        Ok(())
    }

    /// Unpack every cache hit into its staging directory
    fn unpack_available(&mut self, graph: &Graph) -> CacheResult<Vec<String>> {
        let mut unpacked = Vec::new();
        for &id in graph.nodes() {
            let node = self.builder.registry().node(id);
            if node.state != RebuildState::ExistsInCache {
                continue;
            }

            let destination = self.injector.storage().prepare_storage(node)?;
            self.store.unpack(node, &destination)?;
            debug!("Unpacked {} into {}", node.name, destination.display());
            unpacked.push(node.name.clone());
            self.builder.registry_mut().node_mut(id).state = RebuildState::Unpacked;
        }
        Ok(unpacked)
    }

    /// Build the graph root if anything waits and archive the products
    fn rebuild_missing(&mut self, graph: &Graph) -> CacheResult<Vec<String>> {
        let registry = self.builder.registry();
        let waiting: Vec<NodeId> = graph
            .nodes()
            .iter()
            .copied()
            .filter(|id| registry.node(*id).is_waiting_for_rebuild())
            .collect();

        let root = registry.node(graph.root());
        if waiting.is_empty() {
            info!("No need to rebuild anything for {}", root.name);
            return Ok(Vec::new());
        }

        let request = BuildRequest {
            project: &root.target.project,
            scheme: &root.name,
            platform: &root.platform,
            derived_data: &self.derived_data,
        };
        if !self.invoker.build(&request)? {
            return Err(CacheError::BuildFailed {
                scheme: root.name.clone(),
            });
        }

        let mut rebuilt = Vec::new();
        for id in waiting {
            let registry = self.builder.registry();
            let node = registry.node(id);
            let dependencies = node
                .dependencies()
                .iter()
                .map(|dependency| {
                    let dependency = registry.node(*dependency);
                    Ok(DependencyFingerprint {
                        name: dependency.name.clone(),
                        sha: dependency.sha()?.to_string(),
                    })
                })
                .collect::<CacheResult<Vec<_>>>()?;

            let destination = self.injector.storage().prepare_storage(node)?;
            self.products.copy_products(node, &destination)?;
            self.store.store(node, &dependencies, &destination)?;
            rebuilt.push(node.name.clone());
            self.builder.registry_mut().node_mut(id).state = RebuildState::RebuiltAndCached;
        }
        Ok(rebuilt)
    }
}
