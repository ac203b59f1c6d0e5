//! Rewiring consumers onto prebuilt artifacts

use crate::error::{CacheError, CacheResult};
use crate::graph::{Graph, Node, NodeRegistry, RebuildState};
use crate::injection::storage::InjectionStorage;
use crate::injection::{dependency, embedder, flags, headers, modulemap, pods};
use crate::project::model::file_name_of;
use crate::project::{BuildConfiguration, ProductKind, TargetId, Workspace};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct Injector {
    configuration_name: String,
    storage: InjectionStorage,
}

impl Injector {
    pub fn new(configuration_name: impl Into<String>, storage: InjectionStorage) -> Self {
        Self {
            configuration_name: configuration_name.into(),
            storage,
        }
    }

    pub fn storage(&self) -> &InjectionStorage {
        &self.storage
    }

    /// Start from an empty staging area
    pub fn reset_storage(&mut self) -> CacheResult<()> {
        self.storage.reset()
    }

    /// Point every dependent still waiting for rebuild at the artifacts of
    /// cache-resolved nodes
    ///
    /// Dependents that are themselves satisfied from the cache are left
    /// untouched; they are unpacked, not built.
    pub fn perform_internal_injection(
        &mut self,
        workspace: &mut Workspace,
        registry: &NodeRegistry,
        graph: &Graph,
    ) -> CacheResult<()> {
        let mut count = 0;
        for &id in graph.nodes() {
            let prebuilt = registry.node(id);
            if !matches!(
                prebuilt.state,
                RebuildState::ExistsInCache | RebuildState::Unpacked
            ) {
                continue;
            }

            for dependent in registry.all_dependents(id) {
                let dependent_node = registry.node(dependent);
                if !dependent_node.is_waiting_for_rebuild() {
                    continue;
                }
                let should_link = prebuilt.dependents().contains(&dependent);
                self.add_as_prebuilt_dependency(workspace, prebuilt, &dependent_node.target, should_link)?;
                count += 1;
            }
        }

        info!("Injected {} prebuilt dependencies into rebuilt targets", count);
        Ok(())
    }

    /// Point the consumer at every node of the graph and drop the targets
    ///
    /// Only the graph root is linked; deeper nodes are reached through it.
    pub fn perform_outgoing_injection(
        &mut self,
        workspace: &mut Workspace,
        registry: &NodeRegistry,
        graph: &Graph,
        consumer: &TargetId,
    ) -> CacheResult<()> {
        for &id in graph.nodes() {
            let node = registry.node(id);
            self.add_as_prebuilt_dependency(workspace, node, consumer, id == graph.root())?;
            workspace.queue_target_removal(&node.target);
        }

        let consumer_name = workspace.require_target(consumer)?.name.clone();
        // A Pods aggregate in the graph means every node is embedded by the
        // generated Pods scripts
        if graph
            .node_by_name(registry, &pods::pods_target_name(&consumer_name))
            .is_some()
        {
            let settings = graph
                .dependent_settings
                .as_ref()
                .ok_or_else(|| CacheError::SettingsMissing {
                    target: consumer_name.clone(),
                    project: consumer.project.clone(),
                })?;
            let container = self.storage.container();
            pods::fix_embed_frameworks_script(workspace, consumer, settings, container)?;
            pods::fix_xcframeworks(workspace, consumer, settings, &self.configuration_name, container)?;
        } else {
            let frameworks: Vec<PathBuf> = graph
                .nodes()
                .iter()
                .map(|id| registry.node(*id))
                .filter(|node| node.product_kind == ProductKind::Framework)
                .map(|node| self.storage.storage_path(node).join(node.product_file_name()))
                .collect();
            embedder::embed_frameworks(workspace, consumer, &frameworks)?;
        }

        info!("Injected {} prebuilt target(s) into {}", graph.len(), consumer_name);
        Ok(())
    }

    fn add_as_prebuilt_dependency(
        &mut self,
        workspace: &mut Workspace,
        prebuilt: &Node,
        consumer: &TargetId,
        should_link: bool,
    ) -> CacheResult<()> {
        debug!("Adding {} as prebuilt to {}", prebuilt.name, consumer);

        match &prebuilt.product_kind {
            ProductKind::Framework => self.add_as_prebuilt_framework(workspace, prebuilt, consumer, should_link)?,
            ProductKind::StaticLibrary => {
                self.add_as_prebuilt_static_lib(workspace, prebuilt, consumer, should_link)?
            }
            kind @ (ProductKind::Bundle | ProductKind::Other(_)) => {
                return Err(CacheError::UnsupportedProductType {
                    name: prebuilt.name.clone(),
                    product_type: kind.uti().to_string(),
                })
            }
        }

        dependency::remove_dependency(workspace, prebuilt, consumer)?;
        debug!("Done with {} for {}", prebuilt.name, consumer);
        Ok(())
    }

    fn add_as_prebuilt_framework(
        &self,
        workspace: &mut Workspace,
        prebuilt: &Node,
        consumer: &TargetId,
        should_link: bool,
    ) -> CacheResult<()> {
        let artifact_location = self.storage.storage_path(prebuilt);
        let configuration = self.find_build_configuration(workspace, consumer)?;

        flags::add_framework_search_path(configuration, &artifact_location);
        flags::add_framework_headers_iquote(configuration, &artifact_location, prebuilt);
        if should_link {
            flags::add_framework_linker_flag(configuration, prebuilt);
        }

        headers::delete_headers(workspace, prebuilt)
    }

    fn add_as_prebuilt_static_lib(
        &mut self,
        workspace: &mut Workspace,
        prebuilt: &Node,
        consumer: &TargetId,
        should_link: bool,
    ) -> CacheResult<()> {
        let artifact_location = self.storage.storage_path(prebuilt);
        if !self.storage.has_headers(prebuilt) {
            headers::prepare_headers_for_injection(workspace, &mut self.storage, prebuilt)?;
            self.fix_staged_modulemap(prebuilt, &artifact_location)?;
        }

        let consumer_is_static_library =
            workspace.require_target(consumer)?.product_kind() == ProductKind::StaticLibrary;
        let consumer_dir = consumer
            .project
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let header_paths = self.storage.header_paths(prebuilt).to_vec();
        let staged_modulemap = self.storage.modulemap_path(prebuilt).map(Path::to_path_buf);
        let configuration = self.find_build_configuration(workspace, consumer)?;

        if should_link {
            flags::add_library_search_path(configuration, &artifact_location);
            flags::add_library_linker_flag(configuration, prebuilt, consumer_is_static_library);
        }

        for path in &header_paths {
            flags::add_headers_search_path(configuration, path);
            flags::add_iquote_path(configuration, path);
            flags::add_capital_i_path(configuration, path);
        }

        if let (Some(staged), Some(original)) = (staged_modulemap, prebuilt.modulemap_file_path()) {
            flags::fix_module_map_path(configuration, &consumer_dir, &[file_name_of(&original)], &staged)?;
        }
        Ok(())
    }

    /// Make the staged module map self-contained and expose the Swift
    /// interface header next to it
    fn fix_staged_modulemap(&self, prebuilt: &Node, artifact_location: &Path) -> CacheResult<()> {
        let Some(staged) = self.storage.modulemap_path(prebuilt) else {
            return Ok(());
        };
        modulemap::fix_header_paths(staged)?;

        let Some(header_name) = prebuilt.swift_objc_interface_header_file() else {
            return Ok(());
        };
        let header = artifact_location.join(header_name);
        if header.exists() {
            modulemap::append_swift_submodule(staged, &prebuilt.module_name(), &header)?;
        }
        Ok(())
    }

    fn find_build_configuration<'w>(
        &self,
        workspace: &'w mut Workspace,
        consumer: &TargetId,
    ) -> CacheResult<&'w mut BuildConfiguration> {
        workspace
            .target_mut(consumer)?
            .find_build_configuration_mut(&self.configuration_name)
    }
}
