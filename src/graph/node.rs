//! Graph nodes

use crate::error::{CacheError, CacheResult};
use crate::project::model::{file_name_of, normalize_path};
use crate::project::{ProductKind, ProductReference, Target, TargetId};
use crate::settings::SettingsContainer;
use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a node inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Rebuild decision for a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RebuildState {
    #[default]
    Unknown,
    EvaluatingDependencies,
    ExistsInCache,
    WaitingForRebuild,
    Unpacked,
    RebuiltAndCached,
}

impl fmt::Display for RebuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::EvaluatingDependencies => "evaluating_dependencies",
            Self::ExistsInCache => "exists_in_cache",
            Self::WaitingForRebuild => "waiting_for_rebuild",
            Self::Unpacked => "unpacked",
            Self::RebuiltAndCached => "rebuilt_and_cached",
        };
        f.write_str(name)
    }
}

/// One build target in the graph
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub target: TargetId,
    pub product_kind: ProductKind,
    pub product: ProductReference,
    pub platform: String,
    pub sha: Option<String>,
    pub state: RebuildState,
    pub settings: Option<SettingsContainer>,
    pub(crate) dependencies: Vec<NodeId>,
    pub(crate) dependents: Vec<NodeId>,
}

impl Node {
    pub fn new(target_id: TargetId, target: &Target) -> Self {
        Self {
            name: target.name.clone(),
            target: target_id,
            product_kind: target.product_kind(),
            product: target.product.clone(),
            platform: target.platform.clone(),
            sha: None,
            state: RebuildState::Unknown,
            settings: None,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub fn dependents(&self) -> &[NodeId] {
        &self.dependents
    }

    pub fn project_dir(&self) -> PathBuf {
        self.target
            .project
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn sha(&self) -> CacheResult<&str> {
        self.sha
            .as_deref()
            .ok_or_else(|| CacheError::FingerprintMissing(self.name.clone()))
    }

    pub fn settings(&self) -> CacheResult<&SettingsContainer> {
        self.settings
            .as_ref()
            .ok_or_else(|| CacheError::SettingsMissing {
                target: self.name.clone(),
                project: self.target.project.clone(),
            })
    }

    pub fn is_waiting_for_rebuild(&self) -> bool {
        self.state == RebuildState::WaitingForRebuild
    }

    /// File name of the built product, e.g. `Core.framework` or `libCore.a`
    pub fn product_file_name(&self) -> String {
        if let Some(name) = self
            .settings
            .as_ref()
            .and_then(SettingsContainer::full_product_name)
        {
            return name.to_string();
        }

        if self.product_kind == ProductKind::Framework {
            if let Some(name) = &self.product.name {
                return name.clone();
            }
        }

        file_name_of(Path::new(&self.product.path))
    }

    pub fn dsym_file_name(&self) -> String {
        self.settings
            .as_ref()
            .and_then(SettingsContainer::dwarf_dsym_file_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.dSYM", self.product_file_name()))
    }

    pub fn module_name(&self) -> String {
        self.settings
            .as_ref()
            .and_then(SettingsContainer::product_module_name)
            .unwrap_or(&self.name)
            .to_string()
    }

    /// Module map declared by the target, resolved against its project
    pub fn modulemap_file_path(&self) -> Option<PathBuf> {
        let path = self.settings.as_ref()?.modulemap_file()?;
        Some(normalize_path(&self.project_dir().join(path)))
    }

    /// Generated Objective-C interface header of a Swift target
    pub fn swift_objc_interface_header_file(&self) -> Option<String> {
        self.settings
            .as_ref()?
            .swift_objc_interface_header_name()
            .map(str::to_string)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl Eq for Node {}
