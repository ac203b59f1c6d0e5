//! Adapter types for the external project model
//!
//! The core never sees the project file format. It works on these plain
//! data types, which a [`ProjectStore`](super::ProjectStore) fills in and
//! writes back.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Product type identifiers as they appear in project files
pub mod product_types {
    pub const FRAMEWORK: &str = "com.apple.product-type.framework";
    pub const STATIC_LIBRARY: &str = "com.apple.product-type.library.static";
    pub const BUNDLE: &str = "com.apple.product-type.bundle";
    pub const UNIT_TEST_BUNDLE: &str = "com.apple.product-type.bundle.unit-test";
    pub const UI_TEST_BUNDLE: &str = "com.apple.product-type.bundle.ui-testing";
}

/// Value identity of a target: uuid plus owning project path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId {
    pub project: PathBuf,
    pub uuid: String,
}

impl TargetId {
    pub fn new(project: impl Into<PathBuf>, uuid: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            uuid: uuid.into(),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project.display(), self.uuid)
    }
}

/// Kind of product a target builds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductKind {
    Framework,
    StaticLibrary,
    Bundle,
    Other(String),
}

impl ProductKind {
    /// Map a product type identifier to its kind
    pub fn from_uti(uti: &str) -> Self {
        match uti {
            product_types::FRAMEWORK => Self::Framework,
            product_types::STATIC_LIBRARY => Self::StaticLibrary,
            product_types::BUNDLE => Self::Bundle,
            other => Self::Other(other.to_string()),
        }
    }

    /// Product type identifier
    pub fn uti(&self) -> &str {
        match self {
            Self::Framework => product_types::FRAMEWORK,
            Self::StaticLibrary => product_types::STATIC_LIBRARY,
            Self::Bundle => product_types::BUNDLE,
            Self::Other(uti) => uti,
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framework => write!(f, "framework"),
            Self::StaticLibrary => write!(f, "static library"),
            Self::Bundle => write!(f, "bundle"),
            Self::Other(uti) => write!(f, "{}", uti),
        }
    }
}

/// Where a file reference is anchored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTree {
    /// Relative to the project directory
    #[default]
    Group,
    /// Absolute path on disk
    Absolute,
    /// Inside the build products directory (only exists after a build)
    BuiltProducts,
    /// Inside the SDK
    Sdk,
}

/// Reference to a file from a build phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileReference {
    /// Plain file reference
    File {
        path: PathBuf,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        source_tree: SourceTree,
    },
    /// Product of a target living in another project
    Proxy {
        path: PathBuf,
        remote_product_uuid: String,
        container: PathBuf,
    },
}

impl FileReference {
    /// Plain group-relative file reference
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            name: None,
            source_tree: SourceTree::Group,
        }
    }

    /// Path as written in the project
    pub fn path(&self) -> &Path {
        match self {
            Self::File { path, .. } | Self::Proxy { path, .. } => path,
        }
    }

    /// Name shown for the reference
    pub fn display_name(&self) -> String {
        if let Self::File {
            name: Some(name), ..
        } = self
        {
            return name.clone();
        }
        file_name_of(self.path())
    }

    /// Resolve to a path on disk, if the reference is anchored on disk
    pub fn real_path(&self, project_dir: &Path) -> Option<PathBuf> {
        match self {
            Self::File {
                path, source_tree, ..
            } => match source_tree {
                SourceTree::Group => Some(normalize_path(&project_dir.join(path))),
                SourceTree::Absolute => Some(normalize_path(path)),
                SourceTree::BuiltProducts | SourceTree::Sdk => None,
            },
            Self::Proxy { .. } => None,
        }
    }
}

/// One entry of a build phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFile {
    pub reference: FileReference,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl BuildFile {
    pub fn new(reference: FileReference) -> Self {
        Self {
            reference,
            attributes: vec![],
        }
    }

    pub fn display_name(&self) -> String {
        self.reference.display_name()
    }

    /// Whether this header is exposed publicly
    pub fn is_public(&self) -> bool {
        self.attributes.iter().any(|a| a == "Public")
    }
}

/// Build phase of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildPhase {
    Sources {
        files: Vec<BuildFile>,
    },
    Resources {
        files: Vec<BuildFile>,
    },
    Headers {
        files: Vec<BuildFile>,
    },
    Frameworks {
        files: Vec<BuildFile>,
    },
    CopyFiles {
        name: String,
        dst_path: String,
        #[serde(default)]
        dst_subfolder: String,
        files: Vec<BuildFile>,
    },
    ShellScript {
        name: String,
        script: String,
    },
}

impl BuildPhase {
    /// Files of the phase (scripts have none)
    pub fn files(&self) -> &[BuildFile] {
        match self {
            Self::Sources { files }
            | Self::Resources { files }
            | Self::Headers { files }
            | Self::Frameworks { files }
            | Self::CopyFiles { files, .. } => files,
            Self::ShellScript { .. } => &[],
        }
    }

    /// Whether the phase's files are build inputs of the target itself
    ///
    /// Linked binaries are products of other targets and enter the
    /// fingerprint through dependency fingerprints instead.
    pub fn contributes_inputs(&self) -> bool {
        !matches!(self, Self::Frameworks { .. } | Self::ShellScript { .. })
    }
}

/// Setting value: either a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Single(String),
    List(Vec<String>),
}

impl SettingValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.is_empty(),
            Self::List(values) => values.is_empty(),
        }
    }
}

/// Named build configuration of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
    pub name: String,
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
    /// External settings file, relative to the project directory
    #[serde(default)]
    pub base_configuration: Option<PathBuf>,
}

impl BuildConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: BTreeMap::new(),
            base_configuration: None,
        }
    }
}

/// Dependency declared on a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetDependency {
    /// Target in the same project
    Target { uuid: String },
    /// Target in another project, reached through a container proxy
    Proxy { remote_uuid: String, container: PathBuf },
}

impl TargetDependency {
    /// Uuid of the target the dependency points at
    pub fn target_uuid(&self) -> &str {
        match self {
            Self::Target { uuid } => uuid,
            Self::Proxy { remote_uuid, .. } => remote_uuid,
        }
    }
}

/// Reference to the product a target builds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReference {
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
}

impl ProductReference {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| file_name_of(Path::new(&self.path)))
    }
}

/// A target of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub platform: String,
    pub product_type: String,
    pub product: ProductReference,
    /// Aggregate targets have no product and are not graph nodes
    #[serde(default)]
    pub aggregate: bool,
    #[serde(default)]
    pub dependencies: Vec<TargetDependency>,
    #[serde(default)]
    pub phases: Vec<BuildPhase>,
    #[serde(default)]
    pub configurations: Vec<BuildConfiguration>,
}

impl Target {
    pub fn product_kind(&self) -> ProductKind {
        ProductKind::from_uti(&self.product_type)
    }

    pub fn is_test_target(&self) -> bool {
        matches!(
            self.product_type.as_str(),
            product_types::UNIT_TEST_BUNDLE | product_types::UI_TEST_BUNDLE
        )
    }

    /// Files of the "Link Binary With Libraries" phase
    pub fn linked_files(&self) -> &[BuildFile] {
        self.phases
            .iter()
            .find_map(|phase| match phase {
                BuildPhase::Frameworks { files } => Some(files.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn linked_files_mut(&mut self) -> Option<&mut Vec<BuildFile>> {
        self.phases.iter_mut().find_map(|phase| match phase {
            BuildPhase::Frameworks { files } => Some(files),
            _ => None,
        })
    }

    pub fn headers_mut(&mut self) -> Option<&mut Vec<BuildFile>> {
        self.phases.iter_mut().find_map(|phase| match phase {
            BuildPhase::Headers { files } => Some(files),
            _ => None,
        })
    }

    pub fn header_files(&self) -> &[BuildFile] {
        self.phases
            .iter()
            .find_map(|phase| match phase {
                BuildPhase::Headers { files } => Some(files.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Script of the shell script phase with the given name
    pub fn script(&self, phase_name: &str) -> Option<&str> {
        self.phases.iter().find_map(|phase| match phase {
            BuildPhase::ShellScript { name, script } if name == phase_name => {
                Some(script.as_str())
            }
            _ => None,
        })
    }

    pub fn find_build_configuration(&self, name: &str) -> CacheResult<&BuildConfiguration> {
        self.configurations
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CacheError::BuildConfigurationNotFound {
                configuration: name.to_string(),
                target: self.name.clone(),
            })
    }

    pub fn find_build_configuration_mut(
        &mut self,
        name: &str,
    ) -> CacheResult<&mut BuildConfiguration> {
        let target = self.name.clone();
        self.configurations
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or(CacheError::BuildConfigurationNotFound {
                configuration: name.to_string(),
                target,
            })
    }
}

/// Entry of a scheme's build action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeEntry {
    pub target_uuid: String,
    pub target_name: String,
}

/// Shared scheme of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    pub name: String,
    #[serde(default)]
    pub build_entries: Vec<SchemeEntry>,
}

/// A project file with its targets and schemes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Location of the project file, set by the store
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default)]
    pub targets: Vec<Target>,
    /// Embedded projects, relative to the project directory
    #[serde(default)]
    pub nested_projects: Vec<PathBuf>,
    #[serde(default)]
    pub schemes: Vec<Scheme>,
}

impl Project {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            targets: vec![],
            nested_projects: vec![],
            schemes: vec![],
        }
    }

    /// Directory containing the project file
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn target(&self, uuid: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.uuid == uuid)
    }

    pub fn target_mut(&mut self, uuid: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.uuid == uuid)
    }

    /// Absolute paths of nested projects
    pub fn nested_project_paths(&self) -> Vec<PathBuf> {
        let dir = self.dir();
        self.nested_projects
            .iter()
            .map(|p| normalize_path(&dir.join(p)))
            .collect()
    }
}

/// Last path component as a string
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lexically normalize a path, dropping `.` and resolving `..`
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}
