//! Project model adapter
//!
//! Narrow view of the external project files: the data types the core
//! reads and mutates, the store that loads and saves them, and the
//! workspace holding everything touched during a run.

pub mod model;
mod store;
mod workspace;
pub mod xcconfig;

pub use model::{
    BuildConfiguration, BuildFile, BuildPhase, FileReference, ProductKind, ProductReference,
    Project, Scheme, SchemeEntry, SettingValue, SourceTree, Target, TargetDependency, TargetId,
};
pub use store::{JsonProjectStore, ProjectStore};
pub use workspace::Workspace;
pub use xcconfig::Xcconfig;
