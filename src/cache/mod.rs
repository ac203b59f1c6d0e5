//! Content-addressed artifact store
//!
//! One artifact per `(node name, fingerprint)`. Entries are immutable: the
//! fingerprint already covers everything that goes into the artifact, so a
//! second store under the same key means the run processed a node twice and
//! is reported instead of overwriting.
//!
//! # Layout
//!
//! | Path | Content |
//! |------|---------|
//! | `<root>/<name>/<sha>` | gzip-compressed tar of the product |
//! | `<root>/<name>/<sha>.state` | optional plain-text manifest |

pub mod archive;
mod local;

pub use local::{format_bytes, LocalStorage, MANIFEST_EXTENSION};

use crate::error::CacheResult;
use crate::graph::Node;
use std::path::{Path, PathBuf};

/// Name and fingerprint of a stored node's direct dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyFingerprint {
    pub name: String,
    pub sha: String,
}

/// Storage backend for node artifacts
pub trait ArtifactStore {
    /// Location of the node's artifact, if one is stored for its fingerprint
    fn cached_artifact_path(&self, node: &Node) -> CacheResult<Option<PathBuf>>;

    /// Archive `source` under the node's key; fails if the key is taken
    fn store(
        &self,
        node: &Node,
        dependencies: &[DependencyFingerprint],
        source: &Path,
    ) -> CacheResult<()>;

    /// Extract the node's artifact into `destination`
    fn unpack(&self, node: &Node, destination: &Path) -> CacheResult<()>;
}
