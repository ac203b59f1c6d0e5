//! Error types for xccache
//!
//! All modules use `CacheResult<T>` as their return type. Every variant is
//! fatal for the target being processed: the runner never attempts partial
//! success.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for xccache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in xccache
#[derive(Error, Debug)]
pub enum CacheError {
    // Configuration / usage errors
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Target for {reference} not found (required by {requester})")]
    DependencyTargetNotFound { reference: String, requester: String },

    #[error("Found more than one target with product {product}: {candidates}")]
    AmbiguousTarget { product: String, candidates: String },

    #[error("{name} has unsupported product type: {product_type}")]
    UnsupportedProductType { name: String, product_type: String },

    #[error("{configuration} build configuration not found on target {target}")]
    BuildConfigurationNotFound {
        configuration: String,
        target: String,
    },

    #[error("No build settings loaded for {target} in {}", project.display())]
    SettingsMissing { target: String, project: PathBuf },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Cache file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Project not found: {0}")]
    ProjectNotFound(PathBuf),

    // Structural graph errors
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    // Cache / storage integrity errors
    #[error("Artifact cache path {0} is already taken")]
    ArtifactExists(PathBuf),

    #[error("No cached artifact for {name} ({sha})")]
    ArtifactNotFound { name: String, sha: String },

    #[error("State file already exists: {0}")]
    ManifestExists(PathBuf),

    #[error("No artifact found at path {0}")]
    ArtifactSourceMissing(PathBuf),

    #[error("Injection storage path is already busy: {0}")]
    StagingBusy(PathBuf),

    #[error("Fingerprint not calculated for {0}")]
    FingerprintMissing(String),

    // External tool failures
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command}\nexecution failed\n{output}")]
    CommandExecution { command: String, output: String },

    #[error("Failed to build {scheme}")]
    BuildFailed { scheme: String },

    #[error("{kind} product not found for {target}")]
    ProductNotFound { kind: String, target: String },

    // Hashing errors
    #[error("Cannot read input file {path}: {source}")]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Whether the error means the artifact store holds inconsistent data
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::ArtifactExists(_)
                | Self::ArtifactNotFound { .. }
                | Self::ManifestExists(_)
                | Self::StagingBusy(_)
        )
    }

    /// Process exit code; store inconsistencies are told apart from other failures
    pub fn exit_code(&self) -> u8 {
        if self.is_integrity_violation() {
            2
        } else {
            1
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Create a Cachefile or pass --cachefile"),
            Self::CircularDependency { .. } => {
                Some("Break the cycle in the target dependencies before caching")
            }
            Self::ArtifactExists(_) | Self::ManifestExists(_) => {
                Some("The store already holds this fingerprint; remove the entry to re-cache it")
            }
            Self::StagingBusy(_) => Some("Clean the derived data directory and retry"),
            Self::AmbiguousTarget { .. } => {
                Some("Rename one of the products or give the targets distinct platforms")
            }
            _ => None,
        }
    }
}
