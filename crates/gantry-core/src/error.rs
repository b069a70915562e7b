//! Error types for orchestration operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// The runtime executable itself could not be started. Fatal: aborts
    /// the whole batch, no sibling job keeps running unsupervised.
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An `images` or `ps` query against the runtime failed.
    #[error("container runtime query failed: {0}")]
    Discovery(String),

    #[error("unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("unsupported container runtime '{0}' (expected docker or podman)")]
    UnknownRuntime(String),

    #[error("unknown python version '{0}' (expected 2 or 3)")]
    UnknownPyVersion(String),

    #[error("duplicate job label '{0}' in batch")]
    DuplicateLabel(String),

    #[error("command map '{label}' has an override for unknown platform '{platform}'")]
    InvalidOverride { label: String, platform: String },

    #[error("empty batch: no jobs to run")]
    EmptyBatch,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;
