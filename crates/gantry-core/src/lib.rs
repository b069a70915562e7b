//! Gantry core - container test-job orchestration
//!
//! Provides the pieces the `gantry` CLI is assembled from:
//! - Declarative command maps with per-platform overrides
//! - Expansion of maps × platforms into container-run job descriptors
//! - Build-if-missing image management
//! - Concurrent process supervision with grouped output reporting
//! - Label-based termination of in-flight containers on interruption

pub mod command_map;
pub mod error;
pub mod images;
pub mod interrupt;
pub mod invocation;
pub mod job;
pub mod platform;
pub mod suites;
pub mod supervisor;
pub mod telemetry;

// Re-export key types
pub use command_map::{ArgumentList, CommandMap};
pub use error::{OrchestratorError, Result};
pub use images::{ImageBuildManager, DOCKERFILE_DIR};
pub use invocation::{
    build_jobs, ContainerRuntime, RunnerConfig, CONTAINER_LABEL, RESULTS_MOUNT, RESULTS_ROOT,
};
pub use job::{BatchReport, JobDescriptor, JobResult};
pub use platform::{Platform, PyVersion, KNOWN_PLATFORMS};
pub use supervisor::ProcessSupervisor;
pub use telemetry::init_tracing;
