//! Interrupt handling: stop every container this tool started.
//!
//! Containers are discovered by the fixed label the invocation builder
//! attaches, not by handle to the original child processes. A prior
//! batch's children may still be outstanding when this runs; they are not
//! joined here, the runtime ends them when their containers stop.

use crate::error::{OrchestratorError, Result};
use crate::invocation::{RunnerConfig, CONTAINER_LABEL};
use crate::job::{BatchReport, JobDescriptor};
use crate::supervisor::ProcessSupervisor;
use tokio::process::Command;
use tracing::{info, warn};

/// Stop all running containers carrying this tool's label, as one batch
/// of `stop` jobs through the process supervisor.
pub async fn terminate_labeled(config: &RunnerConfig) -> Result<BatchReport> {
    let ids = discover_labeled(config).await?;
    if ids.is_empty() {
        info!("No labeled containers running");
        return Ok(BatchReport::from_results(Vec::new()));
    }

    warn!(count = ids.len(), "Stopping in-flight containers");
    let jobs = ids
        .iter()
        .map(|id| {
            JobDescriptor::new(
                format!("stop-{id}"),
                vec![
                    config.runtime.executable().to_string(),
                    "stop".to_string(),
                    id.clone(),
                ],
            )
        })
        .collect();
    ProcessSupervisor::new(config.clone()).run(jobs).await
}

/// List the ids of running containers carrying this tool's label.
async fn discover_labeled(config: &RunnerConfig) -> Result<Vec<String>> {
    let output = Command::new(config.runtime.executable())
        .args(["ps", &format!("--filter=label={CONTAINER_LABEL}"), "-q"])
        .output()
        .await
        .map_err(|e| {
            OrchestratorError::Discovery(format!(
                "cannot run '{} ps': {e}",
                config.runtime.executable()
            ))
        })?;

    if !output.status.success() {
        return Err(OrchestratorError::Discovery(format!(
            "'{} ps' exited with {}",
            config.runtime.executable(),
            output.status.code().unwrap_or(-1)
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
