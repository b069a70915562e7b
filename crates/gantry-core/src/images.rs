//! Image build manager: one container image per platform, built on demand.

use crate::error::{OrchestratorError, Result};
use crate::invocation::RunnerConfig;
use crate::job::{BatchReport, JobDescriptor};
use crate::platform::Platform;
use crate::supervisor::ProcessSupervisor;
use tokio::process::Command;
use tracing::{debug, info};

/// Directory the per-platform Dockerfiles live in, relative to the
/// working directory (which is also the build context).
pub const DOCKERFILE_DIR: &str = "dockerfiles";

/// Ensures images exist for a set of platforms, building missing ones in
/// parallel through the process supervisor.
pub struct ImageBuildManager {
    config: RunnerConfig,
}

impl ImageBuildManager {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Build images for every platform that needs one.
    ///
    /// With `force_rebuild` every platform is rebuilt unconditionally;
    /// otherwise only platforms whose image reference is absent from the
    /// runtime's local image list. A failed build surfaces as a failed
    /// job result for that platform and does not block sibling builds.
    /// When nothing needs building, no batch is submitted at all.
    pub async fn ensure_images(
        &self,
        platforms: &[Platform],
        force_rebuild: bool,
    ) -> Result<BatchReport> {
        let mut to_build = Vec::new();
        for platform in platforms {
            if force_rebuild || !self.image_exists(platform).await? {
                to_build.push(platform.clone());
            } else {
                debug!(platform = %platform, "Image present, skipping build");
            }
        }

        if to_build.is_empty() {
            info!("All images present, nothing to build");
            return Ok(BatchReport::from_results(Vec::new()));
        }

        info!(count = to_build.len(), "Building platform images");
        let jobs = self.build_jobs(&to_build);
        ProcessSupervisor::new(self.config.clone()).run(jobs).await
    }

    /// Remove every platform's image (`clean` subcommand).
    pub async fn remove_images(&self, platforms: &[Platform]) -> Result<BatchReport> {
        let width = platform_width(platforms);
        let jobs = platforms
            .iter()
            .map(|platform| {
                JobDescriptor::new(
                    format!("{:<width$}-rmi", platform.as_str()),
                    vec![
                        self.config.runtime.executable().to_string(),
                        "rmi".to_string(),
                        self.config.image_ref(platform),
                    ],
                )
            })
            .collect();
        ProcessSupervisor::new(self.config.clone()).run(jobs).await
    }

    /// Query the runtime's local image list for this platform's reference.
    ///
    /// `<runtime> images <ref>` prints a header line plus one row per
    /// matching image; anything beyond the header means present. A failing
    /// query is a fatal discovery error, never a silent "absent".
    async fn image_exists(&self, platform: &Platform) -> Result<bool> {
        let image_ref = self.config.image_ref(platform);
        let output = Command::new(self.config.runtime.executable())
            .args(["images", &image_ref])
            .output()
            .await
            .map_err(|e| {
                OrchestratorError::Discovery(format!(
                    "cannot run '{} images': {e}",
                    self.config.runtime.executable()
                ))
            })?;

        if !output.status.success() {
            return Err(OrchestratorError::Discovery(format!(
                "'{} images {image_ref}' exited with {}",
                self.config.runtime.executable(),
                output.status.code().unwrap_or(-1)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).lines().count() > 1)
    }

    fn build_jobs(&self, platforms: &[Platform]) -> Vec<JobDescriptor> {
        let width = platform_width(platforms);
        platforms
            .iter()
            .map(|platform| {
                JobDescriptor::new(
                    format!("{:<width$}-build", platform.as_str()),
                    vec![
                        self.config.runtime.executable().to_string(),
                        "build".to_string(),
                        "--pull".to_string(),
                        "-t".to_string(),
                        self.config.image_ref(platform),
                        "-f".to_string(),
                        format!("{DOCKERFILE_DIR}/Dockerfile.{platform}"),
                        ".".to_string(),
                    ],
                )
            })
            .collect()
    }
}

fn platform_width(platforms: &[Platform]) -> usize {
    platforms
        .iter()
        .map(|p| p.as_str().len())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ContainerRuntime;

    fn manager() -> ImageBuildManager {
        ImageBuildManager::new(RunnerConfig::new(ContainerRuntime::Docker, "gantry"))
    }

    fn plat(s: &str) -> Platform {
        s.parse().unwrap()
    }

    #[test]
    fn test_build_job_argv() {
        let jobs = manager().build_jobs(&[plat("centos8")]);
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs[0].argv,
            vec![
                "docker",
                "build",
                "--pull",
                "-t",
                "gantry/centos8",
                "-f",
                "dockerfiles/Dockerfile.centos8",
                "."
            ]
        );
    }

    #[test]
    fn test_build_labels_padded() {
        let jobs = manager().build_jobs(&[plat("centos7"), plat("ubuntu2004")]);
        assert_eq!(jobs[0].label, "centos7   -build");
        assert_eq!(jobs[1].label, "ubuntu2004-build");
    }
}
