//! Invocation builder: expands command maps over target platforms into
//! concrete container-run job descriptors.
//!
//! Purely descriptor construction; nothing here executes a process.

use crate::command_map::CommandMap;
use crate::error::{OrchestratorError, Result};
use crate::job::JobDescriptor;
use crate::platform::Platform;
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;

/// Label attached to every container we start, read back by the interrupt
/// handler to discover in-flight containers.
pub const CONTAINER_LABEL: &str = "gantry";

/// Fixed in-container path jobs copy their result artifacts to.
pub const RESULTS_MOUNT: &str = "/results";

/// Host directory (relative to the working directory) result volumes live
/// under, one subdirectory per `<platform>-<label>` job.
pub const RESULTS_ROOT: &str = "test_results";

/// Which container runtime executable drives the jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    pub fn executable(&self) -> &'static str {
        match self {
            ContainerRuntime::Docker => "docker",
            ContainerRuntime::Podman => "podman",
        }
    }

    /// Delay between successive container launches. Podman races on
    /// resolving a local tag when many containers start at once, so its
    /// launches are spaced out.
    pub fn launch_stagger(&self) -> Option<std::time::Duration> {
        match self {
            ContainerRuntime::Docker => None,
            ContainerRuntime::Podman => Some(std::time::Duration::from_secs(2)),
        }
    }
}

impl FromStr for ContainerRuntime {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(ContainerRuntime::Docker),
            "podman" => Ok(ContainerRuntime::Podman),
            other => Err(OrchestratorError::UnknownRuntime(other.to_string())),
        }
    }
}

/// Explicit configuration threaded through the builder, image manager and
/// supervisor. There is no ambient/global runtime state.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Runtime executable to invoke.
    pub runtime: ContainerRuntime,

    /// Image name prefix; the image for platform P is `<prefix>/<P>`.
    pub image_prefix: String,

    /// Allocate a pseudo-terminal for job containers and colorize the
    /// final report.
    pub tty: bool,

    /// Bind-mount a per-job host results directory into the container.
    pub archive: bool,

    /// Absolute host directory result volumes are created under.
    pub results_root: PathBuf,
}

impl RunnerConfig {
    pub fn new(runtime: ContainerRuntime, image_prefix: impl Into<String>) -> Self {
        Self {
            runtime,
            image_prefix: image_prefix.into(),
            tty: true,
            archive: false,
            results_root: PathBuf::from(RESULTS_ROOT),
        }
    }

    /// Fully-qualified image reference for a platform.
    pub fn image_ref(&self, platform: &Platform) -> String {
        format!("{}/{}", self.image_prefix, platform)
    }
}

/// Expand `maps` × `platforms` into container-run job descriptors.
///
/// Report labels are `<platform>-<label>` with both fields right-padded to
/// the widest value in the batch, so the per-line output prefixes and the
/// final status table stay column-aligned.
pub fn build_jobs(
    maps: &[CommandMap],
    platforms: &[Platform],
    config: &RunnerConfig,
) -> Result<Vec<JobDescriptor>> {
    if maps.is_empty() || platforms.is_empty() {
        return Err(OrchestratorError::EmptyBatch);
    }

    let mut seen = HashSet::new();
    for map in maps {
        if !seen.insert(map.label.as_str()) {
            return Err(OrchestratorError::DuplicateLabel(map.label.clone()));
        }
    }

    let platform_width = platforms
        .iter()
        .map(|p| p.as_str().len())
        .max()
        .unwrap_or(0);
    let label_width = maps.iter().map(|m| m.label.len()).max().unwrap_or(0);

    let mut jobs = Vec::with_capacity(maps.len() * platforms.len());
    for platform in platforms {
        for map in maps {
            let mut argv = vec![
                config.runtime.executable().to_string(),
                "run".to_string(),
                "--network".to_string(),
                "none".to_string(),
                "--rm".to_string(),
                "--label".to_string(),
                CONTAINER_LABEL.to_string(),
            ];
            if config.tty {
                argv.push("-t".to_string());
            }
            if config.archive {
                let host_dir = config
                    .results_root
                    .join(format!("{}-{}", platform, map.label));
                argv.push("-v".to_string());
                argv.push(format!("{}:{}", host_dir.display(), RESULTS_MOUNT));
            }
            argv.push(config.image_ref(platform));
            argv.extend(map.resolve(platform));

            let label = format!(
                "{:<pw$}-{:<lw$}",
                platform.as_str(),
                map.label,
                pw = platform_width,
                lw = label_width,
            );
            jobs.push(JobDescriptor::new(label, argv));
        }
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_map::CommandMap;

    fn plat(s: &str) -> Platform {
        s.parse().unwrap()
    }

    fn config() -> RunnerConfig {
        RunnerConfig::new(ContainerRuntime::Docker, "gantry")
    }

    #[test]
    fn test_expands_maps_across_platforms() {
        let maps = vec![CommandMap::new("flake8", "true")];
        let platforms = vec![plat("centos7"), plat("centos8")];
        let jobs = build_jobs(&maps, &platforms, &config()).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].label, "centos7-flake8");
        assert_eq!(jobs[1].label, "centos8-flake8");
    }

    #[test]
    fn test_run_argv_shape() {
        let maps = vec![CommandMap::new("unit", vec!["python3", "-m", "pytest"])];
        let jobs = build_jobs(&maps, &[plat("debian11")], &config()).unwrap();
        let argv = &jobs[0].argv;

        assert_eq!(argv[0], "docker");
        assert_eq!(argv[1], "run");
        assert!(argv.contains(&"--network".to_string()));
        assert!(argv.contains(&"none".to_string()));
        assert!(argv.contains(&"--rm".to_string()));
        assert!(argv.contains(&CONTAINER_LABEL.to_string()));
        assert!(argv.contains(&"-t".to_string()));
        // Image ref precedes the job command.
        let image_pos = argv.iter().position(|a| a == "gantry/debian11").unwrap();
        assert_eq!(&argv[image_pos + 1..], ["python3", "-m", "pytest"]);
    }

    #[test]
    fn test_no_tty_omits_flag() {
        let mut cfg = config();
        cfg.tty = false;
        let maps = vec![CommandMap::new("docs", "./ci/build-docs.sh")];
        let jobs = build_jobs(&maps, &[plat("fedora34")], &cfg).unwrap();
        assert!(!jobs[0].argv.contains(&"-t".to_string()));
    }

    #[test]
    fn test_archive_mounts_deterministic_results_dir() {
        let mut cfg = config();
        cfg.archive = true;
        cfg.results_root = PathBuf::from("/work/test_results");
        let maps = vec![CommandMap::new("unit", "true")];
        let jobs = build_jobs(&maps, &[plat("centos8")], &cfg).unwrap();

        let vol_pos = jobs[0].argv.iter().position(|a| a == "-v").unwrap();
        assert_eq!(
            jobs[0].argv[vol_pos + 1],
            format!("/work/test_results/centos8-unit:{RESULTS_MOUNT}")
        );
    }

    #[test]
    fn test_labels_padded_to_batch_width() {
        let maps = vec![
            CommandMap::new("docs", "true"),
            CommandMap::new("pydocstyle", "true"),
        ];
        let platforms = vec![plat("centos7"), plat("ubuntu2004")];
        let jobs = build_jobs(&maps, &platforms, &config()).unwrap();

        let widths: HashSet<usize> = jobs.iter().map(|j| j.label.len()).collect();
        assert_eq!(widths.len(), 1, "all labels share one width");
        assert_eq!(jobs[0].label, "centos7   -docs      ");
    }

    #[test]
    fn test_only_podman_staggers_launches() {
        assert_eq!(ContainerRuntime::Docker.launch_stagger(), None);
        assert_eq!(
            ContainerRuntime::Podman.launch_stagger(),
            Some(std::time::Duration::from_secs(2))
        );
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let maps = vec![CommandMap::new("unit", "true"), CommandMap::new("unit", "false")];
        let err = build_jobs(&maps, &[plat("centos7")], &config()).unwrap_err();
        assert!(matches!(err, OrchestratorError::DuplicateLabel(_)));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let err = build_jobs(&[], &[plat("centos7")], &config()).unwrap_err();
        assert!(matches!(err, OrchestratorError::EmptyBatch));
    }
}
