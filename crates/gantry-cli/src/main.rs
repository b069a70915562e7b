//! Gantry - container-based test orchestration CLI
//!
//! The `gantry` command builds one container image per target platform and
//! runs categorized test jobs inside them in parallel.
//!
//! ## Commands
//!
//! - `all`: run docs, flake8, pydocstyle and unit suites
//! - `build`: (re)build every platform image
//! - `clean`: remove every platform image
//! - `docs` / `flake8` / `pydocstyle` / `unit`: run one suite
//!
//! Exit code is 0 when every job succeeded, a failing job's exit code
//! otherwise, and 1 when interrupted.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gantry_core::{
    build_jobs, init_tracing, interrupt, suites, CommandMap, ContainerRuntime, ImageBuildManager,
    Platform, ProcessSupervisor, PyVersion, RunnerConfig, RESULTS_ROOT,
};
use tracing::{warn, Level};

/// Image name prefix; the image for platform P is `gantry/<P>`.
const IMAGE_PREFIX: &str = "gantry";

#[derive(Parser)]
#[command(name = "gantry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Container-based test orchestration", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every suite: docs, flake8, pydocstyle, unit
    All(RunArgs),

    /// Build the container image for every selected platform
    Build(CommonArgs),

    /// Remove the container image for every selected platform
    Clean(CommonArgs),

    /// Build the documentation inside each platform's container
    Docs(RunArgs),

    /// Run flake8 lint inside each platform's container
    Flake8(RunArgs),

    /// Run pydocstyle lint inside each platform's container
    Pydocstyle(RunArgs),

    /// Run the unit test suite inside each platform's container
    Unit(RunArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Container runtime to drive (docker or podman)
    #[arg(short = 'c', long, default_value = "docker")]
    container_runtime: String,

    /// Platform to target (repeatable; default: all known platforms)
    #[arg(short = 'r', long = "release")]
    release: Vec<String>,

    /// Allocate a pseudo-terminal for job containers (default)
    #[arg(long, overrides_with = "no_tty")]
    tty: bool,

    /// Do not allocate a pseudo-terminal
    #[arg(long)]
    no_tty: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Bind-mount a per-job host results directory into each container
    #[arg(short = 'a', long)]
    archive: bool,

    /// Stop the in-container test runner on its first failure
    #[arg(short = 'x', long)]
    failfast: bool,

    /// Reuse existing images instead of building missing ones
    #[arg(long)]
    no_build: bool,

    /// Python version to test under (repeatable: 2, 3; default: both)
    #[arg(short = 'p', long = "pyver")]
    pyver: Vec<String>,
}

impl CommonArgs {
    fn config(&self) -> Result<RunnerConfig> {
        let runtime: ContainerRuntime = self
            .container_runtime
            .parse()
            .context("invalid --container-runtime")?;
        let mut config = RunnerConfig::new(runtime, IMAGE_PREFIX);
        config.tty = self.tty || !self.no_tty;
        config.results_root = std::env::current_dir()
            .context("cannot determine working directory")?
            .join(RESULTS_ROOT);
        Ok(config)
    }

    fn platforms(&self) -> Result<Vec<Platform>> {
        if self.release.is_empty() {
            return Ok(Platform::all());
        }
        self.release
            .iter()
            .map(|r| r.parse().map_err(anyhow::Error::from))
            .collect()
    }
}

impl RunArgs {
    fn pyvers(&self) -> Result<Vec<PyVersion>> {
        if self.pyver.is_empty() {
            return Ok(vec![PyVersion::Py2, PyVersion::Py3]);
        }
        self.pyver
            .iter()
            .map(|p| p.parse().map_err(anyhow::Error::from))
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let config = common_args(&cli.command).config()?;

    // The interrupt remedy is an out-of-band stop batch addressed by the
    // container label, not a handle to the running children.
    let exit_code = tokio::select! {
        code = dispatch(&cli.command, &config) => code?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping labeled containers");
            if let Err(e) = interrupt::terminate_labeled(&config).await {
                warn!(error = %e, "Container cleanup failed");
            }
            1
        }
    };
    std::process::exit(exit_code);
}

fn common_args(command: &Commands) -> &CommonArgs {
    match command {
        Commands::Build(args) | Commands::Clean(args) => args,
        Commands::All(args)
        | Commands::Docs(args)
        | Commands::Flake8(args)
        | Commands::Pydocstyle(args)
        | Commands::Unit(args) => &args.common,
    }
}

async fn dispatch(command: &Commands, config: &RunnerConfig) -> Result<i32> {
    match command {
        Commands::All(args) => {
            let maps = suites::all(&args.pyvers()?, args.failfast)?;
            cmd_run_suites(maps, args, config).await
        }
        Commands::Build(args) => cmd_build(args, config).await,
        Commands::Clean(args) => cmd_clean(args, config).await,
        Commands::Docs(args) => cmd_run_suites(suites::docs(), args, config).await,
        Commands::Flake8(args) => {
            let maps = suites::flake8(&args.pyvers()?)?;
            cmd_run_suites(maps, args, config).await
        }
        Commands::Pydocstyle(args) => {
            let maps = suites::pydocstyle(&args.pyvers()?)?;
            cmd_run_suites(maps, args, config).await
        }
        Commands::Unit(args) => {
            let maps = suites::unit(&args.pyvers()?, args.failfast)?;
            cmd_run_suites(maps, args, config).await
        }
    }
}

/// Ensure images, expand the maps over the selected platforms, run the
/// batch and print the report. Returns the aggregate exit code.
async fn cmd_run_suites(
    maps: Vec<CommandMap>,
    args: &RunArgs,
    config: &RunnerConfig,
) -> Result<i32> {
    let platforms = args.common.platforms()?;
    let mut config = config.clone();
    config.archive = args.archive;

    let supervisor = ProcessSupervisor::new(config.clone());

    if !args.no_build {
        let report = ImageBuildManager::new(config.clone())
            .ensure_images(&platforms, false)
            .await
            .context("image build failed")?;
        if !report.results.is_empty() {
            supervisor.print_report(&report);
        }
        if !report.success() {
            return Ok(report.exit_code);
        }
    }

    let jobs = build_jobs(&maps, &platforms, &config)?;
    let report = supervisor.run(jobs).await?;
    supervisor.print_report(&report);
    Ok(report.exit_code)
}

/// Rebuild every selected platform's image unconditionally.
async fn cmd_build(args: &CommonArgs, config: &RunnerConfig) -> Result<i32> {
    let platforms = args.platforms()?;
    let report = ImageBuildManager::new(config.clone())
        .ensure_images(&platforms, true)
        .await
        .context("image build failed")?;
    ProcessSupervisor::new(config.clone()).print_report(&report);
    Ok(report.exit_code)
}

/// Remove every selected platform's image.
async fn cmd_clean(args: &CommonArgs, config: &RunnerConfig) -> Result<i32> {
    let platforms = args.platforms()?;
    let report = ImageBuildManager::new(config.clone())
        .remove_images(&platforms)
        .await
        .context("image removal failed")?;
    ProcessSupervisor::new(config.clone()).print_report(&report);
    Ok(report.exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_unit_subcommand_flags() {
        let cli = Cli::parse_from([
            "gantry", "unit", "-x", "-a", "--no-build", "-p", "3", "-r", "centos8", "-c",
            "podman", "--no-tty",
        ]);
        let Commands::Unit(args) = cli.command else {
            panic!("expected unit subcommand");
        };
        assert!(args.failfast);
        assert!(args.archive);
        assert!(args.no_build);
        assert_eq!(args.pyvers().unwrap(), vec![PyVersion::Py3]);
        assert_eq!(args.common.platforms().unwrap().len(), 1);
        let config = args.common.config().unwrap();
        assert_eq!(config.runtime, ContainerRuntime::Podman);
        assert!(!config.tty);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["gantry", "flake8"]);
        let Commands::Flake8(args) = cli.command else {
            panic!("expected flake8 subcommand");
        };
        assert_eq!(
            args.pyvers().unwrap(),
            vec![PyVersion::Py2, PyVersion::Py3]
        );
        assert_eq!(
            args.common.platforms().unwrap(),
            Platform::all(),
            "default is the full known platform set"
        );
        let config = args.common.config().unwrap();
        assert_eq!(config.runtime, ContainerRuntime::Docker);
        assert!(config.tty);
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let cli = Cli::parse_from(["gantry", "docs", "-r", "slackware"]);
        let Commands::Docs(args) = cli.command else {
            panic!("expected docs subcommand");
        };
        assert!(args.common.platforms().is_err());
    }
}
