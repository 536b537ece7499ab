//! # oasis-build
//!
//! Command-line tool that assembles the Oasis release bundle.
//!
//! ## Overview
//!
//! `oasis-build` is the CLI front end of [`oasis_build_sdk`]. One invocation:
//!
//! - **Frontend** - Installs dependencies and builds the web assets with npm
//! - **Backend** - Compiles the server with cargo, for the host or cross-compiled
//! - **Bundle** - Stages the assets, the executable and a sample configuration
//!   into `release/oasis` (or `release/oasis-<triple>` for cross builds)
//!
//! ## Quick Start
//!
//! ```bash
//! # Build for the host
//! oasis-build
//!
//! # Cross-compile the backend for Windows
//! oasis-build cross
//!
//! # Show what would run without touching anything
//! oasis-build cross --dry-run --json
//!
//! # Write a starter configuration file
//! oasis-build --init
//! ```
//!
//! ## Output Directory
//!
//! ```text
//! release/
//! ├── oasis/                          # native bundle
//! │   ├── oasis
//! │   ├── oasis.conf.sample
//! │   └── public/
//! └── oasis-x86_64-pc-windows-gnu/    # cross bundle
//!     ├── oasis.exe
//!     ├── oasis.conf.sample
//!     └── public/
//! ```
//!
//! Each invocation only resets the bundle for its own mode.
//!
//! ## CLI Flags
//!
//! - **`--dry-run`** - Print the planned steps without making changes
//! - **`--json`** - With `--dry-run`, print the plan as JSON
//! - **`--verbose` / `-v`** - Show every command and debug logging
//! - **`--skip-preflight`** - Do not check for npm, cargo and rustup targets
//! - **`--profile`** - Override the cargo profile (`release` or `debug`)
//!
//! ## Exit Status
//!
//! `0` on success. When a sub-process fails, its exit code is passed
//! through; every other failure exits with `1`.
//!
//! ## Modules
//!
//! - [`config`] - Configuration file support for `oasis-build.toml`

#![cfg_attr(docsrs, feature(doc_cfg))]

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use oasis_build_sdk::{BuildError, BuildProfile, InvocationMode, ReleaseBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use config::{CONFIG_FILE_NAME, ConfigResolver, OasisBuildConfig};

pub mod config;

/// Builds the Oasis frontend and backend into a release bundle.
#[derive(Parser, Debug)]
#[command(name = "oasis-build", author, version, about = "Assemble the Oasis release bundle", long_about = None)]
pub struct Cli {
    /// Build mode: `cross` cross-compiles the backend, anything else builds for the host
    mode: Option<String>,

    /// Root of the Oasis repository
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Path to a config file (default: discover oasis-build.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print what would be done without actually doing it
    #[arg(long)]
    dry_run: bool,

    /// Print the dry-run plan as JSON
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Print verbose output including all commands
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Skip the host tool checks
    #[arg(long)]
    skip_preflight: bool,

    /// Cargo profile for the backend
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Write a starter oasis-build.toml and exit
    #[arg(long, conflicts_with_all = ["mode", "dry_run"])]
    init: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    Debug,
    Release,
}

impl From<ProfileArg> for BuildProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Debug => BuildProfile::Debug,
            ProfileArg::Release => BuildProfile::Release,
        }
    }
}

/// Parses the command line and runs the build.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_with(cli)
}

/// Maps a failed run to the process exit code.
///
/// A failing sub-process passes its own exit code through; everything else
/// exits with `1`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BuildError>()
        .map(BuildError::exit_code)
        .unwrap_or(1)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_with(cli: Cli) -> Result<()> {
    let project_root = std::fs::canonicalize(&cli.project_root)
        .with_context(|| format!("Project root not found: {:?}", cli.project_root))?;

    if cli.init {
        return cmd_init(&project_root, cli.config.as_deref());
    }

    load_dotenv(&project_root);

    let mode = parse_mode(cli.mode.as_deref());
    let resolver = ConfigResolver::load(&project_root, cli.config.as_deref())?;
    if let Some(path) = &resolver.config_path {
        debug!(path = %path.display(), "loaded config file");
    }

    let mut project = resolver.project_spec(&project_root)?;
    project.backend.profile = resolver.resolve(
        cli.profile.map(BuildProfile::from),
        |c| Some(c.backend.profile),
        BuildProfile::Release,
    );
    let preflight = !cli.skip_preflight
        && resolver.resolve(None, |c| Some(c.project.preflight), true);

    let result = ReleaseBuilder::new(project)
        .verbose(cli.verbose)
        .dry_run(cli.dry_run)
        .json(cli.json)
        .preflight(preflight)
        .build(mode)?;

    if result.dry_run {
        if !cli.json {
            println!("\nDry run complete: {} step(s), nothing was changed.", result.steps);
        }
    } else {
        println!(
            "\nBuild complete in {:.1}s. Please check the '{}' directory.",
            result.elapsed.as_secs_f64(),
            result.release_root.display()
        );
    }

    Ok(())
}

/// Maps the positional mode argument to a build mode.
///
/// Only `cross` (any case) selects cross mode. Unrecognized values fall back
/// to a native build with a warning instead of failing.
fn parse_mode(arg: Option<&str>) -> InvocationMode {
    let mode = InvocationMode::from_arg(arg);
    if let Some(value) = arg {
        if mode == InvocationMode::Native && !value.eq_ignore_ascii_case("native") {
            warn!(
                "unrecognized mode '{}'; building for the host. Use 'cross' to cross-compile.",
                value
            );
        }
    }
    mode
}

/// Loads `<root>/.env` so its variables reach npm and cargo.
fn load_dotenv(project_root: &Path) {
    let path = project_root.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => debug!(path = %path.display(), "loaded environment file"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("ignoring {}: {}", path.display(), err),
    }
}

fn cmd_init(project_root: &Path, config: Option<&Path>) -> Result<()> {
    let path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_root.join(CONFIG_FILE_NAME));
    if path.exists() {
        bail!("{} already exists; not overwriting", path.display());
    }

    std::fs::write(&path, OasisBuildConfig::generate_starter_toml())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    println!("Wrote starter configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("oasis-build").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.mode, None);
        assert_eq!(cli.project_root, PathBuf::from("."));
        assert!(!cli.dry_run);
        assert!(!cli.verbose);
        assert!(!cli.skip_preflight);
        assert_eq!(cli.profile, None);
    }

    #[test]
    fn test_cli_flags() {
        let cli = parse(&[
            "cross",
            "--project-root",
            "/srv/oasis",
            "--dry-run",
            "--json",
            "-v",
            "--profile",
            "debug",
        ]);
        assert_eq!(cli.mode.as_deref(), Some("cross"));
        assert_eq!(cli.project_root, PathBuf::from("/srv/oasis"));
        assert!(cli.dry_run && cli.json && cli.verbose);
        assert_eq!(cli.profile, Some(ProfileArg::Debug));
        assert_eq!(BuildProfile::from(ProfileArg::Debug), BuildProfile::Debug);
    }

    #[test]
    fn test_json_requires_dry_run() {
        assert!(Cli::try_parse_from(["oasis-build", "--json"]).is_err());
    }

    #[test]
    fn test_parse_mode_is_permissive() {
        assert_eq!(parse_mode(None), InvocationMode::Native);
        assert_eq!(parse_mode(Some("cross")), InvocationMode::Cross);
        assert_eq!(parse_mode(Some("CROSS")), InvocationMode::Cross);
        assert_eq!(parse_mode(Some("native")), InvocationMode::Native);
        assert_eq!(parse_mode(Some("windows")), InvocationMode::Native);
    }

    #[test]
    fn test_exit_code_for() {
        let failed = anyhow::Error::new(BuildError::CommandFailed {
            command: "cargo build --release".to_string(),
            cwd: PathBuf::from("backend"),
            code: Some(101),
        });
        assert_eq!(exit_code_for(&failed), 101);

        let missing = anyhow::Error::new(BuildError::MissingTool {
            tool: "npm".to_string(),
            hint: "Install Node.js".to_string(),
        });
        assert_eq!(exit_code_for(&missing), 1);

        assert_eq!(exit_code_for(&anyhow::anyhow!("bad config")), 1);
    }

    #[test]
    fn test_init_writes_starter_config() {
        let temp_dir = TempDir::new().unwrap();
        let cli = parse(&[
            "--init",
            "--project-root",
            temp_dir.path().to_str().unwrap(),
        ]);
        run_with(cli).unwrap();

        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        let config = OasisBuildConfig::load_from_file(&path).unwrap();
        assert_eq!(config.project.name, "oasis");

        // A second init must not clobber the file.
        let cli = parse(&[
            "--init",
            "--project-root",
            temp_dir.path().to_str().unwrap(),
        ]);
        assert!(run_with(cli).is_err());
    }

    #[test]
    fn test_missing_project_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let cli = parse(&["--project-root", missing.to_str().unwrap(), "--dry-run"]);
        let err = run_with(cli).unwrap_err();
        assert!(err.to_string().contains("Project root not found"));
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_dry_run_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("frontend")).unwrap();
        std::fs::create_dir_all(root.join("backend")).unwrap();
        std::fs::write(
            root.join(CONFIG_FILE_NAME),
            "[backend]\ntarget_dir = \"backend/target\"\n",
        )
        .unwrap();

        let cli = parse(&[
            "cross",
            "--project-root",
            root.to_str().unwrap(),
            "--dry-run",
            "--skip-preflight",
        ]);
        run_with(cli).unwrap();
        assert!(!root.join("release").exists());
    }
}
