//! Configuration file support for oasis-build.
//!
//! An `oasis-build.toml` file lets a repository describe its layout once
//! instead of passing flags on every invocation. Every key is optional and
//! the defaults describe the stock Oasis repository.
//!
//! ## Configuration File Location
//!
//! Unless `--config` names a file explicitly, the file is searched for in:
//! 1. The project root (`<root>/oasis-build.toml`)
//! 2. Parent directories (up to the repository root or filesystem root)
//!
//! ## Example Configuration
//!
//! ```toml
//! [project]
//! name = "oasis"
//! release_dir = "release"
//!
//! [frontend]
//! dir = "frontend"
//! install = ["npm", "ci"]
//! build = ["npm", "run", "build"]
//!
//! [backend]
//! dir = "backend"
//! compiler = ["cargo", "+stable"]
//! cross_target = "x86_64-pc-windows-gnu"
//! ```

use anyhow::{Context, Result, bail};
use oasis_build_sdk::{BackendSpec, BuildProfile, CommandSpec, FrontendSpec, ProjectSpec};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "oasis-build.toml";

/// Root configuration structure for `oasis-build.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OasisBuildConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,

    /// Frontend build configuration.
    pub frontend: FrontendConfig,

    /// Backend build configuration.
    pub backend: BackendConfig,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Application name. Names the backend binary and the bundle directory.
    pub name: String,

    /// Parent directory of the release bundles, relative to the project root.
    pub release_dir: PathBuf,

    /// Check for required host tools before building.
    pub preflight: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let spec = ProjectSpec::new(".");
        Self {
            name: spec.app_name,
            release_dir: spec.release_dir,
            preflight: true,
        }
    }
}

/// Frontend build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub dir: PathBuf,

    /// Dependency install command as an argv list.
    pub install: Vec<String>,

    /// Build command as an argv list.
    pub build: Vec<String>,

    /// Build output directory, relative to `dir`.
    pub output_dir: PathBuf,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        let spec = FrontendSpec::default();
        Self {
            dir: spec.dir,
            install: spec.install.argv(),
            build: spec.build.argv(),
            output_dir: spec.output_dir,
        }
    }
}

/// Backend build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub dir: PathBuf,

    /// Compiler driver plus leading arguments, e.g. `["cargo", "+nightly"]`.
    pub compiler: Vec<String>,

    /// Target triple used by `oasis-build cross`.
    pub cross_target: String,

    /// Cargo profile (`release` or `debug`).
    pub profile: BuildProfile,

    /// Sample configuration file shipped in the bundle, relative to `dir`.
    pub config_sample: PathBuf,

    /// Fail the build when the sample configuration is missing.
    pub config_sample_required: bool,

    /// Cargo target directory, relative to the project root.
    ///
    /// Detected with `cargo metadata` when not specified.
    pub target_dir: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let spec = BackendSpec::default();
        Self {
            dir: spec.dir,
            compiler: spec.compiler.argv(),
            cross_target: spec.cross_target,
            profile: spec.profile,
            config_sample: spec.config_sample,
            config_sample_required: spec.config_sample_required,
            target_dir: spec.target_dir,
        }
    }
}

impl OasisBuildConfig {
    /// Loads configuration from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(OasisBuildConfig)` - Successfully loaded configuration
    /// * `Err` - If the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: OasisBuildConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Attempts to find and load configuration starting from the specified directory.
    ///
    /// # Returns
    ///
    /// * `Ok(Some((config, path)))` - Found and loaded configuration with its path
    /// * `Ok(None)` - No configuration file found
    /// * `Err` - If a config file was found but couldn't be parsed
    pub fn discover_from(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok(Some((config, config_path)));
            }

            // Stop at repository root or filesystem root
            if current.join(".git").exists() || !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Converts the configuration into a [`ProjectSpec`] rooted at `root`.
    pub fn to_project_spec(&self, root: &Path) -> Result<ProjectSpec> {
        require_plain_name(&self.project.name, "project", "name")?;
        require_plain_name(&self.backend.cross_target, "backend", "cross_target")?;
        require_relative_dir(&self.project.release_dir, "project", "release_dir")?;

        let mut spec = ProjectSpec::new(root);
        spec.app_name = self.project.name.clone();
        spec.release_dir = self.project.release_dir.clone();
        spec.frontend = FrontendSpec {
            dir: self.frontend.dir.clone(),
            install: command_from(&self.frontend.install, "frontend", "install")?,
            build: command_from(&self.frontend.build, "frontend", "build")?,
            output_dir: self.frontend.output_dir.clone(),
        };
        spec.backend = BackendSpec {
            dir: self.backend.dir.clone(),
            compiler: command_from(&self.backend.compiler, "backend", "compiler")?,
            cross_target: self.backend.cross_target.clone(),
            profile: self.backend.profile,
            config_sample: self.backend.config_sample.clone(),
            config_sample_required: self.backend.config_sample_required,
            target_dir: self.backend.target_dir.clone(),
        };
        Ok(spec)
    }

    /// Generates a commented starter configuration with the default values.
    pub fn generate_starter_toml() -> String {
        let defaults = Self::default();
        let argv = |list: &[String]| {
            list.iter()
                .map(|item| format!("\"{}\"", item))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            r#"# oasis-build configuration file
# Describes how the release bundle is assembled.
# CLI flags override these settings when provided.

[project]
# Application name; names the backend binary and the bundle directory
name = "{name}"

# Bundles are written to <release_dir>/<name> (native)
# and <release_dir>/<name>-<cross_target> (cross)
release_dir = "{release_dir}"

# Check for npm, cargo and rustup targets before building
preflight = true

[frontend]
dir = "{frontend_dir}"
install = [{install}]
build = [{build}]

# Directory the frontend build writes its static files to
output_dir = "{output_dir}"

[backend]
dir = "{backend_dir}"

# Compiler driver plus leading arguments (e.g. ["cargo", "+nightly"])
compiler = [{compiler}]

# Target triple used by `oasis-build cross`
cross_target = "{cross_target}"

# Cargo profile: "release" or "debug"
profile = "release"

# Sample configuration copied into the bundle
config_sample = "{config_sample}"
config_sample_required = true

# Cargo target directory (default: detected with `cargo metadata`)
# target_dir = "backend/target"
"#,
            name = defaults.project.name,
            release_dir = defaults.project.release_dir.display(),
            frontend_dir = defaults.frontend.dir.display(),
            install = argv(&defaults.frontend.install),
            build = argv(&defaults.frontend.build),
            output_dir = defaults.frontend.output_dir.display(),
            backend_dir = defaults.backend.dir.display(),
            compiler = argv(&defaults.backend.compiler),
            cross_target = defaults.backend.cross_target,
            config_sample = defaults.backend.config_sample.display(),
        )
    }
}

/// Both values end up as a single directory name under `release_dir`.
fn require_plain_name(value: &str, section: &str, key: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    let single = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if value.trim().is_empty() || !single || value.contains(['/', '\\']) {
        bail!(
            "[{}] {} must be a plain name without path separators, `.` or `..` (got {:?})",
            section,
            key,
            value
        );
    }
    Ok(())
}

fn require_relative_dir(path: &Path, section: &str, key: &str) -> Result<()> {
    let escapes = path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if path.is_absolute() || escapes {
        bail!(
            "[{}] {} must be a relative path inside the project without `..` (got {:?})",
            section,
            key,
            path
        );
    }
    Ok(())
}

fn command_from(argv: &[String], section: &str, key: &str) -> Result<CommandSpec> {
    match CommandSpec::from_argv(argv) {
        Some(command) if !command.program.trim().is_empty() => Ok(command),
        _ => bail!("[{}] {} must name a program", section, key),
    }
}

/// Configuration resolver that merges config file values with CLI arguments.
///
/// CLI arguments always take precedence over config file values.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    /// Loaded configuration, if any.
    pub config: Option<OasisBuildConfig>,

    /// Path to the loaded config file, if any.
    pub config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Loads `explicit` when given, otherwise discovers a config file
    /// starting from `project_root`.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let config = OasisBuildConfig::load_from_file(path)?;
            return Ok(Self {
                config: Some(config),
                config_path: Some(path.to_path_buf()),
            });
        }

        match OasisBuildConfig::discover_from(project_root)? {
            Some((config, path)) => Ok(Self {
                config: Some(config),
                config_path: Some(path),
            }),
            None => Ok(Self::default()),
        }
    }

    /// Builds the project description for `root`, using defaults when no
    /// config file was found.
    pub fn project_spec(&self, root: &Path) -> Result<ProjectSpec> {
        let spec = match &self.config {
            Some(config) => config.to_project_spec(root),
            None => OasisBuildConfig::default().to_project_spec(root),
        };
        match &self.config_path {
            Some(path) => spec.with_context(|| format!("Invalid config file: {:?}", path)),
            None => spec,
        }
    }

    /// Resolves a CLI value, using config as fallback.
    ///
    /// # Returns
    ///
    /// The resolved value, preferring CLI over config over default.
    pub fn resolve<T, F>(&self, cli_value: Option<T>, config_getter: F, default: T) -> T
    where
        F: FnOnce(&OasisBuildConfig) -> Option<T>,
    {
        cli_value
            .or_else(|| self.config.as_ref().and_then(config_getter))
            .unwrap_or(default)
    }
}
