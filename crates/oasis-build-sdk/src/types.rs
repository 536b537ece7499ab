//! Core types for oasis-build-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`BuildError`] - Error types for layout, staging and sub-process failures
//! - [`InvocationMode`] - Native or cross-compiled build
//! - [`HostOs`] - Host platform identity (only its executable convention matters)
//! - [`BuildProfile`] - Cargo profile for the backend build
//! - [`ProjectSpec`] / [`FrontendSpec`] / [`BackendSpec`] - Where the sub-projects live
//!   and how they are invoked
//! - [`CommandSpec`] - A program plus its arguments
//! - [`BuildResult`] - Output from a completed build

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Error types for oasis-build-sdk operations.
///
/// Every variant is fatal to the run: the orchestrator never retries and never
/// rolls back a partially populated release directory.
///
/// # Example
///
/// ```ignore
/// use oasis_build_sdk::{BuildError, InvocationMode, ReleaseBuilder};
///
/// match ReleaseBuilder::new(project).build(InvocationMode::Native) {
///     Ok(result) => println!("Bundle at {}", result.release_root.display()),
///     Err(BuildError::CommandFailed { command, code, .. }) => {
///         eprintln!("`{}` exited with {:?}", command, code);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A filesystem operation failed.
    ///
    /// Common causes include permission issues, a full disk, or a path that
    /// exists as a file where a directory is expected.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command could not be started.
    #[error("failed to start `{command}`: {source}\n\nEnsure the tool is installed and available on PATH.")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command ran and exited unsuccessfully.
    ///
    /// `code` is `None` when the process was terminated by a signal.
    #[error("`{command}` failed in {} (exit status: {})", cwd.display(), display_code(*code))]
    CommandFailed {
        command: String,
        cwd: PathBuf,
        code: Option<i32>,
    },

    /// A mandatory build artifact was not produced where it was expected.
    #[error("{label}: expected artifact not found at {}", path.display())]
    MissingArtifact { label: String, path: PathBuf },

    /// A host tool required by the build is not installed.
    #[error("required tool `{tool}` is not available.\n\n{hint}")]
    MissingTool { tool: String, hint: String },

    /// The project directory does not have the expected shape.
    #[error("project error: {0}")]
    Project(String),

    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}. Check oasis-build.toml or CLI flags")]
    Config(String),

    /// JSON serialization of the step plan failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn display_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

impl BuildError {
    /// Wraps an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code to report for this error.
    ///
    /// A failing sub-process propagates its own exit code; everything else
    /// (and a sub-process killed by a signal) maps to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Whether the backend is built for the host or cross-compiled.
///
/// # Example
///
/// ```
/// use oasis_build_sdk::InvocationMode;
///
/// assert_eq!(InvocationMode::from_arg(Some("cross")), InvocationMode::Cross);
/// assert_eq!(InvocationMode::from_arg(None), InvocationMode::Native);
/// // Unrecognized values fall back to a native build.
/// assert_eq!(InvocationMode::from_arg(Some("crosss")), InvocationMode::Native);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    /// Build for the host platform.
    #[default]
    Native,
    /// Build for the configured foreign target triple.
    Cross,
}

impl InvocationMode {
    /// Parses the optional positional mode argument.
    ///
    /// Only `cross` (case-insensitive) selects [`InvocationMode::Cross`];
    /// anything else, including no argument at all, selects a native build.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(value) if value.eq_ignore_ascii_case("cross") => InvocationMode::Cross,
            _ => InvocationMode::Native,
        }
    }

    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationMode::Native => "native",
            InvocationMode::Cross => "cross",
        }
    }
}

impl fmt::Display for InvocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system of the machine running the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    /// Windows; executables carry `.exe`.
    Windows,
    /// macOS.
    MacOs,
    /// Linux.
    Linux,
    /// Any other OS, treated like a Unix host.
    Other,
}

impl HostOs {
    /// Detects the host OS from `std::env::consts::OS`.
    pub fn current() -> Self {
        Self::from_os_str(std::env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` style name to a [`HostOs`].
    pub fn from_os_str(os: &str) -> Self {
        match os {
            "windows" => HostOs::Windows,
            "macos" => HostOs::MacOs,
            "linux" => HostOs::Linux,
            _ => HostOs::Other,
        }
    }

    /// Executable filename suffix on this OS.
    pub fn exe_suffix(&self) -> &'static str {
        match self {
            HostOs::Windows => ".exe",
            HostOs::MacOs | HostOs::Linux | HostOs::Other => "",
        }
    }
}

/// Build profile for the backend compilation.
///
/// # Example
///
/// ```
/// use oasis_build_sdk::BuildProfile;
///
/// assert_eq!(BuildProfile::Release.as_str(), "release");
/// assert_eq!(BuildProfile::default(), BuildProfile::Release);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    /// Debug build, artifacts under `target/debug`.
    Debug,
    /// Optimized build, artifacts under `target/release`.
    #[default]
    Release,
}

impl BuildProfile {
    /// Returns the cargo profile directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
        }
    }
}

/// An external program and its arguments.
///
/// Commands are executed directly, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Builds a command from an argv-style list (`["npm", "run", "build"]`).
    ///
    /// Returns `None` for an empty list.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    /// The program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// The web frontend sub-project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendSpec {
    /// Directory of the frontend project, relative to the project root.
    pub dir: PathBuf,
    /// Dependency install command.
    pub install: CommandSpec,
    /// Build command.
    pub build: CommandSpec,
    /// Directory (relative to `dir`) the build deposits its static output in.
    /// Also the name of the assets directory inside the release bundle.
    pub output_dir: PathBuf,
}

impl Default for FrontendSpec {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("frontend"),
            install: CommandSpec::new("npm").arg("i"),
            build: CommandSpec::new("npm").args(["run", "build"]),
            output_dir: PathBuf::from("public"),
        }
    }
}

/// The natively compiled backend sub-project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    /// Directory of the backend crate, relative to the project root.
    pub dir: PathBuf,
    /// Compiler driver plus any leading arguments, `cargo` unless overridden
    /// (e.g. `cargo +nightly`).
    pub compiler: CommandSpec,
    /// Target triple used in cross mode.
    pub cross_target: String,
    /// Cargo profile.
    pub profile: BuildProfile,
    /// Sample configuration file, relative to `dir`.
    pub config_sample: PathBuf,
    /// Whether a missing config sample fails the build.
    pub config_sample_required: bool,
    /// Cargo target directory. Detected with `cargo metadata` when unset.
    pub target_dir: Option<PathBuf>,
}

impl Default for BackendSpec {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("backend"),
            compiler: CommandSpec::new("cargo"),
            cross_target: "x86_64-pc-windows-gnu".to_string(),
            profile: BuildProfile::Release,
            config_sample: PathBuf::from("assets/oasis.conf.sample"),
            config_sample_required: true,
            target_dir: None,
        }
    }
}

/// Everything the orchestrator needs to know about the repository it builds.
///
/// The defaults describe the Oasis repository layout: `frontend/` built with
/// npm into `public/`, `backend/` built with cargo, bundle under `release/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    /// Repository root; every relative path is resolved against it.
    pub root: PathBuf,
    /// Application name, used for the binary and the bundle directory.
    pub app_name: String,
    /// Parent directory of all bundles, relative to `root`.
    pub release_dir: PathBuf,
    pub frontend: FrontendSpec,
    pub backend: BackendSpec,
}

impl ProjectSpec {
    /// Creates a spec with the default Oasis layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            app_name: "oasis".to_string(),
            release_dir: PathBuf::from("release"),
            frontend: FrontendSpec::default(),
            backend: BackendSpec::default(),
        }
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.root.join(&self.frontend.dir)
    }

    pub fn backend_dir(&self) -> PathBuf {
        self.root.join(&self.backend.dir)
    }

    /// File name of the staged sample configuration.
    pub fn config_sample_name(&self) -> PathBuf {
        self.backend
            .config_sample
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.conf.sample", self.app_name)))
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Mode the bundle was built in.
    pub mode: InvocationMode,
    /// Root of the release bundle.
    pub release_root: PathBuf,
    /// Path of the staged executable.
    pub binary: PathBuf,
    /// Number of steps executed (or listed, for a dry run).
    pub steps: usize,
    /// Whether this was a dry run that left the filesystem untouched.
    pub dry_run: bool,
    /// Wall-clock time from validation to the last step.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_arg() {
        assert_eq!(InvocationMode::from_arg(Some("cross")), InvocationMode::Cross);
        assert_eq!(InvocationMode::from_arg(Some("CROSS")), InvocationMode::Cross);
        assert_eq!(InvocationMode::from_arg(Some("native")), InvocationMode::Native);
        assert_eq!(InvocationMode::from_arg(Some("windows")), InvocationMode::Native);
        assert_eq!(InvocationMode::from_arg(None), InvocationMode::Native);
    }

    #[test]
    fn test_host_os_suffix() {
        assert_eq!(HostOs::from_os_str("windows").exe_suffix(), ".exe");
        assert_eq!(HostOs::from_os_str("linux").exe_suffix(), "");
        assert_eq!(HostOs::from_os_str("macos").exe_suffix(), "");
        assert_eq!(HostOs::from_os_str("freebsd"), HostOs::Other);
    }

    #[test]
    fn test_command_spec_display() {
        let cmd = CommandSpec::new("cargo").args(["build", "--release"]);
        assert_eq!(cmd.to_string(), "cargo build --release");
        assert_eq!(CommandSpec::new("make").to_string(), "make");
    }

    #[test]
    fn test_command_spec_from_argv() {
        let argv = vec!["npm".to_string(), "run".to_string(), "build".to_string()];
        let cmd = CommandSpec::from_argv(&argv).unwrap();
        assert_eq!(cmd.program, "npm");
        assert_eq!(cmd.args, vec!["run", "build"]);
        assert!(CommandSpec::from_argv(&[]).is_none());
        assert_eq!(cmd.argv(), argv);
    }

    #[test]
    fn test_exit_code_propagation() {
        let failed = BuildError::CommandFailed {
            command: "npm run build".to_string(),
            cwd: PathBuf::from("frontend"),
            code: Some(3),
        };
        assert_eq!(failed.exit_code(), 3);

        let signalled = BuildError::CommandFailed {
            command: "cargo build".to_string(),
            cwd: PathBuf::from("backend"),
            code: None,
        };
        assert_eq!(signalled.exit_code(), 1);
        assert!(signalled.to_string().contains("terminated by signal"));

        let missing = BuildError::MissingArtifact {
            label: "Stage backend binary".to_string(),
            path: PathBuf::from("backend/target/release/oasis"),
        };
        assert_eq!(missing.exit_code(), 1);
    }

    #[test]
    fn test_default_project_spec() {
        let project = ProjectSpec::new("/repo");
        assert_eq!(project.app_name, "oasis");
        assert_eq!(project.frontend_dir(), PathBuf::from("/repo/frontend"));
        assert_eq!(project.backend_dir(), PathBuf::from("/repo/backend"));
        assert_eq!(project.frontend.install.to_string(), "npm i");
        assert_eq!(project.frontend.build.to_string(), "npm run build");
        assert_eq!(project.backend.cross_target, "x86_64-pc-windows-gnu");
        assert_eq!(
            project.config_sample_name(),
            PathBuf::from("oasis.conf.sample")
        );
    }
}
