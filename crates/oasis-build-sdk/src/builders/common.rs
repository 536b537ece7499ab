//! Common utilities used by [`super::ReleaseBuilder`].
//!
//! ## Features
//!
//! - **Process runner** - Runs a build tool in an explicit working directory with
//!   its output streamed straight to the terminal
//! - **Artifact staging** - Recursive copy of files and directory trees, plus
//!   permission normalization for the staged executable
//! - **Workspace-aware target detection** - Finds the cargo target directory even
//!   when the backend is a member of a larger workspace
//! - **Project validation** - Actionable errors when run from the wrong directory
//!
//! ## Error Messages
//!
//! Errors name the path or command involved and, where there is one, the fix.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::types::{BuildError, CommandSpec, ProjectSpec};

/// Validates that `project` points at a repository with both sub-projects.
///
/// This function checks that:
/// - The project root exists and is a directory
/// - The frontend directory exists
/// - The backend directory exists
pub fn validate_project_root(project: &ProjectSpec) -> Result<(), BuildError> {
    let root = &project.root;
    if !root.exists() {
        return Err(BuildError::Project(format!(
            "Project root does not exist: {}\n\n\
             Run from the repository root or pass --project-root.",
            root.display()
        )));
    }

    if !root.is_dir() {
        return Err(BuildError::Project(format!(
            "Project root is not a directory: {}",
            root.display()
        )));
    }

    let frontend = project.frontend_dir();
    let backend = project.backend_dir();
    let missing: Vec<String> = [&frontend, &backend]
        .into_iter()
        .filter(|dir| !dir.is_dir())
        .map(|dir| format!("- {}", dir.display()))
        .collect();

    if !missing.is_empty() {
        return Err(BuildError::Project(format!(
            "Expected sub-project directories are missing:\n{}\n\n\
             Set [frontend].dir and [backend].dir in oasis-build.toml if the \
             repository uses a different layout.",
            missing.join("\n")
        )));
    }

    Ok(())
}

/// Runs an external command to completion.
///
/// The child inherits stdin, stdout and stderr so build tool output reaches the
/// terminal as it is produced. The program is looked up on `PATH` first, which
/// also picks up `.cmd`/`.bat` shims such as `npm.cmd` on Windows.
///
/// # Arguments
/// * `spec` - The command to execute
/// * `cwd` - Working directory for the child; the orchestrator's own current
///   directory is never changed
///
/// # Returns
/// `Ok(())` on a zero exit status, `BuildError::Spawn` if the process could not
/// be started and `BuildError::CommandFailed` with the exit code otherwise.
pub fn run_command(spec: &CommandSpec, cwd: &Path) -> Result<(), BuildError> {
    if !cwd.is_dir() {
        return Err(BuildError::Project(format!(
            "Working directory for `{}` does not exist: {}",
            spec,
            cwd.display()
        )));
    }

    let program = which::which_in(&spec.program, std::env::var_os("PATH"), cwd)
        .unwrap_or_else(|_| PathBuf::from(&spec.program));
    debug!(command = %spec, program = %program.display(), cwd = %cwd.display(), "spawning");

    let status = Command::new(&program)
        .args(&spec.args)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| BuildError::Spawn {
            command: spec.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(BuildError::CommandFailed {
            command: spec.to_string(),
            cwd: cwd.to_path_buf(),
            code: status.code(),
        });
    }
    Ok(())
}

/// What a [`copy_recursive`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The source did not exist; nothing was written.
    Missing,
    /// The source was copied.
    Copied { files: usize, dirs: usize },
}

/// Copies a file or directory tree from `src` to `dest`.
///
/// Directories are recreated at the destination and their children copied
/// depth-first. Files are copied byte-for-byte; parent directories of `dest`
/// are created as needed. A missing `src` is not an error here: callers decide
/// whether the artifact was mandatory.
pub fn copy_recursive(src: &Path, dest: &Path) -> Result<CopyOutcome, BuildError> {
    if !src.exists() {
        return Ok(CopyOutcome::Missing);
    }

    let mut files = 0;
    let mut dirs = 0;
    if src.is_dir() {
        copy_dir_recursive(src, dest, &mut files, &mut dirs)?;
    } else {
        if let Some(parent) = dest.parent() {
            create_dir(parent)?;
        }
        copy_file(src, dest)?;
        files += 1;
    }
    Ok(CopyOutcome::Copied { files, dirs })
}

fn copy_dir_recursive(
    src: &Path,
    dest: &Path,
    files: &mut usize,
    dirs: &mut usize,
) -> Result<(), BuildError> {
    create_dir(dest)?;
    *dirs += 1;

    let entries = fs::read_dir(src)
        .map_err(|e| BuildError::io(format!("Failed to read directory {}", src.display()), e))?;
    for entry in entries {
        let entry = entry
            .map_err(|e| BuildError::io(format!("Failed to read entry in {}", src.display()), e))?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if path.is_dir() {
            copy_dir_recursive(&path, &dest_path, files, dirs)?;
        } else {
            copy_file(&path, &dest_path)?;
            *files += 1;
        }
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(path)
        .map_err(|e| BuildError::io(format!("Failed to create directory {}", path.display()), e))
}

fn copy_file(src: &Path, dest: &Path) -> Result<(), BuildError> {
    fs::copy(src, dest).map(|_| ()).map_err(|e| {
        BuildError::io(
            format!("Failed to copy {} to {}", src.display(), dest.display()),
            e,
        )
    })
}

/// Sets the permission bits of `path` to exactly `mode`.
///
/// On non-Unix hosts there are no mode bits to set; the call only checks that
/// the file exists.
pub fn set_permissions(path: &Path, mode: u32) -> Result<(), BuildError> {
    let metadata = fs::metadata(path)
        .map_err(|e| BuildError::io(format!("Failed to stat {}", path.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = metadata.permissions();
        permissions.set_mode(mode);
        fs::set_permissions(path, permissions).map_err(|e| {
            BuildError::io(
                format!("Failed to set mode {:o} on {}", mode, path.display()),
                e,
            )
        })?;
    }

    #[cfg(not(unix))]
    {
        let _ = metadata;
        debug!(path = %path.display(), mode = %format!("{:o}", mode), "no mode bits on this host");
    }

    Ok(())
}

/// Detects the actual Cargo target directory using `cargo metadata`.
///
/// This correctly handles Cargo workspaces where the target directory
/// is at the workspace root, not the crate directory, and honors
/// `CARGO_TARGET_DIR`.
///
/// # Returns
/// The target directory, or `crate_dir/target` (with a warning) if
/// `cargo metadata` cannot be run or its output cannot be parsed.
pub fn get_cargo_target_dir(crate_dir: &Path) -> PathBuf {
    let fallback = crate_dir.join("target");

    let output = match Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .current_dir(crate_dir)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            warn!(
                error = %e,
                fallback = %fallback.display(),
                "could not run cargo metadata, using default target directory"
            );
            return fallback;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            status = %output.status,
            fallback = %fallback.display(),
            stderr = %stderr.lines().take(3).collect::<Vec<_>>().join("\n"),
            "cargo metadata failed, using default target directory"
        );
        return fallback;
    }

    match parse_target_directory(&output.stdout) {
        Some(dir) => dir,
        None => {
            warn!(
                fallback = %fallback.display(),
                "no target_directory in cargo metadata output, using default target directory"
            );
            fallback
        }
    }
}

fn parse_target_directory(metadata_json: &[u8]) -> Option<PathBuf> {
    let value: serde_json::Value = serde_json::from_slice(metadata_json).ok()?;
    value
        .get("target_directory")?
        .as_str()
        .map(PathBuf::from)
}
