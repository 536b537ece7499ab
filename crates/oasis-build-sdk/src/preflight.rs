//! Host tool checks run before anything is built.
//!
//! Catching a missing `npm` or an uninstalled rustup target here keeps a
//! failed build from leaving a half-populated release directory behind.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::steps::Step;
use crate::types::{BuildError, CommandSpec, HostOs, InvocationMode, ProjectSpec};

/// Linker needed to cross-compile to `*-windows-gnu` from a Unix host.
const MINGW_LINKER: &str = "x86_64-w64-mingw32-gcc";

/// Checks that every tool the build needs is installed.
///
/// - Every program named by a [`Step::RunCommand`] must resolve on `PATH`.
/// - In cross mode with cargo, the target triple must be installed through
///   rustup (skipped with a warning when rustup itself is absent).
/// - Cross builds to `*-windows-gnu` from a non-Windows host warn when the
///   mingw linker is missing.
pub fn run_preflight(
    project: &ProjectSpec,
    mode: InvocationMode,
    host: HostOs,
    steps: &[Step],
) -> Result<(), BuildError> {
    for step in steps {
        if let Step::RunCommand { command, cwd, .. } = step {
            check_tool(&command.program, cwd)?;
        }
    }

    if mode == InvocationMode::Cross {
        let triple = &project.backend.cross_target;
        if is_cargo(&project.backend.compiler.program) {
            check_rustup_target(&CommandSpec::new("rustup"), triple)?;
        }
        if triple.ends_with("windows-gnu") && host != HostOs::Windows {
            match which::which(MINGW_LINKER) {
                Ok(path) => debug!(linker = %path.display(), "found mingw linker"),
                Err(_) => warn!(
                    "{} not found on PATH; linking for {} will likely fail. \
                     Install mingw-w64 (e.g. `sudo apt install mingw-w64`).",
                    MINGW_LINKER, triple
                ),
            }
        }
    }

    Ok(())
}

fn check_tool(program: &str, cwd: &Path) -> Result<(), BuildError> {
    match which::which_in(program, std::env::var_os("PATH"), cwd) {
        Ok(path) => {
            debug!(tool = program, path = %path.display(), "tool found");
            Ok(())
        }
        Err(_) => Err(BuildError::MissingTool {
            tool: program.to_string(),
            hint: install_hint(program),
        }),
    }
}

fn install_hint(program: &str) -> String {
    match program {
        "npm" | "npx" | "node" => {
            "Install Node.js and npm: https://nodejs.org/".to_string()
        }
        "cargo" | "rustup" => "Install Rust with rustup: https://rustup.rs/".to_string(),
        other => format!("Install `{}` or adjust the command in oasis-build.toml.", other),
    }
}

fn is_cargo(compiler: &str) -> bool {
    Path::new(compiler)
        .file_stem()
        .is_some_and(|stem| stem == "cargo")
}

/// Asks `rustup` (which may carry leading arguments) for the installed targets.
fn check_rustup_target(rustup: &CommandSpec, triple: &str) -> Result<(), BuildError> {
    let output = match Command::new(&rustup.program)
        .args(&rustup.args)
        .args(["target", "list", "--installed"])
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            warn!(status = %output.status, "rustup target list failed; skipping target check");
            return Ok(());
        }
        Err(_) => {
            warn!("rustup not found; cannot verify that {} is installed", triple);
            return Ok(());
        }
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if target_installed(&installed, triple) {
        return Ok(());
    }

    Err(BuildError::MissingTool {
        tool: format!("rust target {}", triple),
        hint: format!("Install it with: rustup target add {}", triple),
    })
}

fn target_installed(rustup_output: &str, triple: &str) -> bool {
    rustup_output.lines().any(|line| line.trim() == triple)
}
