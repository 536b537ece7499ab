//! Target resolution.
//!
//! Maps an [`InvocationMode`] and the [`HostOs`] to the cargo artifact location,
//! the executable filename and the compiler invocation. Resolution is a pure
//! function: it never touches the filesystem and cannot fail.

use std::path::PathBuf;

use serde::Serialize;

use crate::types::{BackendSpec, BuildProfile, CommandSpec, HostOs, InvocationMode};

/// Where the backend compiler leaves its output and how to invoke it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    /// Artifact directory relative to the cargo target directory,
    /// e.g. `release` or `x86_64-pc-windows-gnu/release`.
    pub artifact_subdir: PathBuf,
    /// Executable filename, e.g. `oasis` or `oasis.exe`.
    pub binary_name: String,
    /// Compiler invocation to run in the backend directory.
    pub compile: CommandSpec,
    /// Foreign target triple, for cross builds.
    pub triple: Option<String>,
}

/// Executable suffix implied by a target triple.
///
/// # Example
///
/// ```
/// use oasis_build_sdk::target::exe_suffix_for_triple;
///
/// assert_eq!(exe_suffix_for_triple("x86_64-pc-windows-gnu"), ".exe");
/// assert_eq!(exe_suffix_for_triple("aarch64-unknown-linux-gnu"), "");
/// ```
pub fn exe_suffix_for_triple(triple: &str) -> &'static str {
    if triple.split('-').any(|part| part == "windows") {
        ".exe"
    } else {
        ""
    }
}

/// Resolves the backend target for a build.
///
/// Native builds use the host's executable convention and cargo's default
/// output directory. Cross builds use the foreign triple's convention
/// regardless of host, and the triple-qualified output directory.
pub fn resolve_target(
    mode: InvocationMode,
    host: HostOs,
    backend: &BackendSpec,
    app_name: &str,
) -> ResolvedTarget {
    let profile = backend.profile;

    let mut compile = backend.compiler.clone().arg("build");
    if profile == BuildProfile::Release {
        compile = compile.arg("--release");
    }

    match mode {
        InvocationMode::Native => ResolvedTarget {
            artifact_subdir: PathBuf::from(profile.as_str()),
            binary_name: format!("{}{}", app_name, host.exe_suffix()),
            compile,
            triple: None,
        },
        InvocationMode::Cross => {
            let triple = backend.cross_target.clone();
            ResolvedTarget {
                artifact_subdir: PathBuf::from(&triple).join(profile.as_str()),
                binary_name: format!("{}{}", app_name, exe_suffix_for_triple(&triple)),
                compile: compile.args(["--target", triple.as_str()]),
                triple: Some(triple),
            }
        }
    }
}
