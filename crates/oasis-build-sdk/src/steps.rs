//! The build as an ordered list of step descriptors.
//!
//! Each [`Step`] carries every input it needs, including its working
//! directory, so the list can be printed for a dry run or interpreted by a
//! single executor loop.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::layout::ReleasePlan;
use crate::types::{CommandSpec, ProjectSpec};

/// Permission bits applied to the staged executable (`rwxr-xr-x`).
pub const EXECUTABLE_MODE: u32 = 0o755;

/// One unit of work in a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Step {
    /// Run an external command in `cwd`.
    RunCommand {
        label: String,
        command: CommandSpec,
        cwd: PathBuf,
    },
    /// Copy a file or directory tree. A missing `src` fails the build only
    /// when `required` is set.
    CopyTree {
        label: String,
        src: PathBuf,
        dest: PathBuf,
        required: bool,
    },
    /// Set the permission bits of `path`.
    SetPermissions {
        label: String,
        path: PathBuf,
        mode: u32,
    },
}

impl Step {
    pub fn label(&self) -> &str {
        match self {
            Step::RunCommand { label, .. }
            | Step::CopyTree { label, .. }
            | Step::SetPermissions { label, .. } => label,
        }
    }

    /// Short machine-friendly name of the step kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::RunCommand { .. } => "run-command",
            Step::CopyTree { .. } => "copy-tree",
            Step::SetPermissions { .. } => "set-permissions",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::RunCommand { command, cwd, .. } => {
                write!(f, "{} (in {})", command, cwd.display())
            }
            Step::CopyTree {
                src,
                dest,
                required,
                ..
            } => {
                write!(f, "copy {} -> {}", src.display(), dest.display())?;
                if !required {
                    f.write_str(" (optional)")?;
                }
                Ok(())
            }
            Step::SetPermissions { path, mode, .. } => {
                write!(f, "chmod {:o} {}", mode, path.display())
            }
        }
    }
}

/// Lays out the full build for `plan`.
///
/// The order is fixed: frontend install and build, frontend assets, backend
/// compile, backend binary, config sample, executable permissions.
pub fn plan_steps(project: &ProjectSpec, plan: &ReleasePlan) -> Vec<Step> {
    let frontend_dir = project.frontend_dir();
    let backend_dir = project.backend_dir();
    let binary = plan.binary_path();

    vec![
        Step::RunCommand {
            label: "Install frontend dependencies".to_string(),
            command: project.frontend.install.clone(),
            cwd: frontend_dir.clone(),
        },
        Step::RunCommand {
            label: "Build frontend".to_string(),
            command: project.frontend.build.clone(),
            cwd: frontend_dir,
        },
        Step::CopyTree {
            label: "Stage frontend assets".to_string(),
            src: plan.frontend_output.clone(),
            dest: plan.assets_dir(),
            required: true,
        },
        Step::RunCommand {
            label: match &plan.target.triple {
                Some(triple) => format!("Compile backend for {}", triple),
                None => "Compile backend".to_string(),
            },
            command: plan.target.compile.clone(),
            cwd: backend_dir,
        },
        Step::CopyTree {
            label: "Stage backend binary".to_string(),
            src: plan.compiled_binary.clone(),
            dest: binary.clone(),
            required: true,
        },
        Step::CopyTree {
            label: "Stage sample configuration".to_string(),
            src: plan.config_sample_source.clone(),
            dest: plan.config_sample_path(),
            required: project.backend.config_sample_required,
        },
        Step::SetPermissions {
            label: "Mark backend binary executable".to_string(),
            path: binary,
            mode: EXECUTABLE_MODE,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HostOs, InvocationMode};
    use std::path::Path;

    fn native_steps() -> Vec<Step> {
        let project = ProjectSpec::new("/repo");
        let plan = ReleasePlan::resolve(
            &project,
            InvocationMode::Native,
            HostOs::Linux,
            Path::new("/repo/backend/target"),
        );
        plan_steps(&project, &plan)
    }

    #[test]
    fn test_step_order() {
        let kinds: Vec<&str> = native_steps().iter().map(Step::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "run-command",
                "run-command",
                "copy-tree",
                "run-command",
                "copy-tree",
                "copy-tree",
                "set-permissions",
            ]
        );
    }

    #[test]
    fn test_steps_carry_working_directories() {
        let steps = native_steps();
        match &steps[0] {
            Step::RunCommand { command, cwd, .. } => {
                assert_eq!(command.to_string(), "npm i");
                assert_eq!(cwd, &PathBuf::from("/repo/frontend"));
            }
            other => panic!("unexpected step: {other:?}"),
        }
        match &steps[3] {
            Step::RunCommand { command, cwd, .. } => {
                assert_eq!(command.to_string(), "cargo build --release");
                assert_eq!(cwd, &PathBuf::from("/repo/backend"));
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_binary_staged_then_made_executable() {
        let steps = native_steps();
        let Step::CopyTree { src, dest, required, .. } = &steps[4] else {
            panic!("expected copy step");
        };
        assert_eq!(src, &PathBuf::from("/repo/backend/target/release/oasis"));
        assert_eq!(dest, &PathBuf::from("/repo/release/oasis/oasis"));
        assert!(*required);

        let Step::SetPermissions { path, mode, .. } = &steps[6] else {
            panic!("expected permission step");
        };
        assert_eq!(path, dest);
        assert_eq!(*mode, 0o755);
    }

    #[test]
    fn test_optional_config_sample() {
        let mut project = ProjectSpec::new("/repo");
        project.backend.config_sample_required = false;
        let plan = ReleasePlan::resolve(
            &project,
            InvocationMode::Native,
            HostOs::Linux,
            Path::new("/repo/backend/target"),
        );
        let steps = plan_steps(&project, &plan);
        assert!(matches!(steps[5], Step::CopyTree { required: false, .. }));
        assert!(steps[5].to_string().ends_with("(optional)"));
    }

    #[test]
    fn test_step_json() {
        let steps = native_steps();
        let json = serde_json::to_value(&steps[6]).unwrap();
        assert_eq!(json["kind"], "set-permissions");
        assert_eq!(json["mode"], 0o755);
        let json = serde_json::to_value(&steps[0]).unwrap();
        assert_eq!(json["kind"], "run-command");
        assert_eq!(json["command"]["program"], "npm");
    }

    #[test]
    fn test_step_display() {
        let steps = native_steps();
        assert_eq!(steps[1].to_string(), "npm run build (in /repo/frontend)");
        assert_eq!(
            steps[6].to_string(),
            "chmod 755 /repo/release/oasis/oasis"
        );
    }
}
