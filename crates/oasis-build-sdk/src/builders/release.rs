//! Release bundle orchestration
//!
//! This module drives the complete build: frontend install and build, backend
//! compilation, and staging of every artifact into the release directory.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::common::{
    CopyOutcome, copy_recursive, get_cargo_target_dir, run_command, set_permissions,
    validate_project_root,
};
use crate::layout::{ReleasePlan, check_release_root, prepare_release_dir};
use crate::preflight::run_preflight;
use crate::steps::{Step, plan_steps};
use crate::types::{BuildError, BuildResult, HostOs, InvocationMode, ProjectSpec};

/// Dry-run output for `--json`.
#[derive(Serialize)]
struct DryRunReport<'a> {
    plan: &'a ReleasePlan,
    steps: &'a [Step],
}

/// Builder that assembles one release bundle.
pub struct ReleaseBuilder {
    project: ProjectSpec,
    host: HostOs,
    /// Whether to print each command and its working directory
    verbose: bool,
    /// Whether to list the steps instead of running them
    dry_run: bool,
    /// Whether to print a dry-run plan as JSON
    json: bool,
    /// Whether to check for host tools before building
    preflight: bool,
}

impl ReleaseBuilder {
    /// Creates a new release builder for the current host
    pub fn new(project: ProjectSpec) -> Self {
        Self {
            project,
            host: HostOs::current(),
            verbose: false,
            dry_run: false,
            json: false,
            preflight: true,
        }
    }

    /// Enables verbose output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Lists the steps without executing them or touching the filesystem
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Prints the dry-run plan as JSON instead of text
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Enables or disables host tool checks
    pub fn preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    /// Overrides the detected host OS
    pub fn host(mut self, host: HostOs) -> Self {
        self.host = host;
        self
    }

    pub fn project(&self) -> &ProjectSpec {
        &self.project
    }

    /// Resolves the release plan and the ordered steps for `mode`.
    ///
    /// Resolving the cargo target directory may run `cargo metadata` when no
    /// explicit target directory is configured.
    pub fn plan(&self, mode: InvocationMode) -> (ReleasePlan, Vec<Step>) {
        let target_dir = self.cargo_target_dir();
        let plan = ReleasePlan::resolve(&self.project, mode, self.host, &target_dir);
        let steps = plan_steps(&self.project, &plan);
        (plan, steps)
    }

    fn cargo_target_dir(&self) -> PathBuf {
        let backend_dir = self.project.backend_dir();
        match &self.project.backend.target_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.project.root.join(dir),
            None => get_cargo_target_dir(&backend_dir),
        }
    }

    /// Builds the release bundle
    ///
    /// This performs the following steps:
    /// 1. Validate the project layout, refuse a bundle root that would contain
    ///    the project, and check for host tools
    /// 2. Reset the release directory for `mode`
    /// 3. Install and build the frontend, stage its assets
    /// 4. Compile the backend, stage the binary and sample configuration
    /// 5. Mark the staged binary executable
    ///
    /// The first failing step ends the build. Whatever was already staged is
    /// left in place for inspection.
    ///
    /// # Returns
    ///
    /// * `Ok(BuildResult)` describing the bundle
    /// * `Err(BuildError)` if any step fails
    pub fn build(&self, mode: InvocationMode) -> Result<BuildResult, BuildError> {
        let started = Instant::now();
        validate_project_root(&self.project)?;

        let (plan, steps) = self.plan(mode);
        info!(%mode, root = %plan.root.display(), steps = steps.len(), "planned release build");
        check_release_root(&self.project, &plan.root)?;

        if self.preflight {
            run_preflight(&self.project, mode, self.host, &steps)?;
        }

        if self.dry_run {
            self.print_plan(&plan, &steps)?;
            return Ok(BuildResult {
                mode,
                release_root: plan.root.clone(),
                binary: plan.binary_path(),
                steps: steps.len(),
                dry_run: true,
                elapsed: started.elapsed(),
            });
        }

        println!("Preparing release directory {}...", plan.root.display());
        prepare_release_dir(&plan.root)?;

        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            println!("[{}/{}] {}...", index + 1, total, step.label());
            if self.verbose {
                println!("  {}", step);
            }
            self.execute(step)?;
        }

        let result = BuildResult {
            mode,
            release_root: plan.root.clone(),
            binary: plan.binary_path(),
            steps: total,
            dry_run: false,
            elapsed: started.elapsed(),
        };
        info!(elapsed = ?result.elapsed, "release build finished");
        Ok(result)
    }

    /// Executes a single step
    fn execute(&self, step: &Step) -> Result<(), BuildError> {
        debug!(kind = step.kind(), label = step.label(), "executing step");
        match step {
            Step::RunCommand { command, cwd, .. } => run_command(command, cwd),
            Step::CopyTree {
                label,
                src,
                dest,
                required,
            } => match copy_recursive(src, dest)? {
                CopyOutcome::Copied { files, dirs } => {
                    debug!(files, dirs, dest = %dest.display(), "staged");
                    if self.verbose {
                        println!("  Copied {} file(s), {} dir(s)", files, dirs);
                    }
                    Ok(())
                }
                CopyOutcome::Missing if *required => Err(BuildError::MissingArtifact {
                    label: label.clone(),
                    path: src.clone(),
                }),
                CopyOutcome::Missing => {
                    warn!(path = %src.display(), "{}: optional artifact not found, skipping", label);
                    Ok(())
                }
            },
            Step::SetPermissions { path, mode, .. } => set_permissions(path, *mode),
        }
    }

    fn print_plan(&self, plan: &ReleasePlan, steps: &[Step]) -> Result<(), BuildError> {
        println!("{}", self.render_plan(plan, steps)?);
        Ok(())
    }

    /// Dry-run listing: pretty JSON with `plan` and `steps`, or numbered text.
    fn render_plan(&self, plan: &ReleasePlan, steps: &[Step]) -> Result<String, BuildError> {
        if self.json {
            let report = DryRunReport { plan, steps };
            return Ok(serde_json::to_string_pretty(&report)?);
        }

        let mut lines = vec![
            format!("Dry run: {} build into {}", plan.mode, plan.root.display()),
            format!("  reset {}", plan.root.display()),
        ];
        for (index, step) in steps.iter().enumerate() {
            lines.push(format!("  {}. {}: {}", index + 1, step.label(), step));
        }
        Ok(lines.join("\n"))
    }
}
