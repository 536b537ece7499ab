//! Release layout planning.
//!
//! A [`ReleasePlan`] records where every artifact comes from and where it lands
//! inside the bundle. It is computed once per run and never mutated. The bundle
//! root is mode-specific so native and cross bundles can sit side by side:
//!
//! ```text
//! release/
//! ├── oasis/                         # native bundle
//! │   ├── oasis
//! │   ├── oasis.conf.sample
//! │   └── public/...
//! └── oasis-x86_64-pc-windows-gnu/   # cross bundle
//!     ├── oasis.exe
//!     ├── oasis.conf.sample
//!     └── public/...
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::target::{ResolvedTarget, resolve_target};
use crate::types::{BuildError, HostOs, InvocationMode, ProjectSpec};

/// Root directory of the bundle for `mode`.
///
/// Native and cross roots always differ.
pub fn release_root(project: &ProjectSpec, mode: InvocationMode) -> PathBuf {
    let parent = project.root.join(&project.release_dir);
    match mode {
        InvocationMode::Native => parent.join(&project.app_name),
        InvocationMode::Cross => parent.join(format!(
            "{}-{}",
            project.app_name, project.backend.cross_target
        )),
    }
}

/// Source and destination of every artifact in one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    pub mode: InvocationMode,
    pub target: ResolvedTarget,
    /// Bundle root.
    pub root: PathBuf,
    /// Assets directory, relative to `root`.
    pub assets_subpath: PathBuf,
    /// Executable, relative to `root`.
    pub binary_subpath: PathBuf,
    /// Sample configuration, relative to `root`.
    pub config_sample_subpath: PathBuf,
    /// Frontend build output.
    pub frontend_output: PathBuf,
    /// Compiled executable as left by the compiler.
    pub compiled_binary: PathBuf,
    /// Sample configuration in the backend project.
    pub config_sample_source: PathBuf,
}

impl ReleasePlan {
    /// Resolves the plan for `mode` on `host`.
    ///
    /// `cargo_target_dir` is the backend's cargo target directory; the
    /// compiled binary is expected under it at the resolved artifact subdir.
    pub fn resolve(
        project: &ProjectSpec,
        mode: InvocationMode,
        host: HostOs,
        cargo_target_dir: &Path,
    ) -> Self {
        let target = resolve_target(mode, host, &project.backend, &project.app_name);
        let compiled_binary = cargo_target_dir
            .join(&target.artifact_subdir)
            .join(&target.binary_name);
        let binary_subpath = PathBuf::from(&target.binary_name);

        let plan = Self {
            mode,
            root: release_root(project, mode),
            assets_subpath: project.frontend.output_dir.clone(),
            binary_subpath,
            config_sample_subpath: project.config_sample_name(),
            frontend_output: project.frontend_dir().join(&project.frontend.output_dir),
            compiled_binary,
            config_sample_source: project.backend_dir().join(&project.backend.config_sample),
            target,
        };
        debug!(?plan, "resolved release plan");
        plan
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(&self.assets_subpath)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.root.join(&self.binary_subpath)
    }

    pub fn config_sample_path(&self) -> PathBuf {
        self.root.join(&self.config_sample_subpath)
    }
}

/// Refuses a bundle root that would swallow the project when reset.
///
/// The root must not be the project root, the frontend directory or the
/// backend directory, nor an ancestor of any of them. Paths are compared
/// after resolving `.`/`..` and any symlinks in their existing prefix.
pub fn check_release_root(project: &ProjectSpec, root: &Path) -> Result<(), BuildError> {
    let resolved_root = resolve_path(root);
    let protected = [
        project.root.clone(),
        project.frontend_dir(),
        project.backend_dir(),
    ];

    for dir in &protected {
        if resolve_path(dir).starts_with(&resolved_root) {
            return Err(BuildError::Config(format!(
                "release directory {} contains {}; refusing to reset it. \
                 Check [project] name, [project] release_dir and [backend] cross_target",
                root.display(),
                dir.display()
            )));
        }
    }
    Ok(())
}

/// Lexically removes `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Canonicalizes the longest existing prefix of `path` and re-appends the rest.
fn resolve_path(path: &Path) -> PathBuf {
    let normalized = normalize(path);
    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return rest
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized.clone(),
        }
    }
}

/// Resets `root` to an empty directory.
///
/// An existing tree is removed recursively first. Removal is not atomic: a
/// failure part way through leaves a partial tree and is returned as an error.
pub fn prepare_release_dir(root: &Path) -> Result<(), BuildError> {
    if root.exists() || root.is_symlink() {
        debug!(path = %root.display(), "removing previous release directory");
        let removal = if root.is_dir() && !root.is_symlink() {
            fs::remove_dir_all(root)
        } else {
            fs::remove_file(root)
        };
        removal.map_err(|e| {
            BuildError::io(
                format!("Failed to remove previous release directory {}", root.display()),
                e,
            )
        })?;
    }

    fs::create_dir_all(root).map_err(|e| {
        BuildError::io(
            format!("Failed to create release directory {}", root.display()),
            e,
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_release_roots_differ() {
        let project = ProjectSpec::new("/repo");
        let native = release_root(&project, InvocationMode::Native);
        let cross = release_root(&project, InvocationMode::Cross);
        assert_ne!(native, cross);
        assert_eq!(native, PathBuf::from("/repo/release/oasis"));
        assert_eq!(
            cross,
            PathBuf::from("/repo/release/oasis-x86_64-pc-windows-gnu")
        );
    }

    #[test]
    fn test_plan_paths() {
        let project = ProjectSpec::new("/repo");
        let plan = ReleasePlan::resolve(
            &project,
            InvocationMode::Cross,
            HostOs::Linux,
            Path::new("/repo/backend/target"),
        );
        assert_eq!(
            plan.compiled_binary,
            PathBuf::from("/repo/backend/target/x86_64-pc-windows-gnu/release/oasis.exe")
        );
        assert_eq!(
            plan.binary_path(),
            PathBuf::from("/repo/release/oasis-x86_64-pc-windows-gnu/oasis.exe")
        );
        assert_eq!(plan.frontend_output, PathBuf::from("/repo/frontend/public"));
        assert_eq!(
            plan.assets_dir(),
            PathBuf::from("/repo/release/oasis-x86_64-pc-windows-gnu/public")
        );
        assert_eq!(
            plan.config_sample_source,
            PathBuf::from("/repo/backend/assets/oasis.conf.sample")
        );
        assert_eq!(
            plan.config_sample_path(),
            PathBuf::from("/repo/release/oasis-x86_64-pc-windows-gnu/oasis.conf.sample")
        );
    }

    #[test]
    fn test_prepare_creates_missing_parents() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("release").join("oasis");
        prepare_release_dir(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_empties_existing_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("oasis");
        fs::create_dir_all(root.join("public/js")).unwrap();
        fs::write(root.join("public/js/stale.js"), "old").unwrap();
        fs::write(root.join("oasis"), "old binary").unwrap();

        prepare_release_dir(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_replaces_file_at_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("oasis");
        fs::write(&root, "not a directory").unwrap();

        prepare_release_dir(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_prepare_leaves_sibling_bundle() {
        let temp = TempDir::new().unwrap();
        let project = ProjectSpec::new(temp.path());
        let native = release_root(&project, InvocationMode::Native);
        let cross = release_root(&project, InvocationMode::Cross);
        fs::create_dir_all(&cross).unwrap();
        fs::write(cross.join("oasis.exe"), "cross").unwrap();

        prepare_release_dir(&native).unwrap();
        assert!(cross.join("oasis.exe").exists());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/repo/release/./..")),
            PathBuf::from("/repo")
        );
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_release_root_guard_accepts_default_layout() {
        let temp = TempDir::new().unwrap();
        let project = ProjectSpec::new(temp.path());
        for mode in [InvocationMode::Native, InvocationMode::Cross] {
            let root = release_root(&project, mode);
            assert!(check_release_root(&project, &root).is_ok());
        }
    }

    #[test]
    fn test_release_root_guard_rejects_project_root() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join("release")).unwrap();

        let mut project = ProjectSpec::new(&repo);
        project.app_name = "..".to_string();
        let root = release_root(&project, InvocationMode::Native);
        let err = check_release_root(&project, &root).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));

        // Ancestors of the project are refused too.
        let project = ProjectSpec::new(&repo);
        assert!(check_release_root(&project, temp.path()).is_err());
        assert!(check_release_root(&project, &repo.join("release/../..")).is_err());
    }

    #[test]
    fn test_release_root_guard_rejects_sub_projects() {
        let mut project = ProjectSpec::new("/repo");
        project.release_dir = PathBuf::from(".");
        project.app_name = "backend".to_string();
        let root = release_root(&project, InvocationMode::Native);
        assert!(check_release_root(&project, &root).is_err());

        let mut project = ProjectSpec::new("/repo");
        project.backend.cross_target = "../../../frontend".to_string();
        let root = release_root(&project, InvocationMode::Cross);
        assert!(check_release_root(&project, &root).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_release_root_guard_follows_symlinks() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        std::os::unix::fs::symlink(&repo, temp.path().join("alias")).unwrap();

        let project = ProjectSpec::new(&repo);
        assert!(check_release_root(&project, &temp.path().join("alias")).is_err());
    }
}
