//! Release bundle assembly for Oasis
//!
//! `oasis-build-sdk` builds the Oasis web frontend and its natively compiled
//! backend, then stages both into a self-contained release directory:
//!
//! ```text
//! release/oasis/
//! ├── oasis                 # backend executable (oasis.exe for Windows)
//! ├── oasis.conf.sample     # sample configuration
//! └── public/               # frontend build output
//! ```
//!
//! # Architecture
//!
//! - **Target**: Picks the cargo artifact directory, executable name and
//!   compiler invocation for a native or cross build
//! - **Layout**: Computes the bundle paths and resets the bundle directory
//! - **Steps**: Describes the build as an ordered list of step descriptors
//! - **Builders**: Runs the steps (process runner, artifact stager)
//! - **Preflight**: Checks that the host has the tools the build needs
//!
//! # Example
//!
//! ```ignore
//! use oasis_build_sdk::{InvocationMode, ProjectSpec, ReleaseBuilder};
//!
//! fn main() -> Result<(), oasis_build_sdk::BuildError> {
//!     let result = ReleaseBuilder::new(ProjectSpec::new("."))
//!         .build(InvocationMode::Native)?;
//!     println!("Bundle at {}", result.release_root.display());
//!     Ok(())
//! }
//! ```

pub mod builders;
pub mod layout;
pub mod preflight;
pub mod steps;
pub mod target;
pub mod types;

pub use builders::ReleaseBuilder;
pub use layout::{ReleasePlan, check_release_root, prepare_release_dir, release_root};
pub use steps::{EXECUTABLE_MODE, Step, plan_steps};
pub use target::{ResolvedTarget, resolve_target};
pub use types::{
    BackendSpec, BuildError, BuildProfile, BuildResult, CommandSpec, FrontendSpec, HostOs,
    InvocationMode, ProjectSpec,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
