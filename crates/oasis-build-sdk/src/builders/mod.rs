//! Build automation for the release bundle.
//!
//! ## Overview
//!
//! [`ReleaseBuilder`] handles the complete pipeline:
//!
//! 1. **Layout reset** - Empty the mode-specific release directory
//! 2. **Frontend** - `npm i` and `npm run build`, then stage `public/`
//! 3. **Backend** - `cargo build --release` (optionally `--target <triple>`),
//!    then stage the executable and the sample configuration
//! 4. **Permissions** - Mark the staged executable `rwxr-xr-x`
//!
//! ## Common Utilities
//!
//! The [`common`] module provides shared functionality:
//!
//! - Process runner with streamed output and explicit working directories
//! - Recursive artifact copy and permission normalization
//! - Workspace-aware Cargo target directory detection
//!
//! ## Builder Options
//!
//! - **`verbose(bool)`** - Print every command and its working directory
//! - **`dry_run(bool)`** - List the steps without making changes
//! - **`json(bool)`** - Print the dry-run plan as JSON
//! - **`preflight(bool)`** - Check for host tools before building
//!
//! ## Example
//!
//! ```ignore
//! use oasis_build_sdk::{InvocationMode, ProjectSpec, ReleaseBuilder};
//!
//! let builder = ReleaseBuilder::new(ProjectSpec::new("."))
//!     .verbose(true)
//!     .dry_run(true); // Preview only
//!
//! let result = builder.build(InvocationMode::Cross)?;
//! println!("Bundle at {}", result.release_root.display());
//! # Ok::<(), oasis_build_sdk::BuildError>(())
//! ```

pub mod common;
pub mod release;

pub use common::{CopyOutcome, copy_recursive, run_command, set_permissions};
pub use release::ReleaseBuilder;
