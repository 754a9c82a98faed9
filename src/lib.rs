//! # Repo Mount Library
//!
//! Core of the `repo-mount` tool: it assembles isolated multi-repository
//! workspaces from existing local git repositories. Each selected repository
//! gets its own working copy (a git worktree) on a chosen branch, its
//! installed dependencies are cloned from the source instead of reinstalled,
//! and untracked local configuration files are carried over.
//!
//! ## Quick Example
//!
//! ```no_run
//! use repo_mount::config::Settings;
//! use repo_mount::selection::RepositorySelection;
//! use repo_mount::workspace::WorkspaceBuilder;
//!
//! let builder = WorkspaceBuilder::new("/tmp/workspaces", Settings::default())?;
//! let selections = vec![
//!     RepositorySelection::new("api", "/code/api", "main")?,
//!     RepositorySelection::new("web", "/code/web", "feature/login")?,
//! ];
//! let outcome = builder.create_workspace(&selections)?;
//! println!(
//!     "{} mounted, {} failed",
//!     outcome.mounted_count(),
//!     outcome.failed_count()
//! );
//! # Ok::<(), repo_mount::error::Error>(())
//! ```
//!
//! ## Core Concepts
//!
//! - **Validation (`validation`)**: every path, branch name, alias and extra
//!   argument list is checked here before it reaches a subprocess.
//! - **Discovery (`locator`, `cache`)**: bounded-depth search for repositories
//!   under a base directory, memoized per base with a TTL.
//! - **Mounting (`mount`, `git`)**: creating a working copy on the requested
//!   branch, whether it exists locally, only on the remote, or not at all.
//! - **Priming (`prime`)**: hardlink clone of the dependency cache with a
//!   mirroring fallback.
//! - **Propagation (`propagate`)**: copying `.env*` files into working copies.
//! - **Orchestration (`workspace`)**: concurrent per-repository pipelines,
//!   isolated failures, and the workspace layout on disk.
//!
//! External tools are reached through the traits in `repository`, so the
//! orchestration logic can run against mocks.

pub mod cache;
pub mod config;
pub mod error;
pub mod exec;
pub mod git;
pub mod locator;
pub mod mount;
pub mod output;
pub mod package_manager;
pub mod prime;
pub mod propagate;
pub mod repository;
pub mod selection;
pub mod validation;
pub mod workspace;

#[cfg(test)]
mod validation_proptest;
