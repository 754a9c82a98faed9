//! # Error Handling
//!
//! This module defines the centralized error type for the `repo-mount`
//! library. It uses the `thiserror` library to create an `Error` enum that
//! covers every failure the materialization engine can surface.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum for all library errors. Each variant carries
//!   enough context (the offending input, the repository alias, the command)
//!   to produce a useful message without a backtrace.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The variants fall into three groups:
//!
//! - Input validation (`PathTraversal`, `InvalidBranchName`, `InvalidAlias`,
//!   `InvalidSelection`). These are always raised before any subprocess or
//!   filesystem call and are never retried.
//! - Per-repository failures (`MountFailure`, `GitCommand`, `CommandTimeout`).
//!   The workspace orchestrator catches these and excludes the repository.
//! - `NoRepositoriesMounted`, the only error that aborts workspace creation.
//!
//! Degraded dependency priming is deliberately absent: it is reported as data
//! in [`crate::prime::PrimingOutcome`].

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for repo-mount operations
#[derive(Error, Debug)]
pub enum Error {
    /// A path contained a parent-directory segment or could not be resolved
    /// safely.
    #[error("Path traversal rejected for '{path}': {message}")]
    PathTraversal { path: String, message: String },

    /// A branch name failed validation.
    #[error("Invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// A repository alias is not a filesystem-safe token.
    #[error("Invalid repository alias '{alias}': {reason}")]
    InvalidAlias { alias: String, reason: String },

    /// A repository selection could not be parsed.
    #[error("Invalid repository selection '{input}': {message}")]
    InvalidSelection { input: String, message: String },

    /// Creating the working copy for one repository failed.
    #[error("Failed to mount '{alias}': {message}")]
    MountFailure { alias: String, message: String },

    /// Every selected repository failed to mount.
    ///
    /// `root` is the partially created workspace root, if one was created.
    /// Cleaning it up is the caller's decision.
    #[error("No repositories mounted ({attempted} attempted)")]
    NoRepositoriesMounted {
        attempted: usize,
        root: Option<PathBuf>,
    },

    /// A git subprocess exited unsuccessfully.
    #[error("Git command failed in {repo}: {command} - {stderr}")]
    GitCommand {
        command: String,
        repo: String,
        stderr: String,
    },

    /// A subprocess exceeded its time budget and was killed.
    #[error("Command '{command}' timed out after {seconds}s")]
    CommandTimeout { command: String, seconds: u64 },

    /// The settings file could not be used.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// An error indicating that a lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

impl Error {
    /// Builds a `MountFailure` for `alias` from any displayable cause.
    pub fn mount(alias: &str, cause: impl std::fmt::Display) -> Self {
        Error::MountFailure {
            alias: alias.to_string(),
            message: cause.to_string(),
        }
    }

    /// Returns true for errors raised by input validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::PathTraversal { .. }
                | Error::InvalidBranchName { .. }
                | Error::InvalidAlias { .. }
                | Error::InvalidSelection { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
