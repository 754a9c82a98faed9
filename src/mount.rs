//! Working-copy creation for a single repository

use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::git::Checkout;
use crate::repository::GitOperations;
use crate::selection::RepositorySelection;
use crate::validation::{validate_branch_name, validate_path};

/// Default budget for refreshing remote-tracking refs.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates git worktrees for repository selections.
pub struct Mounter<'a> {
    git: &'a dyn GitOperations,
    fetch_timeout: Duration,
}

impl<'a> Mounter<'a> {
    pub fn new(git: &'a dyn GitOperations) -> Self {
        Self {
            git,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Create a working copy of `selection` at `target`.
    ///
    /// The remote refresh is best effort; everything after it fails loudly
    /// with [`Error::MountFailure`] (or a validation error).
    pub fn mount(&self, selection: &RepositorySelection, target: &Path) -> Result<()> {
        let alias = selection.alias();
        let source = validate_path(selection.source_path())?;
        let target = validate_path(target)?;
        let branch = validate_branch_name(selection.branch())?;

        if target.symlink_metadata().is_ok() {
            return Err(Error::mount(
                alias,
                format!("target {} already exists", target.display()),
            ));
        }
        if !self.git.is_repository(&source) {
            return Err(Error::mount(
                alias,
                format!("{} is not a git repository", source.display()),
            ));
        }

        if let Err(e) = self.git.fetch(&source, self.fetch_timeout) {
            debug!("[{}] remote refresh skipped: {}", alias, e);
        }

        let checkout = self.resolve_checkout(&source, &branch)?;
        debug!(
            "[{}] creating worktree at {} ({:?})",
            alias,
            target.display(),
            checkout
        );
        self.git
            .add_worktree(&source, &target, &checkout)
            .map_err(|e| Error::mount(alias, e))
    }

    fn resolve_checkout(&self, source: &Path, branch: &str) -> Result<Checkout> {
        if self.git.local_branch_exists(source, branch) {
            let force = self
                .git
                .checked_out_branches(source)
                .iter()
                .any(|b| b == branch);
            return Ok(Checkout::Existing {
                branch: branch.to_string(),
                force,
            });
        }

        let start_point = if self.git.remote_branch_exists(source, branch) {
            format!("origin/{}", branch)
        } else {
            self.git.default_branch(source)
        };
        // The start point came out of git, but it still ends up on a command line.
        let start_point = validate_branch_name(&start_point)?;

        Ok(Checkout::Create {
            branch: branch.to_string(),
            start_point,
        })
    }
}
