//! Thin wrappers around the system `git` command
//!
//! Every function here shells out to `git -C <repo> ...`, which picks up the
//! user's own configuration, credential helpers and SSH keys. Callers are
//! expected to have validated paths and branch names already; see
//! [`crate::validation`].

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::exec::{CommandOutput, CommandSpec};

/// Branch name used when the current branch cannot be determined.
pub const FALLBACK_BRANCH: &str = "main";

/// How a new worktree gets its branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkout {
    /// Check out an existing local branch. `force` lets git check out a
    /// branch that another worktree already has checked out.
    Existing { branch: String, force: bool },
    /// Create a local branch from `start_point` and check it out.
    Create { branch: String, start_point: String },
}

impl Checkout {
    pub fn branch(&self) -> &str {
        match self {
            Checkout::Existing { branch, .. } | Checkout::Create { branch, .. } => branch,
        }
    }
}

fn git(repo: &Path) -> CommandSpec {
    CommandSpec::new("git").arg("-C").arg(repo)
}

fn ensure_success(output: CommandOutput, command: &str, repo: &Path) -> Result<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(Error::GitCommand {
            command: command.to_string(),
            repo: repo.display().to_string(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

fn succeeds(spec: CommandSpec) -> bool {
    spec.run().map(|o| o.success()).unwrap_or(false)
}

/// Returns true if `path` is inside a git repository or worktree.
pub fn is_repository(path: &Path) -> bool {
    path.is_dir() && succeeds(git(path).args(["rev-parse", "--git-dir"]))
}

/// Name of the branch currently checked out in `repo`.
///
/// Falls back to [`FALLBACK_BRANCH`] on any failure, including a detached
/// HEAD.
pub fn current_branch(repo: &Path) -> String {
    git(repo)
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .run()
        .ok()
        .filter(CommandOutput::success)
        .map(|o| o.stdout.trim().to_string())
        .filter(|b| !b.is_empty() && b != "HEAD")
        .unwrap_or_else(|| FALLBACK_BRANCH.to_string())
}

/// Refresh remote-tracking refs for every remote of `repo`.
///
/// Credential prompts are disabled, so a remote that needs interactive
/// authentication fails straight away instead of using up `timeout`.
pub fn fetch(repo: &Path, timeout: Duration) -> Result<()> {
    let output = fetch_command(repo, timeout).run()?;
    ensure_success(output, "fetch --all --prune", repo).map(|_| ())
}

fn fetch_command(repo: &Path, timeout: Duration) -> CommandSpec {
    let spec = git(repo)
        .args(["fetch", "--all", "--prune", "--quiet"])
        .env("GIT_TERMINAL_PROMPT", "0")
        .timeout(timeout);
    // A user-supplied ssh command is left alone.
    if std::env::var_os("GIT_SSH_COMMAND").is_some() {
        spec
    } else {
        spec.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes")
    }
}

/// Returns true if `refs/heads/<branch>` exists in `repo`.
pub fn local_branch_exists(repo: &Path, branch: &str) -> bool {
    succeeds(git(repo).args([
        "show-ref",
        "--verify",
        "--quiet",
        &format!("refs/heads/{}", branch),
    ]))
}

/// Returns true if `refs/remotes/origin/<branch>` exists in `repo`.
pub fn remote_branch_exists(repo: &Path, branch: &str) -> bool {
    succeeds(git(repo).args([
        "show-ref",
        "--verify",
        "--quiet",
        &format!("refs/remotes/origin/{}", branch),
    ]))
}

/// The branch new branches should start from.
///
/// Uses `origin/HEAD` when the remote advertises one, otherwise the branch
/// currently checked out in `repo`.
pub fn default_branch(repo: &Path) -> String {
    git(repo)
        .args(["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"])
        .run()
        .ok()
        .filter(CommandOutput::success)
        .map(|o| o.stdout.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| current_branch(repo))
}

/// Branches checked out by any worktree of `repo`, including the main one.
pub fn checked_out_branches(repo: &Path) -> Vec<String> {
    let Ok(output) = git(repo).args(["worktree", "list", "--porcelain"]).run() else {
        return Vec::new();
    };
    if !output.success() {
        return Vec::new();
    }
    parse_worktree_branches(&output.stdout)
}

fn parse_worktree_branches(porcelain: &str) -> Vec<String> {
    porcelain
        .lines()
        .filter_map(|line| line.strip_prefix("branch refs/heads/"))
        .map(str::to_string)
        .collect()
}

/// Create a worktree of `repo` at `target`.
pub fn add_worktree(repo: &Path, target: &Path, checkout: &Checkout) -> Result<()> {
    let mut spec = git(repo).args(["worktree", "add"]);
    match checkout {
        Checkout::Existing { branch, force } => {
            if *force {
                spec = spec.arg("--force");
            }
            spec = spec.arg(target).arg(branch);
        }
        Checkout::Create {
            branch,
            start_point,
        } => {
            spec = spec.arg("-b").arg(branch).arg(target).arg(start_point);
        }
    }

    let output = spec.run()?;
    ensure_success(output, "worktree add", repo).map(|_| ())
}
