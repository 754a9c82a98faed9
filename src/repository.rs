//! # Subprocess Seams
//!
//! The materialization engine talks to two families of external tools: the
//! version-control tool (`git`) and the copy tools (`cp`, `rsync`). Both are
//! reached through traits so the orchestration logic can be exercised in
//! tests without real repositories or real copies.
//!
//! - **`GitOperations`**: repository checks, branch queries, remote refresh
//!   and worktree creation.
//! - **`CopyOperations`**: hardlink cloning and mirroring of directory trees.
//!
//! `DefaultGitOperations` and `DefaultCopyOperations` wrap the real commands.

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::exec::CommandSpec;
use crate::git::{self, Checkout};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Whether `path` is a git repository.
    fn is_repository(&self, path: &Path) -> bool;

    /// Currently checked-out branch, or a fallback name on any failure.
    fn current_branch(&self, repo: &Path) -> String;

    /// Refresh remote-tracking refs, giving up after `timeout`.
    fn fetch(&self, repo: &Path, timeout: Duration) -> Result<()>;

    fn local_branch_exists(&self, repo: &Path, branch: &str) -> bool;

    fn remote_branch_exists(&self, repo: &Path, branch: &str) -> bool;

    /// Start point for branches that do not exist yet.
    fn default_branch(&self, repo: &Path) -> String;

    /// Branches already checked out by some worktree of `repo`.
    fn checked_out_branches(&self, repo: &Path) -> Vec<String>;

    /// Create an isolated working copy of `repo` at `target`.
    fn add_worktree(&self, repo: &Path, target: &Path, checkout: &Checkout) -> Result<()>;
}

/// Trait for directory-tree copies - allows mocking in tests
pub trait CopyOperations: Send + Sync {
    /// Recreate `src` at `dst` with hardlinks. Must fail if `dst` exists or
    /// the two paths are on different volumes.
    fn hardlink_tree(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Make `dst` an exact copy of `src`, deleting extraneous files.
    fn mirror_tree(&self, src: &Path, dst: &Path, timeout: Duration) -> Result<()>;
}

/// `GitOperations` backed by the system `git` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn is_repository(&self, path: &Path) -> bool {
        git::is_repository(path)
    }

    fn current_branch(&self, repo: &Path) -> String {
        git::current_branch(repo)
    }

    fn fetch(&self, repo: &Path, timeout: Duration) -> Result<()> {
        git::fetch(repo, timeout)
    }

    fn local_branch_exists(&self, repo: &Path, branch: &str) -> bool {
        git::local_branch_exists(repo, branch)
    }

    fn remote_branch_exists(&self, repo: &Path, branch: &str) -> bool {
        git::remote_branch_exists(repo, branch)
    }

    fn default_branch(&self, repo: &Path) -> String {
        git::default_branch(repo)
    }

    fn checked_out_branches(&self, repo: &Path) -> Vec<String> {
        git::checked_out_branches(repo)
    }

    fn add_worktree(&self, repo: &Path, target: &Path, checkout: &Checkout) -> Result<()> {
        git::add_worktree(repo, target, checkout)
    }
}

/// `CopyOperations` backed by `cp -al` and `rsync -a --delete`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCopyOperations;

impl CopyOperations for DefaultCopyOperations {
    fn hardlink_tree(&self, src: &Path, dst: &Path) -> Result<()> {
        // `cp -al src dst` copies *into* dst when it already exists, so the
        // refusal has to happen here.
        if dst.symlink_metadata().is_ok() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", dst.display()),
            )));
        }
        let spec = CommandSpec::new("cp").arg("-al").arg(src).arg(dst);
        let output = spec.run()?;
        if output.success() {
            Ok(())
        } else {
            Err(copy_failure(&spec, &output.stderr))
        }
    }

    fn mirror_tree(&self, src: &Path, dst: &Path, timeout: Duration) -> Result<()> {
        // Trailing separators make rsync copy the *contents* of src into dst.
        let spec = CommandSpec::new("rsync")
            .args(["-a", "--delete"])
            .arg(with_trailing_slash(src))
            .arg(with_trailing_slash(dst))
            .timeout(timeout);
        let output = spec.run()?;
        if output.success() {
            Ok(())
        } else {
            Err(copy_failure(&spec, &output.stderr))
        }
    }
}

fn with_trailing_slash(path: &Path) -> String {
    let mut s = path.display().to_string();
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}

fn copy_failure(spec: &CommandSpec, stderr: &str) -> Error {
    Error::Io(std::io::Error::other(format!(
        "`{}` failed: {}",
        spec.display(),
        stderr.trim()
    )))
}

/// Scriptable implementations of the subprocess traits for unit tests.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Treats every existing directory as a repository whose branches are
    /// listed in `branches`. `add_worktree` just creates the target directory.
    ///
    /// Like git, it refuses a second worktree of a repository while one is
    /// still being added; `worktree_delay` widens that window.
    #[derive(Default)]
    pub(crate) struct MockGit {
        pub branches: Vec<String>,
        pub checked_out: Vec<String>,
        pub fail_fetch: bool,
        pub fail_worktree_for: HashSet<PathBuf>,
        pub panic_worktree_for: HashSet<PathBuf>,
        pub worktree_delay: Duration,
        pub worktrees: Mutex<Vec<(PathBuf, PathBuf, Checkout)>>,
        pub fetches: Mutex<Vec<PathBuf>>,
        adding: Mutex<HashSet<PathBuf>>,
    }

    impl MockGit {
        pub(crate) fn with_branches(branches: &[&str]) -> Self {
            Self {
                branches: branches.iter().map(|b| b.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl GitOperations for MockGit {
        fn is_repository(&self, path: &Path) -> bool {
            path.is_dir()
        }

        fn current_branch(&self, _repo: &Path) -> String {
            self.branches
                .first()
                .cloned()
                .unwrap_or_else(|| git::FALLBACK_BRANCH.to_string())
        }

        fn fetch(&self, repo: &Path, _timeout: Duration) -> Result<()> {
            self.fetches.lock().unwrap().push(repo.to_path_buf());
            if self.fail_fetch {
                Err(Error::GitCommand {
                    command: "fetch".to_string(),
                    repo: repo.display().to_string(),
                    stderr: "could not resolve host".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn local_branch_exists(&self, _repo: &Path, branch: &str) -> bool {
            self.branches.iter().any(|b| b == branch)
        }

        fn remote_branch_exists(&self, _repo: &Path, branch: &str) -> bool {
            branch.starts_with("remote-")
        }

        fn default_branch(&self, repo: &Path) -> String {
            self.current_branch(repo)
        }

        fn checked_out_branches(&self, _repo: &Path) -> Vec<String> {
            self.checked_out.clone()
        }

        fn add_worktree(&self, repo: &Path, target: &Path, checkout: &Checkout) -> Result<()> {
            if self.panic_worktree_for.contains(repo) {
                panic!("simulated crash in {}", repo.display());
            }
            if self.fail_worktree_for.contains(repo) {
                return Err(Error::GitCommand {
                    command: "worktree add".to_string(),
                    repo: repo.display().to_string(),
                    stderr: "fatal: simulated failure".to_string(),
                });
            }
            if !self.adding.lock().unwrap().insert(repo.to_path_buf()) {
                return Err(Error::GitCommand {
                    command: "worktree add".to_string(),
                    repo: repo.display().to_string(),
                    stderr: format!("fatal: '{}' is already checked out", checkout.branch()),
                });
            }
            std::thread::sleep(self.worktree_delay);
            self.adding.lock().unwrap().remove(repo);
            fs::create_dir_all(target)?;
            self.worktrees.lock().unwrap().push((
                repo.to_path_buf(),
                target.to_path_buf(),
                checkout.clone(),
            ));
            Ok(())
        }
    }

    /// Records calls; each strategy can be told to fail.
    #[derive(Default)]
    pub(crate) struct MockCopy {
        pub fail_hardlink: bool,
        pub fail_mirror: bool,
        pub calls: Mutex<Vec<&'static str>>,
    }

    impl CopyOperations for MockCopy {
        fn hardlink_tree(&self, _src: &Path, dst: &Path) -> Result<()> {
            self.calls.lock().unwrap().push("hardlink");
            if self.fail_hardlink {
                return Err(Error::Io(std::io::Error::other(
                    "Invalid cross-device link",
                )));
            }
            fs::create_dir_all(dst)?;
            Ok(())
        }

        fn mirror_tree(&self, _src: &Path, dst: &Path, timeout: Duration) -> Result<()> {
            self.calls.lock().unwrap().push("mirror");
            if self.fail_mirror {
                return Err(Error::CommandTimeout {
                    command: "rsync".to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            fs::create_dir_all(dst)?;
            Ok(())
        }
    }
}
