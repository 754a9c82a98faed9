//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_repo("code/api");
//!     fixture.command().arg("discover").arg("code").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// A temporary directory holding source repositories, a workspaces
/// directory and (optionally) a settings file.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a directory that looks like a repository to discovery (a `.git`
    /// directory and nothing else).
    pub fn with_repo_marker(self, path: &str) -> Self {
        self.temp_dir
            .child(path)
            .child(".git")
            .create_dir_all()
            .expect("Failed to create repository marker");
        self
    }

    /// Add a real git repository with one commit on `main`.
    pub fn with_repo(self, path: &str) -> Self {
        let dir = self.path().join(path);
        std::fs::create_dir_all(&dir).expect("Failed to create repository directory");
        git(&dir, &["init", "--quiet", "--initial-branch=main"]);
        git(&dir, &["config", "user.email", "test@example.com"]);
        git(&dir, &["config", "user.name", "Test"]);
        git(&dir, &["config", "commit.gpgsign", "false"]);
        std::fs::write(dir.join("README.md"), "# test\n").expect("Failed to write README");
        git(&dir, &["add", "README.md"]);
        git(&dir, &["commit", "--quiet", "-m", "initial"]);
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        if let Some(parent) = self.path().join(path).parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Write a settings file pointing workspaces at this fixture.
    pub fn with_settings(self, extra: &str) -> Self {
        let content = format!(
            "workspaces_dir: {}\n{}",
            self.workspaces_dir().display(),
            extra
        );
        self.with_file("settings.yaml", &content)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workspaces_dir(&self) -> PathBuf {
        self.path().join("workspaces")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path().join("settings.yaml")
    }

    /// Workspace roots created so far.
    #[allow(dead_code)]
    pub fn workspace_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = std::fs::read_dir(self.workspaces_dir())
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        roots.sort();
        roots
    }

    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A command running in this fixture's directory, isolated from the
    /// user's settings and environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-mount");
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("NO_COLOR", "1")
            .env_remove("REPO_MOUNT_CONFIG")
            .env_remove("REPO_MOUNT_WORKSPACES_DIR")
            .env_remove("REPO_MOUNT_TOOL_ARGS")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Like [`command`](Self::command), with `--config` pointing at the
    /// fixture's settings file.
    #[allow(dead_code)]
    pub fn command_with_settings(&self) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("--config").arg(self.settings_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Run git in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_repo_marker() {
        let fixture = TestFixture::new().with_repo_marker("code/api");
        assert!(fixture.path().join("code/api/.git").is_dir());
    }

    #[test]
    fn test_fixture_with_settings() {
        let fixture = TestFixture::new().with_settings("max_concurrency: 2\n");
        let content = std::fs::read_to_string(fixture.settings_path()).unwrap();
        assert!(content.contains("workspaces_dir:"));
        assert!(content.contains("max_concurrency: 2"));
    }
}
