//! Dependency-cache priming for freshly mounted working copies
//!
//! Installed dependencies are large and identical across working copies of
//! the same repository, so instead of reinstalling them the primer copies
//! the source's dependency directory into the working copy:
//!
//! 1. nothing to copy → [`PrimingMethod::Skipped`], no error;
//! 2. hardlink clone, which only touches metadata on the same volume;
//! 3. mirroring copy with a timeout, which duplicates content;
//! 4. both failed → [`PrimingMethod::Skipped`] with the error message.
//!
//! Priming never fails the mount. The outcome is data for the caller to
//! report as a warning.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::repository::CopyOperations;
use crate::validation::validate_path;

/// Conventional dependency-cache directory name.
pub const DEFAULT_DEPENDENCY_DIR: &str = "node_modules";

/// Default budget for the mirroring fallback.
pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(600);

/// How the dependency cache reached the working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimingMethod {
    Linked,
    Mirrored,
    Skipped,
}

impl fmt::Display for PrimingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimingMethod::Linked => write!(f, "linked"),
            PrimingMethod::Mirrored => write!(f, "mirrored"),
            PrimingMethod::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of priming one working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimingOutcome {
    pub method: PrimingMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrimingOutcome {
    pub fn linked() -> Self {
        Self {
            method: PrimingMethod::Linked,
            error: None,
        }
    }

    pub fn mirrored() -> Self {
        Self {
            method: PrimingMethod::Mirrored,
            error: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            method: PrimingMethod::Skipped,
            error: None,
        }
    }

    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            method: PrimingMethod::Skipped,
            error: Some(error.into()),
        }
    }

    /// True when priming was attempted and failed.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Copies a dependency directory from a source repository to a working copy.
pub struct Primer<'a> {
    copy: &'a dyn CopyOperations,
    dependency_dir: String,
    mirror_timeout: Duration,
}

impl<'a> Primer<'a> {
    pub fn new(copy: &'a dyn CopyOperations) -> Self {
        Self {
            copy,
            dependency_dir: DEFAULT_DEPENDENCY_DIR.to_string(),
            mirror_timeout: DEFAULT_MIRROR_TIMEOUT,
        }
    }

    pub fn with_dependency_dir(mut self, dir: impl Into<String>) -> Self {
        self.dependency_dir = dir.into();
        self
    }

    pub fn with_mirror_timeout(mut self, timeout: Duration) -> Self {
        self.mirror_timeout = timeout;
        self
    }

    /// Prime `target_root` from `source_root`. Never fails.
    pub fn prime(&self, source_root: &Path, target_root: &Path) -> PrimingOutcome {
        let (source_root, target_root) =
            match (validate_path(source_root), validate_path(target_root)) {
                (Ok(s), Ok(t)) => (s, t),
                (Err(e), _) | (_, Err(e)) => return PrimingOutcome::degraded(e.to_string()),
            };

        let src = source_root.join(&self.dependency_dir);
        let dst = target_root.join(&self.dependency_dir);

        if !src.is_dir() {
            debug!(
                "no {} in {}, nothing to prime",
                self.dependency_dir,
                source_root.display()
            );
            return PrimingOutcome::skipped();
        }

        match self.copy.hardlink_tree(&src, &dst) {
            Ok(()) => return PrimingOutcome::linked(),
            Err(e) => debug!(
                "hardlink clone of {} failed, falling back to mirror: {}",
                src.display(),
                e
            ),
        }

        match self.copy.mirror_tree(&src, &dst, self.mirror_timeout) {
            Ok(()) => PrimingOutcome::mirrored(),
            Err(e) => {
                warn!("could not prime {}: {}", dst.display(), e);
                PrimingOutcome::degraded(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::mock::MockCopy;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup(with_deps: bool) -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        if with_deps {
            fs::create_dir_all(source.join(DEFAULT_DEPENDENCY_DIR).join("left-pad")).unwrap();
        }
        (temp_dir, source, target)
    }

    #[test]
    fn test_prime_skips_without_dependency_dir() {
        let (_tmp, source, target) = setup(false);
        let copy = MockCopy::default();

        let outcome = Primer::new(&copy).prime(&source, &target);

        assert_eq!(outcome, PrimingOutcome::skipped());
        assert!(outcome.error.is_none());
        assert!(!target.join(DEFAULT_DEPENDENCY_DIR).exists());
        assert!(copy.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prime_prefers_hardlink() {
        let (_tmp, source, target) = setup(true);
        let copy = MockCopy::default();

        let outcome = Primer::new(&copy).prime(&source, &target);

        assert_eq!(outcome.method, PrimingMethod::Linked);
        assert_eq!(*copy.calls.lock().unwrap(), vec!["hardlink"]);
    }

    #[test]
    fn test_prime_falls_back_to_mirror() {
        let (_tmp, source, target) = setup(true);
        let copy = MockCopy {
            fail_hardlink: true,
            ..MockCopy::default()
        };

        let outcome = Primer::new(&copy).prime(&source, &target);

        assert_eq!(outcome, PrimingOutcome::mirrored());
        assert_eq!(*copy.calls.lock().unwrap(), vec!["hardlink", "mirror"]);
    }

    #[test]
    fn test_prime_degrades_when_everything_fails() {
        let (_tmp, source, target) = setup(true);
        let copy = MockCopy {
            fail_hardlink: true,
            fail_mirror: true,
            ..MockCopy::default()
        };

        let outcome = Primer::new(&copy)
            .with_mirror_timeout(Duration::from_secs(7))
            .prime(&source, &target);

        assert_eq!(outcome.method, PrimingMethod::Skipped);
        assert!(outcome.is_degraded());
        assert!(outcome.error.unwrap().contains("timed out after 7s"));
    }

    #[test]
    fn test_prime_custom_dependency_dir() {
        let (_tmp, source, target) = setup(false);
        fs::create_dir_all(source.join("vendor")).unwrap();
        let copy = MockCopy::default();

        let outcome = Primer::new(&copy)
            .with_dependency_dir("vendor")
            .prime(&source, &target);
        assert_eq!(outcome.method, PrimingMethod::Linked);
    }

    #[test]
    fn test_prime_rejects_traversal_as_data() {
        let copy = MockCopy::default();
        let outcome = Primer::new(&copy).prime(Path::new("../src"), Path::new("/tmp/t"));
        assert!(outcome.is_degraded());
        assert!(copy.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_priming_method_serializes_lowercase() {
        let json = serde_json::to_string(&PrimingOutcome::mirrored()).unwrap();
        assert_eq!(json, r#"{"method":"mirrored"}"#);
    }
}
