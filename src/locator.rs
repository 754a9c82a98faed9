//! # Repository Discovery
//!
//! Finds git repositories below a base directory so the user has something
//! to choose from before any workspace exists.
//!
//! ## Process
//!
//! 1.  **Validation**: the base directory goes through
//!     [`crate::validation::validate_path`] and is then canonicalized. The
//!     canonical path and the maximum depth together form the cache key.
//! 2.  **Cache lookup**: a fresh [`DiscoveryCache`] entry short-circuits the
//!     scan.
//! 3.  **Bounded walk**: a depth-first walk down to `max_depth` (the base is
//!     depth 0). A directory containing a `.git` marker is recorded and not
//!     descended into, since repositories are large and may hold nested
//!     markers from their own worktrees. Hidden directories are skipped, as
//!     are directories that cannot be read.
//!
//! Discovery is advisory. Any unexpected error produces an empty list
//! rather than a failure.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::cache::DiscoveryCache;
use crate::error::Result;
use crate::repository::GitOperations;
use crate::validation::validate_path;

/// Default maximum directory depth searched below the base.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Name of the directory (or file, for worktrees) marking a repository root.
pub const REPOSITORY_MARKER: &str = ".git";

/// A discovered repository along with its checked-out branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredRepository {
    pub path: PathBuf,
    pub name: String,
    pub current_branch: String,
}

/// Bounded-depth repository search backed by an injected cache.
#[derive(Debug, Clone)]
pub struct RepositoryLocator {
    cache: DiscoveryCache,
    max_depth: usize,
}

impl RepositoryLocator {
    pub fn new(cache: DiscoveryCache) -> Self {
        Self {
            cache,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cache(&self) -> &DiscoveryCache {
        &self.cache
    }

    /// Sorted, deduplicated repository roots below `base_dir`.
    pub fn discover<P: AsRef<Path>>(&self, base_dir: P) -> Vec<PathBuf> {
        let base_dir = base_dir.as_ref();
        match self.try_discover(base_dir) {
            Ok(found) => found,
            Err(e) => {
                debug!("discovery under {} failed: {}", base_dir.display(), e);
                Vec::new()
            }
        }
    }

    /// Like [`discover`](Self::discover), annotated with each repository's
    /// current branch.
    pub fn discover_with_branches<P: AsRef<Path>>(
        &self,
        base_dir: P,
        git: &dyn GitOperations,
    ) -> Vec<DiscoveredRepository> {
        self.discover(base_dir)
            .into_iter()
            .map(|path| DiscoveredRepository {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                current_branch: git.current_branch(&path),
                path,
            })
            .collect()
    }

    fn try_discover(&self, base_dir: &Path) -> Result<Vec<PathBuf>> {
        let base = fs::canonicalize(validate_path(base_dir)?)?;

        if let Some(cached) = self.cache.get(&base, self.max_depth)? {
            debug!("discovery cache hit for {}", base.display());
            return Ok(cached);
        }

        let found = scan(&base, self.max_depth);
        debug!(
            "discovered {} repositories under {}",
            found.len(),
            base.display()
        );
        self.cache.insert(base, self.max_depth, found.iter().cloned())?;
        Ok(found.into_iter().collect())
    }
}

impl Default for RepositoryLocator {
    fn default() -> Self {
        Self::new(DiscoveryCache::default())
    }
}

fn scan(base: &Path, max_depth: usize) -> BTreeSet<PathBuf> {
    let mut found = BTreeSet::new();
    let mut walker = WalkDir::new(base)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter();

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.depth() > 0 && is_hidden(&entry) {
            walker.skip_current_dir();
            continue;
        }
        if entry.path().join(REPOSITORY_MARKER).exists() {
            found.insert(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }

    found
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
