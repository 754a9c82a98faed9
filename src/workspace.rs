//! # Workspace Orchestration
//!
//! Turns a list of [`RepositorySelection`]s into a [`Workspace`] on disk.
//!
//! ## Process
//!
//! 1.  **Root**: a fresh `ws-<unix-millis>` directory is created under the
//!     workspaces directory, with a `repos/` subdirectory and a `.gitignore`
//!     manifest that keeps mounted repositories, dependency caches and local
//!     configuration files out of any enclosing repository.
//! 2.  **Fan-out**: every selection runs through its own pipeline on a
//!     dedicated `rayon` pool: mount, prime, propagate config files, detect
//!     the package manager. Each pipeline only moves forward through
//!     [`RepoStage`]. Mounts of selections sharing a source repository take
//!     turns, since git decides between creating and reusing a branch from
//!     the state the previous mount left behind.
//! 3.  **Settle**: results land in an index-ordered vector, one slot per
//!     selection, and are partitioned once every pipeline has finished. A
//!     failed repository (including one whose pipeline panicked) is logged
//!     and reported; it never affects siblings.
//! 4.  **Policy**: if nothing mounted, the call fails with
//!     [`Error::NoRepositoriesMounted`] and the root is left for the caller.
//!     Otherwise `workspace.json` is written and the successful subset is
//!     returned in input order.

use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::mount::Mounter;
use crate::package_manager::PackageManager;
use crate::prime::{Primer, PrimingOutcome};
use crate::propagate::{propagate, PropagationOutcome};
use crate::repository::{
    CopyOperations, DefaultCopyOperations, DefaultGitOperations, GitOperations,
};
use crate::selection::RepositorySelection;
use crate::validation::validate_path;

/// Directory under the workspace root holding one working copy per alias.
pub const REPOS_DIR: &str = "repos";

/// Version-control exclusion manifest at the workspace root.
pub const MANIFEST_FILE: &str = ".gitignore";

/// Machine-readable description of the workspace for further tooling.
pub const METADATA_FILE: &str = "workspace.json";

/// Pool size used for large selections when no cap is configured.
pub const DEFAULT_CONCURRENCY_CAP: usize = 8;

const MAX_NAME_ATTEMPTS: usize = 100;

/// Where a repository's pipeline is. `Failed` is reachable from any stage
/// before `Mounted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoStage {
    Pending,
    Mounting,
    Priming,
    Propagating,
    Detecting,
    Mounted,
    Failed,
}

/// A repository that made it all the way through its pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountedRepository {
    #[serde(flatten)]
    selection: RepositorySelection,
    working_copy_path: PathBuf,
    package_manager: PackageManager,
}

impl MountedRepository {
    pub fn selection(&self) -> &RepositorySelection {
        &self.selection
    }

    pub fn alias(&self) -> &str {
        self.selection.alias()
    }

    pub fn working_copy_path(&self) -> &Path {
        &self.working_copy_path
    }

    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }
}

/// A materialized workspace. `mounted` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root_path: PathBuf,
    mounted: Vec<MountedRepository>,
}

impl Workspace {
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn mounted(&self) -> &[MountedRepository] {
        &self.mounted
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.root_path.join(REPOS_DIR)
    }
}

/// Why one repository was left out of the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryFailure {
    pub alias: String,
    /// The stage that was running when the repository failed.
    pub stage: RepoStage,
    pub message: String,
}

/// Everything `create_workspace` learned, successes and failures alike.
#[derive(Debug, Clone)]
pub struct WorkspaceOutcome {
    pub workspace: Workspace,
    /// Priming result per mounted alias, in workspace order.
    pub priming: Vec<(String, PrimingOutcome)>,
    /// Config-file propagation result per mounted alias.
    pub config_files: Vec<(String, PropagationOutcome)>,
    pub failures: Vec<RepositoryFailure>,
}

impl WorkspaceOutcome {
    pub fn mounted_count(&self) -> usize {
        self.workspace.mounted.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

struct Materialized {
    repository: MountedRepository,
    priming: PrimingOutcome,
    config_files: PropagationOutcome,
}

/// Forward-only stage tracker for one repository.
struct RepoPipeline<'a> {
    alias: &'a str,
    stage: RepoStage,
}

impl<'a> RepoPipeline<'a> {
    fn new(alias: &'a str) -> Self {
        Self {
            alias,
            stage: RepoStage::Pending,
        }
    }

    fn advance(&mut self, next: RepoStage) {
        debug_assert!(next > self.stage, "{:?} -> {:?}", self.stage, next);
        debug!("[{}] {:?} -> {:?}", self.alias, self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, cause: impl std::fmt::Display) -> RepositoryFailure {
        let failed_at = self.stage;
        self.advance(RepoStage::Failed);
        RepositoryFailure {
            alias: self.alias.to_string(),
            stage: failed_at,
            message: cause.to_string(),
        }
    }
}

/// Builds workspaces from repository selections.
pub struct WorkspaceBuilder {
    workspaces_dir: PathBuf,
    settings: Settings,
    git: Box<dyn GitOperations>,
    copy: Box<dyn CopyOperations>,
}

impl WorkspaceBuilder {
    /// A builder using the real `git`, `cp` and `rsync` commands.
    pub fn new<P: AsRef<Path>>(workspaces_dir: P, settings: Settings) -> Result<Self> {
        Ok(Self {
            workspaces_dir: validate_path(workspaces_dir)?,
            settings,
            git: Box::new(DefaultGitOperations),
            copy: Box::new(DefaultCopyOperations),
        })
    }

    /// A builder for the workspaces directory named in `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let dir = settings.workspaces_dir()?;
        Self::new(dir, settings)
    }

    pub fn with_git_operations(mut self, git: Box<dyn GitOperations>) -> Self {
        self.git = git;
        self
    }

    pub fn with_copy_operations(mut self, copy: Box<dyn CopyOperations>) -> Self {
        self.copy = copy;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mount every selection into a new workspace.
    ///
    /// Fails only when no repository could be mounted (or the workspace root
    /// itself cannot be created).
    pub fn create_workspace(&self, selections: &[RepositorySelection]) -> Result<WorkspaceOutcome> {
        if selections.is_empty() {
            return Err(Error::NoRepositoriesMounted {
                attempted: 0,
                root: None,
            });
        }

        let root = self.create_root()?;
        info!(
            "materializing {} repositories into {}",
            selections.len(),
            root.display()
        );

        let first_seen = first_index_by_alias(selections);
        let source_keys: Vec<PathBuf> = selections
            .iter()
            .map(|selection| source_key(selection.source_path()))
            .collect();
        let source_locks: HashMap<&Path, Mutex<()>> = source_keys
            .iter()
            .map(|key| (key.as_path(), Mutex::new(())))
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.pool_size(selections.len()))
            .thread_name(|i| format!("repo-mount-{}", i))
            .build()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

        let results: Vec<std::result::Result<Materialized, RepositoryFailure>> =
            pool.install(|| {
                selections
                    .par_iter()
                    .enumerate()
                    .map(|(index, selection)| {
                        let mut pipeline = RepoPipeline::new(selection.alias());
                        if first_seen[selection.alias()] != index {
                            return Err(
                                pipeline.fail("alias is already used by another selection")
                            );
                        }
                        let source_lock = &source_locks[source_keys[index].as_path()];
                        let result = panic::catch_unwind(AssertUnwindSafe(|| {
                            self.materialize(selection, &root, source_lock, &mut pipeline)
                        }));
                        result.unwrap_or_else(|payload| {
                            Err(pipeline.fail(format!("panicked: {}", panic_message(&*payload))))
                        })
                    })
                    .collect()
            });

        let mut mounted = Vec::new();
        let mut priming = Vec::new();
        let mut config_files = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(m) => {
                    let alias = m.repository.alias().to_string();
                    if m.priming.is_degraded() {
                        warn!(
                            "[{}] dependencies not primed: {}",
                            alias,
                            m.priming.error.as_deref().unwrap_or_default()
                        );
                    }
                    priming.push((alias.clone(), m.priming));
                    config_files.push((alias, m.config_files));
                    mounted.push(m.repository);
                }
                Err(failure) => {
                    warn!(
                        "[{}] skipped during {:?}: {}",
                        failure.alias, failure.stage, failure.message
                    );
                    failures.push(failure);
                }
            }
        }

        if mounted.is_empty() {
            return Err(Error::NoRepositoriesMounted {
                attempted: selections.len(),
                root: Some(root),
            });
        }

        let outcome = WorkspaceOutcome {
            workspace: Workspace {
                root_path: root,
                mounted,
            },
            priming,
            config_files,
            failures,
        };
        if let Err(e) = self.write_metadata(&outcome) {
            warn!("could not write {}: {}", METADATA_FILE, e);
        }
        info!(
            "workspace {} ready: {} mounted, {} failed",
            outcome.workspace.root_path.display(),
            outcome.mounted_count(),
            outcome.failed_count()
        );
        Ok(outcome)
    }

    fn pool_size(&self, repositories: usize) -> usize {
        let size = match self.settings.max_concurrency {
            Some(cap) => cap.min(repositories),
            None if repositories <= DEFAULT_CONCURRENCY_CAP => repositories,
            None => DEFAULT_CONCURRENCY_CAP,
        };
        size.max(1)
    }

    fn materialize(
        &self,
        selection: &RepositorySelection,
        root: &Path,
        source_lock: &Mutex<()>,
        pipeline: &mut RepoPipeline<'_>,
    ) -> std::result::Result<Materialized, RepositoryFailure> {
        let target = root.join(REPOS_DIR).join(selection.alias());

        pipeline.advance(RepoStage::Mounting);
        {
            // Held only while the worktree is created; a poisoned lock just
            // means a sibling panicked mid-mount.
            let _turn = source_lock.lock().unwrap_or_else(PoisonError::into_inner);
            Mounter::new(self.git.as_ref())
                .with_fetch_timeout(self.settings.fetch_timeout())
                .mount(selection, &target)
                .map_err(|e| pipeline.fail(e))?;
        }

        pipeline.advance(RepoStage::Priming);
        let priming = Primer::new(self.copy.as_ref())
            .with_dependency_dir(self.settings.dependency_dir.clone())
            .with_mirror_timeout(self.settings.mirror_timeout())
            .prime(selection.source_path(), &target);

        pipeline.advance(RepoStage::Propagating);
        let config_files = propagate(
            selection.source_path(),
            &target,
            &self.settings.config_file_pattern,
        );

        pipeline.advance(RepoStage::Detecting);
        let package_manager = PackageManager::detect(&target);

        pipeline.advance(RepoStage::Mounted);
        Ok(Materialized {
            repository: MountedRepository {
                selection: selection.clone(),
                working_copy_path: target,
                package_manager,
            },
            priming,
            config_files,
        })
    }

    fn create_root(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.workspaces_dir)?;

        let token = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let base_name = format!("ws-{}", token);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                base_name.clone()
            } else {
                format!("{}-{}", base_name, attempt)
            };
            let root = self.workspaces_dir.join(name);
            match fs::create_dir(&root) {
                Ok(()) => {
                    fs::create_dir(root.join(REPOS_DIR))?;
                    fs::write(root.join(MANIFEST_FILE), self.manifest())?;
                    return Ok(root);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free workspace name for {}", base_name),
        )))
    }

    fn manifest(&self) -> String {
        format!(
            "# Generated by repo-mount\n{}/\n{}/\n{}\n",
            REPOS_DIR, self.settings.dependency_dir, self.settings.config_file_pattern
        )
    }

    fn write_metadata(&self, outcome: &WorkspaceOutcome) -> Result<()> {
        let repositories = outcome
            .workspace
            .mounted
            .iter()
            .zip(&outcome.priming)
            .zip(&outcome.config_files)
            .map(|((repository, (_, priming)), (_, config))| RepositoryMetadata {
                repository,
                priming,
                config_files: &config.copied,
            })
            .collect();

        let metadata = WorkspaceMetadata {
            root: &outcome.workspace.root_path,
            repositories,
            failures: &outcome.failures,
            tool_args: self.settings.tool_args(),
        };
        let json = serde_json::to_string_pretty(&metadata)?;
        fs::write(outcome.workspace.root_path.join(METADATA_FILE), json)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct WorkspaceMetadata<'a> {
    root: &'a Path,
    repositories: Vec<RepositoryMetadata<'a>>,
    failures: &'a [RepositoryFailure],
    tool_args: Vec<String>,
}

#[derive(Serialize)]
struct RepositoryMetadata<'a> {
    #[serde(flatten)]
    repository: &'a MountedRepository,
    priming: &'a PrimingOutcome,
    config_files: &'a [String],
}

/// Identity of a source repository, so aliases of the same repository
/// spelled differently still share a lock.
fn source_key(source: &Path) -> PathBuf {
    fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn first_index_by_alias(selections: &[RepositorySelection]) -> HashMap<&str, usize> {
    let mut seen = HashMap::new();
    for (index, selection) in selections.iter().enumerate() {
        seen.entry(selection.alias()).or_insert(index);
    }
    seen
}
