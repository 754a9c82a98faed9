//! # Create Command Implementation
//!
//! Builds a workspace from repository selections given on the command line
//! (`--repo alias=path[@branch]`, repeatable) or picked interactively from
//! the repositories found under `--base`.
//!
//! Repositories that cannot be mounted are reported and skipped. The command
//! fails only when none of them could be mounted.

use anyhow::{bail, Result};
use clap::Args;
use dialoguer::{theme::ColorfulTheme, MultiSelect};
use std::path::{Path, PathBuf};

use repo_mount::cache::DiscoveryCache;
use repo_mount::config::Settings;
use repo_mount::error::Error;
use repo_mount::locator::{DiscoveredRepository, RepositoryLocator};
use repo_mount::output::Renderer;
use repo_mount::repository::{DefaultGitOperations, GitOperations};
use repo_mount::selection::{RepositorySelection, SelectionSpec};
use repo_mount::validation::{validate_path, MAX_ALIAS_LEN};
use repo_mount::workspace::WorkspaceBuilder;

/// Create a workspace with working copies of the selected repositories
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Repository to mount as ALIAS=PATH[@BRANCH]. The branch defaults to the
    /// one currently checked out in PATH.
    #[arg(
        short,
        long = "repo",
        value_name = "ALIAS=PATH[@BRANCH]",
        required_unless_present = "interactive"
    )]
    pub repos: Vec<SelectionSpec>,

    /// Pick repositories from those found under --base.
    #[arg(short, long, requires = "base", conflicts_with = "repos")]
    pub interactive: bool,

    /// Directory searched in interactive mode.
    #[arg(long, value_name = "DIR")]
    pub base: Option<PathBuf>,

    /// Directory under which the workspace is created.
    #[arg(long, value_name = "DIR", env = "REPO_MOUNT_WORKSPACES_DIR")]
    pub workspaces_dir: Option<PathBuf>,

    /// Maximum number of repositories processed at once.
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Extra arguments recorded for downstream tooling. Unsafe tokens are dropped.
    #[arg(
        long,
        value_name = "ARGS",
        env = "REPO_MOUNT_TOOL_ARGS",
        allow_hyphen_values = true
    )]
    pub tool_args: Option<String>,
}

/// Execute the `create` command.
pub fn execute(args: CreateArgs, settings: Settings, renderer: &dyn Renderer) -> Result<()> {
    let settings = apply_overrides(&args, settings)?;
    let git = DefaultGitOperations;

    let selections = if args.interactive {
        let base = args
            .base
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--interactive requires --base"))?;
        pick_interactively(base, &settings, &git)?
    } else {
        resolve_selections(&args.repos, &git)?
    };

    let builder = WorkspaceBuilder::from_settings(settings)?;
    let progress = renderer.progress(&format!("Mounting {} repositories", selections.len()));
    let result = builder.create_workspace(&selections);
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    match result {
        Ok(outcome) => {
            print!("{}", renderer.workspace(&outcome));
            Ok(())
        }
        Err(Error::NoRepositoriesMounted { attempted, root }) => {
            eprint!("{}", renderer.nothing_mounted(attempted, root.as_deref()));
            Err(Error::NoRepositoriesMounted { attempted, root }.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn apply_overrides(args: &CreateArgs, mut settings: Settings) -> Result<Settings> {
    if let Some(dir) = &args.workspaces_dir {
        settings.workspaces_dir = Some(dir.clone());
    }
    if let Some(limit) = args.max_concurrency {
        if limit == 0 {
            bail!("--max-concurrency must be at least 1");
        }
        settings.max_concurrency = Some(limit);
    }
    if args.tool_args.is_some() {
        settings.tool_args = args.tool_args.clone();
    }
    Ok(settings)
}

fn resolve_selections(
    specs: &[SelectionSpec],
    git: &dyn GitOperations,
) -> Result<Vec<RepositorySelection>> {
    specs
        .iter()
        .map(|spec| spec.resolve(git).map_err(Into::into))
        .collect()
}

fn pick_interactively(
    base: &Path,
    settings: &Settings,
    git: &dyn GitOperations,
) -> Result<Vec<RepositorySelection>> {
    let base = validate_path(base)?;
    let locator = RepositoryLocator::new(DiscoveryCache::new(settings.discovery_ttl()))
        .with_max_depth(settings.discovery_depth);
    let found = locator.discover_with_branches(&base, git);
    if found.is_empty() {
        bail!("No repositories found under {}", base.display());
    }

    let labels: Vec<String> = found
        .iter()
        .map(|repo| format!("{} ({})", repo.name, repo.current_branch))
        .collect();
    let picked = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Repositories to mount (space to toggle, enter to confirm)")
        .items(&labels)
        .interact()?;
    if picked.is_empty() {
        bail!("No repositories selected");
    }

    picked
        .into_iter()
        .map(|index| selection_for(&found[index]))
        .collect()
}

fn selection_for(repo: &DiscoveredRepository) -> Result<RepositorySelection> {
    Ok(RepositorySelection::new(
        &alias_for(&repo.name),
        &repo.path,
        &repo.current_branch,
    )?)
}

/// Directory names like `my.app` are not valid aliases.
fn alias_for(name: &str) -> String {
    let alias: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .take(MAX_ALIAS_LEN)
        .collect();
    if alias.is_empty() {
        "repo".to_string()
    } else {
        alias
    }
}
