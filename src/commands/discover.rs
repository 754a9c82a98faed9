//! # Discover Command Implementation
//!
//! Lists git repositories below a base directory together with their
//! checked-out branches. Read-only.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use repo_mount::cache::DiscoveryCache;
use repo_mount::config::Settings;
use repo_mount::locator::RepositoryLocator;
use repo_mount::output::Renderer;
use repo_mount::repository::DefaultGitOperations;
use repo_mount::validation::validate_path;

/// List git repositories below a directory
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Directory to search. Defaults to the current directory.
    #[arg(value_name = "DIR")]
    pub base: Option<PathBuf>,

    /// How many directory levels to search below DIR.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the `discover` command.
pub fn execute(args: DiscoverArgs, settings: &Settings, renderer: &dyn Renderer) -> Result<()> {
    let base = validate_path(args.base.unwrap_or_else(|| PathBuf::from(".")))?;
    let locator = RepositoryLocator::new(DiscoveryCache::new(settings.discovery_ttl()))
        .with_max_depth(args.max_depth.unwrap_or(settings.discovery_depth));

    let repositories = locator.discover_with_branches(&base, &DefaultGitOperations);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&repositories)?);
    } else {
        print!("{}", renderer.discovered(&base, &repositories));
    }
    Ok(())
}
