//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use repo_mount::config::Settings;
use repo_mount::output::{select_renderer, OutputConfig};

use crate::commands;

/// Repo Mount - Assemble isolated multi-repository workspaces
#[derive(Parser, Debug)]
#[command(name = "repo-mount")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Settings file (defaults to ~/.repo-mount.yaml when present)
    #[arg(long, global = true, value_name = "PATH", env = "REPO_MOUNT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List git repositories below a directory
    Discover(commands::discover::DiscoverArgs),

    /// Create a workspace with working copies of the selected repositories
    Create(commands::create::CreateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let renderer = select_renderer(&OutputConfig::from_env_and_flag(&self.color));

        match self.command {
            Commands::Discover(args) => {
                let settings = Settings::load(self.config.as_deref())?;
                commands::discover::execute(args, &settings, renderer.as_ref())
            }
            Commands::Create(args) => {
                let settings = Settings::load(self.config.as_deref())?;
                commands::create::execute(args, settings, renderer.as_ref())
            }
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
