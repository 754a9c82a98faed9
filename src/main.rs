//! # Repo Mount CLI
//!
//! Binary entry point for the `repo-mount` command-line tool.
//!
//! It parses arguments with `clap`, dispatches to the command modules and
//! lets `anyhow` turn errors into a message and a non-zero exit code. The
//! workspace logic itself lives in the library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
