//! # CLI Command Implementations
//!
//! One module per subcommand of `repo-mount`. Each holds an `Args` struct
//! derived with `clap` and an `execute` function that calls into the
//! `repo_mount` library and prints through the selected renderer.

pub mod completions;
pub mod create;
pub mod discover;
