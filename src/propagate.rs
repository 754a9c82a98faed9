//! Propagation of local configuration files into working copies
//!
//! Files such as `.env` and `.env.local` are usually untracked, so a fresh
//! worktree does not have them. They are copied from the top level of the
//! source repository. Symbolic links are never followed or copied, and a
//! file already present in the working copy (a tracked `.env.example`, say)
//! is left alone.

use std::fs;
use std::path::Path;

use glob::Pattern;
use log::{debug, warn};
use serde::Serialize;

use crate::error::Result;
use crate::validation::validate_path;

/// Default pattern for local configuration files.
pub const DEFAULT_CONFIG_PATTERN: &str = ".env*";

/// Result of propagating configuration files for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationOutcome {
    pub copied: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_symlinks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PropagationOutcome {
    fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Copy top-level files matching `pattern` from `source_root` to `target_root`.
///
/// Failures are reported in the outcome, never returned.
pub fn propagate(source_root: &Path, target_root: &Path, pattern: &str) -> PropagationOutcome {
    let mut outcome = PropagationOutcome::default();
    if let Err(e) = try_propagate(source_root, target_root, pattern, &mut outcome) {
        warn!(
            "could not copy config files into {}: {}",
            target_root.display(),
            e
        );
        let copied = std::mem::take(&mut outcome.copied);
        outcome = PropagationOutcome {
            copied,
            ..PropagationOutcome::failed(e)
        };
    }
    outcome
}

fn try_propagate(
    source_root: &Path,
    target_root: &Path,
    pattern: &str,
    outcome: &mut PropagationOutcome,
) -> Result<()> {
    let source_root = validate_path(source_root)?;
    let target_root = validate_path(target_root)?;
    let pattern = Pattern::new(pattern)?;

    let mut entries = fs::read_dir(&source_root)?
        .filter_map(|entry| entry.ok())
        .collect::<Vec<_>>();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !pattern.matches(&name) {
            continue;
        }

        // `DirEntry::file_type` does not follow symlinks.
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            debug!("not copying symlink {}", entry.path().display());
            outcome.skipped_symlinks.push(name.into_owned());
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let dest = target_root.join(name.as_ref());
        if dest.symlink_metadata().is_ok() {
            debug!("{} already present in working copy", name);
            continue;
        }

        fs::copy(entry.path(), &dest)?;
        outcome.copied.push(name.into_owned());
    }

    Ok(())
}
