//! Validation of externally supplied paths, branch names and arguments
//!
//! Everything that ends up on a subprocess command line or names a location
//! on disk goes through this module first. The functions are pure: they
//! never touch the filesystem beyond reading the current directory and the
//! home directory, and every failure is a typed [`Error`].

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Longest branch name accepted.
pub const MAX_BRANCH_LEN: usize = 255;

/// Longest alias accepted.
pub const MAX_ALIAS_LEN: usize = 64;

/// Maximum number of forwarded argument tokens.
pub const MAX_ARGUMENTS: usize = 10;

static BRANCH_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9/_.-]*[A-Za-z0-9]$").expect("static regex is valid")
});

static ALIAS_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex is valid"));

static SAFE_ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("static regex is valid"));

/// Flags accepted verbatim even though they fall outside the token allow-list.
const KNOWN_FLAGS: &[&str] = &[
    "--output-format=text",
    "--output-format=json",
    "--output-format=stream-json",
    "--max-turns=1",
];

const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '{', '}'];

/// Resolve `raw` to an absolute, normalized path.
///
/// A leading `~` is expanded to the home directory and relative paths are
/// resolved against the current directory. The path does not have to exist.
///
/// Fails with [`Error::PathTraversal`] when the raw or the resolved form
/// contains a `..` segment, when the path is empty, or when it contains a NUL
/// byte.
pub fn validate_path<P: AsRef<Path>>(raw: P) -> Result<PathBuf> {
    let raw = raw.as_ref();
    let shown = raw.display().to_string();
    let reject = |message: &str| Error::PathTraversal {
        path: shown.clone(),
        message: message.to_string(),
    };

    if raw.as_os_str().is_empty() {
        return Err(reject("path is empty"));
    }
    if raw.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(reject("path contains a NUL byte"));
    }
    if has_parent_segment(raw) {
        return Err(reject("path contains a parent directory segment"));
    }

    let expanded = match raw.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .ok_or_else(|| reject("home directory is unknown"))?
            .join(rest),
        Err(_) => raw.to_path_buf(),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    let normalized: PathBuf = absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if has_parent_segment(&normalized) {
        return Err(reject("resolved path contains a parent directory segment"));
    }

    Ok(normalized)
}

fn has_parent_segment(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Validate a branch name before it reaches `git`.
///
/// The input is trimmed first and the trimmed value is returned on success.
pub fn validate_branch_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    let reject = |reason: &str| Error::InvalidBranchName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(reject("branch name is empty"));
    }
    if name.chars().count() > MAX_BRANCH_LEN {
        return Err(reject("longer than 255 characters"));
    }
    if name.starts_with('-') {
        return Err(reject("leading hyphen would be read as an option"));
    }
    if name.contains("..") {
        return Err(reject("contains a parent directory sequence"));
    }
    if name.contains("@{") {
        return Err(reject("contains reflog syntax '@{'"));
    }
    if name.chars().any(char::is_control) {
        return Err(reject("contains control characters"));
    }
    if let Some(c) = name.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
        return Err(reject(&format!("contains shell metacharacter '{}'", c)));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(reject("contains whitespace"));
    }
    if !BRANCH_SHAPE.is_match(name) {
        return Err(reject(
            "must start and end with a letter or digit and use only letters, digits, '/', '_', '.' or '-'",
        ));
    }

    Ok(name.to_string())
}

/// Validate a repository alias, which becomes a directory name under `repos/`.
pub fn validate_alias(raw: &str) -> Result<String> {
    let alias = raw.trim();
    let reject = |reason: &str| Error::InvalidAlias {
        alias: alias.to_string(),
        reason: reason.to_string(),
    };

    if alias.is_empty() {
        return Err(reject("alias is empty"));
    }
    if alias.len() > MAX_ALIAS_LEN {
        return Err(reject("longer than 64 characters"));
    }
    if !ALIAS_SHAPE.is_match(alias) {
        return Err(reject("only letters, digits, '-' and '_' are allowed"));
    }

    Ok(alias.to_string())
}

/// Reduce a user-configurable argument string to a safe token list.
///
/// Tokens outside the allow-list are dropped rather than rejected, and at
/// most [`MAX_ARGUMENTS`] tokens are returned.
pub fn sanitize_argument_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    raw.split_whitespace()
        .filter(|token| SAFE_ARGUMENT.is_match(token) || KNOWN_FLAGS.contains(token))
        .take(MAX_ARGUMENTS)
        .map(str::to_string)
        .collect()
}
