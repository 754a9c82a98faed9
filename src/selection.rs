//! Repository selections: what the user asked to mount

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::repository::GitOperations;
use crate::validation::{validate_alias, validate_branch_name, validate_path};

/// One repository to mount, on one branch, under one alias.
///
/// Every field is validated on construction and the value is immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySelection {
    alias: String,
    source_path: PathBuf,
    branch: String,
}

impl RepositorySelection {
    pub fn new<P: AsRef<Path>>(alias: &str, source_path: P, branch: &str) -> Result<Self> {
        Ok(Self {
            alias: validate_alias(alias)?,
            source_path: validate_path(source_path)?,
            branch: validate_branch_name(branch)?,
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// A selection as typed on the command line: `alias=path[@branch]`.
///
/// The branch may be omitted, in which case it is resolved to the source's
/// current branch by [`SelectionSpec::resolve`]. The last `@` separates the
/// branch from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSpec {
    pub alias: String,
    pub source_path: PathBuf,
    pub branch: Option<String>,
}

impl SelectionSpec {
    /// Turn this into a validated selection, asking git for the current
    /// branch when none was given.
    pub fn resolve(&self, git: &dyn GitOperations) -> Result<RepositorySelection> {
        let source = validate_path(&self.source_path)?;
        let branch = match &self.branch {
            Some(branch) => branch.clone(),
            None => git.current_branch(&source),
        };
        RepositorySelection::new(&self.alias, source, &branch)
    }
}

impl FromStr for SelectionSpec {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidSelection {
            input: input.to_string(),
            message: message.to_string(),
        };

        let (alias, rest) = input
            .split_once('=')
            .ok_or_else(|| invalid("expected alias=path[@branch]"))?;
        let (path, branch) = match rest.rsplit_once('@') {
            Some((path, branch)) => (path, Some(branch)),
            None => (rest, None),
        };
        if path.trim().is_empty() {
            return Err(invalid("path is empty"));
        }

        Ok(Self {
            alias: validate_alias(alias)?,
            source_path: PathBuf::from(path.trim()),
            branch: branch.map(validate_branch_name).transpose()?,
        })
    }
}
