//! # Settings
//!
//! Tunables for workspace creation, read from a YAML file. Every field is
//! optional in the file; missing fields take the defaults below.
//!
//! ```yaml
//! # ~/.repo-mount.yaml
//! workspaces_dir: ~/workspaces
//! fetch_timeout_secs: 30
//! mirror_timeout_secs: 600
//! max_concurrency: 4
//! discovery_depth: 3
//! discovery_ttl_secs: 300
//! dependency_dir: node_modules
//! config_file_pattern: ".env*"
//! tool_args: "--verbose --output-format=json"
//! ```
//!
//! Lookup order for the file: an explicit path (`--config` or
//! `REPO_MOUNT_CONFIG`), then `~/.repo-mount.yaml` if it exists, then
//! built-in defaults. Unknown keys are rejected so typos surface early.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::locator::DEFAULT_MAX_DEPTH;
use crate::prime::DEFAULT_DEPENDENCY_DIR;
use crate::propagate::DEFAULT_CONFIG_PATTERN;
use crate::validation::{sanitize_argument_list, validate_path};

/// File name looked up in the home directory.
pub const SETTINGS_FILE_NAME: &str = ".repo-mount.yaml";

/// Workspace creation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory under which workspace roots are created.
    pub workspaces_dir: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
    pub mirror_timeout_secs: u64,
    /// Upper bound on repositories processed at once. `None` means one
    /// thread per repository for small selections and 8 otherwise.
    pub max_concurrency: Option<usize>,
    pub discovery_depth: usize,
    pub discovery_ttl_secs: u64,
    pub dependency_dir: String,
    pub config_file_pattern: String,
    /// Raw extra arguments for downstream tooling. Only ever used through
    /// [`Settings::tool_args`].
    pub tool_args: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspaces_dir: None,
            fetch_timeout_secs: 30,
            mirror_timeout_secs: 600,
            max_concurrency: None,
            discovery_depth: DEFAULT_MAX_DEPTH,
            discovery_ttl_secs: 300,
            dependency_dir: DEFAULT_DEPENDENCY_DIR.to_string(),
            config_file_pattern: DEFAULT_CONFIG_PATTERN.to_string(),
            tool_args: None,
        }
    }
}

impl Settings {
    /// Parse settings from YAML text.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml).map_err(|e| Error::Config {
            message: e.to_string(),
            hint: Some(format!("see the keys documented for {}", SETTINGS_FILE_NAME)),
        })?;
        settings.check()?;
        Ok(settings)
    }

    /// Read settings from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            hint: None,
        })?;
        Self::parse(&content)
    }

    /// Load settings from `explicit`, else the home-directory file, else
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match dirs::home_dir().map(|home| home.join(SETTINGS_FILE_NAME)) {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.max_concurrency == Some(0) {
            return Err(Error::Config {
                message: "max_concurrency must be at least 1".to_string(),
                hint: Some("omit the key to size the pool automatically".to_string()),
            });
        }
        if self.dependency_dir.is_empty()
            || self.dependency_dir.contains('/')
            || self.dependency_dir.starts_with('.')
        {
            return Err(Error::Config {
                message: format!(
                    "dependency_dir must be a plain directory name, got '{}'",
                    self.dependency_dir
                ),
                hint: None,
            });
        }
        glob::Pattern::new(&self.config_file_pattern)?;
        Ok(())
    }

    /// Directory under which workspace roots are created, validated.
    ///
    /// Defaults to `~/.repo-mount/workspaces`.
    pub fn workspaces_dir(&self) -> Result<PathBuf> {
        match &self.workspaces_dir {
            Some(dir) => validate_path(dir),
            None => {
                let home = dirs::home_dir().ok_or_else(|| Error::Config {
                    message: "home directory is unknown".to_string(),
                    hint: Some("set workspaces_dir explicitly".to_string()),
                })?;
                Ok(home.join(".repo-mount").join("workspaces"))
            }
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn mirror_timeout(&self) -> Duration {
        Duration::from_secs(self.mirror_timeout_secs)
    }

    pub fn discovery_ttl(&self) -> Duration {
        Duration::from_secs(self.discovery_ttl_secs)
    }

    /// Sanitized extra tool arguments.
    pub fn tool_args(&self) -> Vec<String> {
        sanitize_argument_list(self.tool_args.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(settings.mirror_timeout(), Duration::from_secs(600));
        assert_eq!(settings.discovery_depth, 3);
        assert_eq!(settings.dependency_dir, "node_modules");
        assert_eq!(settings.config_file_pattern, ".env*");
        assert!(settings.tool_args().is_empty());
    }

    #[test]
    fn test_parse_partial_file() {
        let settings = Settings::parse(
            r#"
workspaces_dir: /tmp/ws
max_concurrency: 2
tool_args: "--verbose ; rm -rf /"
"#,
        )
        .unwrap();
        assert_eq!(settings.workspaces_dir, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(settings.max_concurrency, Some(2));
        assert_eq!(settings.fetch_timeout_secs, 30);
        assert_eq!(settings.tool_args(), vec!["--verbose", "rm", "-rf"]);
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = Settings::parse("fetch_timeout: 5").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("fetch_timeout"));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(Settings::parse("max_concurrency: 0").is_err());
        assert!(Settings::parse("dependency_dir: ../x").is_err());
        assert!(Settings::parse("dependency_dir: .cache").is_err());
        assert!(Settings::parse("config_file_pattern: '['").is_err());
    }

    #[test]
    fn test_workspaces_dir_is_validated() {
        let settings = Settings {
            workspaces_dir: Some(PathBuf::from("/tmp/../etc")),
            ..Settings::default()
        };
        assert!(matches!(
            settings.workspaces_dir().unwrap_err(),
            Error::PathTraversal { .. }
        ));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(&path, "discovery_depth: 5\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.discovery_depth, 5);

        let missing = temp_dir.path().join("missing.yaml");
        assert!(Settings::load(Some(&missing)).is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_home_directory() {
        let temp_dir = TempDir::new().unwrap();
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", temp_dir.path());

        let defaults = Settings::load(None);
        fs::write(temp_dir.path().join(SETTINGS_FILE_NAME), "max_concurrency: 3\n").unwrap();
        let from_home = Settings::load(None);

        match original_home {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }
        assert_eq!(defaults.unwrap(), Settings::default());
        assert_eq!(from_home.unwrap().max_concurrency, Some(3));
    }
}
