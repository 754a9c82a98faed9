//! Package-manager detection for a working copy

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

/// Dependency-management tool used by a repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    /// Lockfiles in detection order, most specific format first.
    pub const LOCKFILES: [(&'static str, PackageManager); 3] = [
        ("pnpm-lock.yaml", PackageManager::Pnpm),
        ("yarn.lock", PackageManager::Yarn),
        ("package-lock.json", PackageManager::Npm),
    ];

    /// Detect the package manager used in `root`.
    ///
    /// Lockfiles win, then the `packageManager` field of `package.json`,
    /// then npm.
    pub fn detect(root: &Path) -> Self {
        Self::LOCKFILES
            .iter()
            .find(|(lockfile, _)| root.join(lockfile).is_file())
            .map(|(_, pm)| *pm)
            .or_else(|| from_manifest(root))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads `"packageManager": "pnpm@9.1.0"` style declarations.
fn from_manifest(root: &Path) -> Option<PackageManager> {
    let content = fs::read_to_string(root.join("package.json")).ok()?;
    let manifest: serde_json::Value = serde_json::from_str(&content).ok()?;
    let declared = manifest.get("packageManager")?.as_str()?;
    let name = declared.split('@').next()?.trim();
    match name {
        "pnpm" => Some(PackageManager::Pnpm),
        "yarn" => Some(PackageManager::Yarn),
        "npm" => Some(PackageManager::Npm),
        _ => None,
    }
}
