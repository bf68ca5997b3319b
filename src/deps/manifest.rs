//! The dep lock file (`Gopkg.lock`).

use serde::Deserialize;
use std::path::Path;

use crate::utils::error::ImportError;

/// A pinned project from the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepProject {
    /// Import path of the project root.
    pub name: String,
    /// VCS commit the project is pinned to.
    pub revision: String,
    /// Alternate location to fetch the project from.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LockFile {
    #[serde(default)]
    projects: Vec<DepProject>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Parse lock file contents into its projects, in file order.
pub fn parse_manifest(content: &str) -> Result<Vec<DepProject>, toml::de::Error> {
    let file: LockFile = toml::from_str(content)?;
    Ok(file.projects)
}

/// Read and parse the lock file at `path`.
pub fn read_manifest(path: &Path) -> Result<Vec<DepProject>, ImportError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| ImportError::ReadManifest { path: path.to_path_buf(), source })?;
    parse_manifest(&content)
        .map_err(|source| ImportError::ParseManifest { path: path.to_path_buf(), source })
}
