//! Client for the two Go module proxy endpoints the importer needs.

use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::manifest::DepProject;
use crate::utils::error::ProxyError;

/// The `.info` response. Only the canonical version is used.
#[derive(Debug, Deserialize)]
struct ModuleInfo {
    #[serde(rename = "Version")]
    version: String,
}

/// A module pinned through the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub module: String,
    pub version: String,
    pub zip_url: String,
    /// Hex-encoded SHA-256 of the module zip.
    pub sha256: String,
}

impl ResolvedModule {
    /// The directory the proxy zip unpacks into.
    pub fn strip_prefix(&self) -> String {
        format!("{}@{}", self.module, self.version)
    }
}

/// The module path a project is fetched under.
///
/// A `source` override wins over the project name; its `https://` scheme
/// and `.git` suffix are dropped. The result is lower-cased.
pub fn module_path(project: &DepProject) -> String {
    let name = match project.source.as_deref() {
        Some(source) => {
            let source = source.strip_suffix(".git").unwrap_or(source);
            source.strip_prefix("https://").unwrap_or(source)
        }
        None => project.name.as_str(),
    };
    name.to_lowercase()
}

/// HTTP client bound to one proxy base URL.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    base: String,
}

impl ProxyClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(http: reqwest::Client, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { http, base }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProxyError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ProxyError::Request { url: url.to_string(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Status { url: url.to_string(), status });
        }
        Ok(response)
    }

    /// Ask the proxy for the canonical version of `module` at `revision`.
    pub async fn version(&self, module: &str, revision: &str) -> Result<String, ProxyError> {
        let url = format!("{}/{module}/@v/{revision}.info", self.base);
        let info: ModuleInfo = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|source| ProxyError::Decode { url: url.clone(), source })?;
        Ok(info.version)
    }

    /// Download the module zip for `module@version`, hashing it as it streams in.
    pub async fn zip_sha256(&self, module: &str, version: &str) -> Result<(String, String), ProxyError> {
        let url = format!("{}/{module}/@v/{version}.zip", self.base);
        let mut response = self.get(&url).await?;

        let mut hasher = Sha256::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| ProxyError::Stream { url: url.clone(), source })?
        {
            hasher.update(&chunk);
        }

        Ok((url, hex::encode(hasher.finalize())))
    }

    /// Resolve `module` at `revision` to a version, archive URL and digest.
    pub async fn resolve(&self, module: &str, revision: &str) -> Result<ResolvedModule, ProxyError> {
        let version = self.version(module, revision).await?;
        let (zip_url, sha256) = self.zip_sha256(module, &version).await?;
        tracing::info!("{module}@{revision}: {sha256}");
        Ok(ResolvedModule { module: module.to_string(), version, zip_url, sha256 })
    }
}
