//! Resolves command-line flags and the environment into typed settings.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::DaemonArgs;
use crate::utils::error::ConfigError;

/// Workspace root, set by `bazel run` and by the wrapper script.
pub const WORKSPACE_ENV: &str = "BUILD_WORKSPACE_DIRECTORY";

/// The real bazel binary the wrapper script stands in front of.
pub const BAZEL_REAL_ENV: &str = "BAZEL_REAL";

pub const DEFAULT_GO_PROXY: &str = "https://proxy.golang.org";

/// Everything the client and server need, validated.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub server: bool,
    pub workspace: PathBuf,
    pub bazel_real: PathBuf,
    pub gazelle_label: String,
    pub idle_timeout: Duration,
    /// Absolute socket path.
    pub socket_path: PathBuf,
    /// Absolute log file path.
    pub log_path: PathBuf,
}

impl DaemonSettings {
    /// Validate `args` against the process environment.
    pub fn from_env(args: &DaemonArgs) -> Result<Self, ConfigError> {
        Self::resolve(args, |key| std::env::var_os(key))
    }

    /// Validate `args`, reading environment variables through `env`.
    ///
    /// Checks happen in a fixed order: `--gazelle`, then the workspace
    /// directory, then the bazel binary.
    pub fn resolve<F>(args: &DaemonArgs, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let gazelle_label = args
            .gazelle
            .clone()
            .filter(|label| !label.is_empty())
            .ok_or(ConfigError::MissingFlag("gazelle"))?;

        let workspace =
            env(WORKSPACE_ENV).map(PathBuf::from).ok_or(ConfigError::MissingEnv(WORKSPACE_ENV))?;
        let bazel_real =
            env(BAZEL_REAL_ENV).map(PathBuf::from).ok_or(ConfigError::MissingEnv(BAZEL_REAL_ENV))?;

        Ok(Self {
            server: args.server,
            socket_path: workspace.join(&args.socket),
            log_path: workspace.join(&args.log),
            workspace,
            bazel_real,
            gazelle_label,
            idle_timeout: args.timeout,
        })
    }

    /// Make the workspace the current directory.
    pub fn enter_workspace(&self) -> Result<(), ConfigError> {
        std::env::set_current_dir(&self.workspace).map_err(|source| ConfigError::WorkspaceDir {
            path: self.workspace.clone(),
            source,
        })
    }
}

/// Pick the proxy base URL from a `GOPROXY`-style value.
///
/// Only the first entry of a list is used. `direct`, `off` and empty values
/// fall back to the public proxy.
pub fn go_proxy_base(value: Option<&str>) -> String {
    let first = value
        .and_then(|v| v.split([',', '|']).next())
        .map(str::trim)
        .unwrap_or_default();
    match first {
        "" | "direct" | "off" => DEFAULT_GO_PROXY.to_string(),
        base => base.trim_end_matches('/').to_string(),
    }
}

/// The program name used in log prefixes and generated headers.
pub fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "autogazelle".to_string())
}
