use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Startup problems: a required flag or environment variable is missing.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--{0} not set")]
    MissingFlag(&'static str),

    #[error("{0} not set")]
    MissingEnv(&'static str),

    #[error("cannot enter workspace directory {}", path.display())]
    WorkspaceDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of a single regeneration engine run.
#[derive(Error, Debug)]
pub enum RegenerationError {
    #[error("failed to launch {}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("gazelle exited with {status}")]
    ExitStatus { status: ExitStatus },
}

/// Failures talking to the module proxy. Each one fails a single attempt.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url}: {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read archive from {url}")]
    Stream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failures of a whole import. Any one of these means no rules are produced.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read {}", path.display())]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to fetch {module}@{revision} after {attempts} attempt(s)")]
    Resolve {
        module: String,
        revision: String,
        attempts: usize,
        #[source]
        source: ProxyError,
    },

    #[error("resolution task failed")]
    Task(#[from] tokio::task::JoinError),
}
