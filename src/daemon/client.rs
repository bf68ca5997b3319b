//! Client side of the autogazelle daemon.
//!
//! The protocol carries no payload: connecting asks the server for a
//! regeneration pass and the server closing the connection says it is done.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;

/// A connection to a running autogazelle server.
pub struct DaemonClient {
    socket_path: PathBuf,
    stream: UnixStream,
}

impl DaemonClient {
    /// Connect to the server listening on `socket_path`.
    ///
    /// # Errors
    /// Fails if no server is listening. Starting one is up to the caller.
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await.with_context(|| {
            format!("Failed to connect to autogazelle server at {}", socket_path.display())
        })?;

        tracing::debug!("Connected to server at {}", socket_path.display());

        Ok(Self { socket_path: socket_path.to_path_buf(), stream })
    }

    /// Block until the server closes the connection.
    pub async fn wait(mut self) -> Result<()> {
        let mut buf = Vec::new();
        let read = self.stream.read_to_end(&mut buf).await.with_context(|| {
            format!("Lost connection to server at {}", self.socket_path.display())
        })?;
        if read > 0 {
            tracing::debug!("ignoring {read} unexpected byte(s) from server");
        }
        tracing::debug!("Server finished");
        Ok(())
    }
}

/// Ask the server at `socket_path` to regenerate and wait until it has.
pub async fn signal(socket_path: &Path) -> Result<()> {
    DaemonClient::connect(socket_path).await?.wait().await
}
