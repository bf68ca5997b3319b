//! Daemon server: listens on a Unix socket and runs one gazelle pass per
//! client connection.
//!
//! Connections are handed from the accept loop to a single worker over a
//! queue, so passes never overlap. Every connection waiting when a pass
//! starts is answered by that pass: the worker drains the dirty set, restores
//! templates in those directories, runs gazelle over them and then closes
//! the connections. The server stops once no client has connected for the
//! idle timeout; a pass in progress always runs to completion.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};

use super::dirty::DirtySet;
use super::watcher::ChangeWatcher;
use crate::config::DaemonSettings;
use crate::gazelle::{CommandRunner, Invoker, Mode};
use crate::workspace::{restore_build_files_in_dir, restore_build_files_in_repo};

/// Server state shared by the accept loop and the pass worker.
pub struct DaemonServer<R> {
    workspace: PathBuf,
    socket_path: PathBuf,
    log_path: PathBuf,
    idle_timeout: Duration,
    /// Name stamped into restored build files.
    program: String,
    dirty: Arc<DirtySet>,
    invoker: Invoker<R>,
    /// Connections accepted but not yet answered.
    pending: AtomicUsize,
}

impl<R: CommandRunner> DaemonServer<R> {
    pub fn new(settings: &DaemonSettings, program: String, runner: R) -> Self {
        Self {
            workspace: settings.workspace.clone(),
            socket_path: settings.socket_path.clone(),
            log_path: settings.log_path.clone(),
            idle_timeout: settings.idle_timeout,
            program,
            dirty: Arc::new(DirtySet::new()),
            invoker: Invoker::new(
                settings.bazel_real.clone(),
                settings.gazelle_label.clone(),
                runner,
            ),
            pending: AtomicUsize::new(0),
        }
    }

    /// The directories waiting for the next pass.
    pub fn dirty(&self) -> &Arc<DirtySet> {
        &self.dirty
    }

    /// Bind the socket, start watching, bring the workspace up to date and
    /// serve until the idle timeout.
    pub async fn start(self) -> Result<()> {
        let listener = bind_listener(&self.socket_path)?;
        tracing::info!("Listening on {}", self.socket_path.display());

        let server = Arc::new(self);
        let result = async {
            let _watcher = ChangeWatcher::start(
                &server.workspace,
                Arc::clone(&server.dirty),
                vec![server.socket_path.clone(), server.log_path.clone()],
            )?;
            server.initial_pass().await;
            Arc::clone(&server).serve(listener).await
        }
        .await;

        server.cleanup();
        result
    }

    /// Restore every template and run gazelle over the whole repository.
    async fn initial_pass(&self) {
        if let Err(err) = restore_build_files_in_repo(&self.workspace, &self.program) {
            tracing::error!("Failed to restore build files: {err:#}");
        }
        // The full run covers everything marked before it starts. Anything
        // marked while it runs stays pending for the next pass.
        let covered = self.dirty.drain();
        if !covered.is_empty() {
            tracing::debug!("Full run covers {} changed director(ies)", covered.len());
        }
        if let Err(err) = self.invoker.run(Mode::Full, &[]).await {
            tracing::error!("Initial gazelle run failed: {err:#}");
        }
    }

    /// Run one pass over the directories marked dirty since the last one.
    ///
    /// The dirty set is cleared whether or not gazelle succeeds.
    pub async fn run_pass(&self) -> Result<()> {
        let dirs = self.dirty.drain();
        for dir in &dirs {
            restore_build_files_in_dir(dir, &self.program);
        }
        self.invoker.run(Mode::Fast, &dirs).await
    }

    /// Accept connections until the idle timeout expires.
    pub(crate) async fn serve(self: Arc<Self>, listener: UnixListener) -> Result<()> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (done_tx, mut done_rx) = watch::channel(0u64);
        let worker = tokio::spawn(Arc::clone(&self).pass_worker(queue_rx, done_tx));

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, _addr)) => {
                        tracing::debug!("Client connected");
                        self.pending.fetch_add(1, Ordering::SeqCst);
                        if queue_tx.send(stream).is_err() {
                            tracing::error!("Pass worker stopped unexpectedly");
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::error!("Accept error: {err}");
                    }
                },

                // A finished pass counts as activity and restarts the idle clock.
                changed = done_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                () = tokio::time::sleep(self.idle_timeout) => {
                    if self.pending.load(Ordering::SeqCst) == 0 {
                        tracing::info!(
                            "No client for {}, shutting down",
                            humantime::format_duration(self.idle_timeout)
                        );
                        break;
                    }
                }
            }
        }

        // Refuse new connections before waiting on the worker.
        drop(listener);
        drop(queue_tx);
        worker.await.context("Pass worker panicked")?;
        Ok(())
    }

    async fn pass_worker(
        self: Arc<Self>,
        mut queue: mpsc::UnboundedReceiver<UnixStream>,
        done: watch::Sender<u64>,
    ) {
        while let Some(first) = queue.recv().await {
            let mut clients = vec![first];
            while let Ok(next) = queue.try_recv() {
                clients.push(next);
            }

            tracing::debug!(
                "Starting pass for {} client(s), {} dirty director(ies)",
                clients.len(),
                self.dirty.len()
            );
            if let Err(err) = self.run_pass().await {
                tracing::error!("Gazelle pass failed: {err:#}");
            }

            self.pending.fetch_sub(clients.len(), Ordering::SeqCst);
            // Closing the connections tells the clients the pass is over.
            drop(clients);
            done.send_modify(|passes| *passes += 1);
        }
    }

    fn cleanup(&self) {
        tracing::info!("Cleaning up server resources");
        if self.socket_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.socket_path) {
                tracing::warn!("Failed to remove socket file: {err}");
            }
        }
    }
}

/// Bind a Unix listener at `path`, replacing a stale socket file.
pub(crate) fn bind_listener(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if path.exists() {
        std::fs::remove_file(path).context("Failed to remove existing socket file")?;
    }

    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind Unix socket {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).context("Failed to set socket permissions")?;
    }

    Ok(listener)
}
