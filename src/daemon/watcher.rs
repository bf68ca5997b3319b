//! File system change notifications feeding the [`DirtySet`].
//!
//! Every visible directory gets its own non-recursive watch so directives
//! that hide a directory from gazelle also hide it from the watcher.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::dirty::DirtySet;
use crate::workspace::restore::SCRATCH_PREFIX;
use crate::workspace::walk::{walk_workspace, BUILD_FILE_NAMES};

/// Translates raw events into dirty directories.
struct EventSink {
    dirty: Arc<DirtySet>,
    /// Files owned by the daemon itself (socket, log).
    own_files: Vec<PathBuf>,
}

impl EventSink {
    fn is_ignored(&self, path: &Path) -> bool {
        if self.own_files.iter().any(|own| own == path) {
            return true;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        // Build files are what gazelle writes; reacting to them would loop.
        BUILD_FILE_NAMES.contains(&name) || name.starts_with(SCRATCH_PREFIX)
    }

    /// Mark the directories touched by `event`. Returns newly created
    /// directories that need watches of their own.
    fn record(&self, event: &Event) -> Vec<PathBuf> {
        let mut created = Vec::new();
        for path in &event.paths {
            if self.is_ignored(path) {
                continue;
            }
            if let Some(parent) = path.parent() {
                if self.dirty.mark(parent.to_path_buf()) {
                    tracing::debug!("dirty: {}", parent.display());
                }
            }
            if matches!(event.kind, EventKind::Create(_)) && path.is_dir() {
                created.push(path.clone());
            }
        }
        created
    }
}

/// Watch every visible directory under `root`, marking dirty ones.
fn watch_tree(watcher: &mut RecommendedWatcher, root: &Path, dirty: Option<&DirtySet>) -> Result<()> {
    walk_workspace(root, |entry| {
        if let Err(err) = watcher.watch(&entry.dir, RecursiveMode::NonRecursive) {
            tracing::warn!("cannot watch {}: {err}", entry.dir.display());
        }
        if let Some(dirty) = dirty {
            dirty.mark(entry.dir.clone());
        }
    })
}

/// A running watcher. Dropping it stops notifications.
pub struct ChangeWatcher {
    task: JoinHandle<()>,
}

impl ChangeWatcher {
    /// Start watching `root`. `own_files` are paths the daemon writes itself
    /// and must not be reported as changes.
    pub fn start(root: &Path, dirty: Arc<DirtySet>, own_files: Vec<PathBuf>) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .context("Failed to create file watcher")?;

        watch_tree(&mut watcher, root, None)?;
        tracing::info!("watching {}", root.display());

        let sink = EventSink { dirty, own_files };
        let task = tokio::spawn(async move {
            while let Some(res) = rx.recv().await {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!("watch error: {err}");
                        continue;
                    }
                };
                for dir in sink.record(&event) {
                    if let Err(err) = watch_tree(&mut watcher, &dir, Some(&sink.dirty)) {
                        tracing::warn!("cannot watch new directory {}: {err:#}", dir.display());
                    }
                }
            }
        });

        Ok(Self { task })
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
