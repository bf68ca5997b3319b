//! The set of directories waiting for regeneration.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

/// Directories reported changed since the last regeneration pass.
///
/// Shared between the change watcher and the server. The server drains it
/// at the start of each pass, so anything marked while a pass runs waits
/// for the next one.
#[derive(Debug, Default)]
pub struct DirtySet {
    dirs: Mutex<HashSet<PathBuf>>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `dir` as needing regeneration. Returns `false` if it was already pending.
    pub fn mark(&self, dir: PathBuf) -> bool {
        self.lock().insert(dir)
    }

    /// Take every pending directory, sorted, leaving the set empty.
    pub fn drain(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.lock().drain().collect();
        dirs.sort();
        dirs
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.dirs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
