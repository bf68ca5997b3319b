//! Workspace traversal that honors gazelle visibility directives.
//!
//! Each directory's build file may carry `# gazelle:exclude <glob>` and
//! `# gazelle:follow <path>` lines. Both are relative to the directory that
//! declares them and apply to everything beneath it. A `.bazelignore` file at
//! the root names directories that are skipped unless explicitly followed.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Build file names, in the order a directory's directives are read from.
pub const BUILD_FILE_NAMES: [&str; 2] = ["BUILD.bazel", "BUILD"];

const DIRECTIVE_PREFIX: &str = "# gazelle:";

/// One visited directory and the visible regular files directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute path of the directory.
    pub dir: PathBuf,
    /// Base names of visible, non-excluded files. Directories are not listed.
    pub files: Vec<String>,
}

#[derive(Clone, Default)]
struct Directives {
    excludes: Vec<GlobMatcher>,
    follows: Vec<String>,
}

impl Directives {
    fn is_excluded(&self, rel: &str) -> bool {
        self.excludes.iter().any(|m| m.is_match(rel))
    }

    fn is_followed(&self, rel: &str) -> bool {
        self.follows.iter().any(|f| f == rel)
    }

    /// Extend the inherited directives with those declared in `dir`.
    fn extend_from(&self, dir: &Path, rel: &str) -> Self {
        let mut next = self.clone();
        let Some(content) = read_build_file(dir) else {
            return next;
        };

        for line in content.lines() {
            let Some(directive) = line.trim().strip_prefix(DIRECTIVE_PREFIX) else {
                continue;
            };
            let Some((key, value)) = directive.split_once(char::is_whitespace) else {
                continue;
            };
            let value = join_rel(rel, value.trim().trim_end_matches('/'));
            match key {
                "exclude" => match GlobBuilder::new(&value).literal_separator(true).build() {
                    Ok(glob) => next.excludes.push(glob.compile_matcher()),
                    Err(err) => {
                        tracing::warn!("{}: invalid exclude pattern {value:?}: {err}", dir.display());
                    }
                },
                "follow" => next.follows.push(value),
                _ => {}
            }
        }

        next
    }
}

fn read_build_file(dir: &Path) -> Option<String> {
    BUILD_FILE_NAMES.iter().find_map(|name| fs::read_to_string(dir.join(name)).ok())
}

fn join_rel(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{rel}/{name}")
    }
}

fn read_bazelignore(root: &Path) -> HashSet<String> {
    let Ok(content) = fs::read_to_string(root.join(".bazelignore")) else {
        return HashSet::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_end_matches('/').to_string())
        .collect()
}

struct Walker<F> {
    ignored: HashSet<String>,
    visit: F,
}

impl<F: FnMut(&WalkEntry)> Walker<F> {
    fn visit_dir(&mut self, dir: PathBuf, rel: &str, inherited: &Directives) {
        let directives = inherited.extend_from(&dir, rel);

        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                tracing::warn!("skipping {}: {err}", dir.display());
                return;
            }
        };

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("error listing {}: {err}", dir.display());
                    continue;
                }
            };
            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!("skipping non-UTF-8 name in {}", dir.display());
                continue;
            };
            if name == ".git" {
                continue;
            }

            let entry_rel = join_rel(rel, &name);
            if directives.is_excluded(&entry_rel) {
                tracing::debug!("excluded {entry_rel}");
                continue;
            }

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    tracing::warn!("cannot stat {}: {err}", entry.path().display());
                    continue;
                }
            };

            if file_type.is_dir() {
                subdirs.push((name, entry_rel));
            } else if file_type.is_symlink() {
                // Symlinks resolve to their target's kind; dangling links are skipped.
                match fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_dir() => {
                        if directives.is_followed(&entry_rel) {
                            subdirs.push((name, entry_rel));
                        }
                    }
                    Ok(_) => files.push(name),
                    Err(err) => tracing::debug!("broken symlink {}: {err}", entry.path().display()),
                }
            } else {
                files.push(name);
            }
        }
        files.sort();
        subdirs.sort();

        let walk_entry = WalkEntry { dir, files };
        (self.visit)(&walk_entry);

        for (name, sub_rel) in subdirs {
            if self.ignored.contains(&sub_rel) && !directives.is_followed(&sub_rel) {
                tracing::debug!("ignored {sub_rel}");
                continue;
            }
            self.visit_dir(walk_entry.dir.join(name), &sub_rel, &directives);
        }
    }
}

/// Walk the directory tree rooted at `root`.
///
/// `visit` is called once per visible directory with its absolute path and
/// the base names of its visible regular files. Unreadable directories are
/// logged and skipped. Fails without calling `visit` if `root` cannot be made
/// absolute.
pub fn walk_workspace<F>(root: &Path, visit: F) -> Result<()>
where
    F: FnMut(&WalkEntry),
{
    let root = std::path::absolute(root)
        .with_context(|| format!("failed to find absolute path of {}", root.display()))?;

    let mut walker = Walker { ignored: read_bazelignore(&root), visit };
    walker.visit_dir(root, "", &Directives::default());
    Ok(())
}
