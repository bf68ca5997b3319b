//! Turns the projects of a dep lock file into `go_repository` rules.
//!
//! Every project is resolved on its own task. Private projects keep their
//! pinned commit; the rest go through the module proxy, with a bounded
//! number of attempts. The result is sorted by rule name so the output is the
//! same whatever order the network answers in.

use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;
use std::time::Duration;

use super::manifest::{read_manifest, DepProject};
use super::proxy::{module_path, ProxyClient, ResolvedModule};
use super::rule::{import_path_to_repo_name, Rule, GO_REPOSITORY};
use crate::config::DEFAULT_GO_PROXY;
use crate::utils::error::ImportError;

/// Attempts per module before the import gives up.
pub const MAX_ATTEMPTS: usize = 5;

/// Pause between attempts. The proxy sometimes answers 410 for commits that exist.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub proxy_base: String,
    /// Glob of module paths that bypass the proxy.
    pub private_pattern: Option<String>,
    pub max_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            proxy_base: DEFAULT_GO_PROXY.to_string(),
            private_pattern: None,
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
enum PrivateMatcher {
    Nothing,
    Glob(GlobMatcher),
    /// A pattern that does not parse matches everything.
    Everything,
}

impl PrivateMatcher {
    fn new(pattern: Option<&str>) -> Self {
        let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
            return Self::Nothing;
        };
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => Self::Glob(glob.compile_matcher()),
            Err(err) => {
                tracing::warn!("invalid private pattern {pattern:?} ({err}); treating every project as private");
                Self::Everything
            }
        }
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Nothing => false,
            Self::Glob(glob) => glob.is_match(name),
            Self::Everything => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Importer {
    proxy: ProxyClient,
    private: PrivateMatcher,
    max_attempts: usize,
    retry_delay: Duration,
}

impl Importer {
    pub fn new(options: &ImportOptions) -> Self {
        Self {
            proxy: ProxyClient::new(options.proxy_base.clone()),
            private: PrivateMatcher::new(options.private_pattern.as_deref()),
            max_attempts: options.max_attempts.max(1),
            retry_delay: options.retry_delay,
        }
    }

    /// Read the lock file at `path` and resolve every project in it.
    pub async fn import_file(&self, path: &Path) -> Result<Vec<Rule>, ImportError> {
        let projects = read_manifest(path)?;
        tracing::debug!("{}: {} project(s)", path.display(), projects.len());
        self.import_projects(projects).await
    }

    /// Resolve every project concurrently and return the rules sorted by name.
    ///
    /// All tasks run to completion before anything is returned. If any
    /// project fails, the error of the earliest such project in `projects`
    /// is returned and no rules are.
    pub async fn import_projects(&self, projects: Vec<DepProject>) -> Result<Vec<Rule>, ImportError> {
        // One task per project; handle `i` belongs to `projects[i]`.
        let handles: Vec<_> = projects
            .into_iter()
            .map(|project| {
                let importer = self.clone();
                tokio::spawn(async move { importer.resolve_project(&project).await })
            })
            .collect();

        let mut rules = Vec::with_capacity(handles.len());
        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(rule)) => rules.push(rule),
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(join_err) => {
                    first_error.get_or_insert(ImportError::Task(join_err));
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        rules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rules)
    }

    /// Build the rule for one project.
    pub async fn resolve_project(&self, project: &DepProject) -> Result<Rule, ImportError> {
        let mut rule = Rule::new(GO_REPOSITORY, import_path_to_repo_name(&project.name));
        rule.set_attr("importpath", project.name.as_str());

        if self.private.is_match(&project.name) {
            rule.set_attr("commit", project.revision.as_str());
            if let Some(source) = &project.source {
                // The source may be an import path or a URL of any VCS; only git URLs work here.
                rule.set_attr("remote", source.as_str());
                rule.set_attr("vcs", "git");
            }
            return Ok(rule);
        }

        let module = module_path(project);
        let resolved = self.resolve_with_retry(&module, &project.revision).await?;
        rule.set_attr("urls", vec![resolved.zip_url.clone()]);
        rule.set_attr("sha256", resolved.sha256.clone());
        rule.set_attr("strip_prefix", resolved.strip_prefix());
        Ok(rule)
    }

    async fn resolve_with_retry(&self, module: &str, revision: &str) -> Result<ResolvedModule, ImportError> {
        let mut attempt = 1;
        loop {
            match self.proxy.resolve(module, revision).await {
                Ok(resolved) => return Ok(resolved),
                Err(err) if attempt < self.max_attempts => {
                    tracing::warn!(
                        "{module}@{revision}: attempt {attempt}/{} failed: {err}",
                        self.max_attempts
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(ImportError::Resolve {
                        module: module.to_string(),
                        revision: revision.to_string(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}
