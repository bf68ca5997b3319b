use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::args::OutputFormat;
use crate::cli::output::OutputFormatter;
use crate::config::{self, DaemonSettings, WORKSPACE_ENV};
#[cfg(unix)]
use crate::daemon::{client, DaemonServer};
use crate::deps::{ImportOptions, Importer};
#[cfg(unix)]
use crate::gazelle::ProcessRunner;
use crate::workspace::{restore_build_files_in_dir, restore_build_files_in_repo};

/// The workspace root: `BUILD_WORKSPACE_DIRECTORY` when set, else the
/// current directory.
fn workspace_root() -> Result<PathBuf> {
    match std::env::var_os(WORKSPACE_ENV) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => std::env::current_dir().context("Failed to determine current directory"),
    }
}

pub async fn handle_import_command(
    lockfile: &Path,
    go_proxy: Option<&str>,
    go_private: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let options = ImportOptions {
        proxy_base: config::go_proxy_base(go_proxy),
        private_pattern: go_private,
        ..ImportOptions::default()
    };
    tracing::debug!("Resolving modules through {}", options.proxy_base);

    let rules = Importer::new(&options).import_file(lockfile).await?;

    let output = OutputFormatter::new(format).format_rules(&rules);
    if !output.is_empty() {
        println!("{}", output.trim_end_matches('\n'));
    }
    Ok(())
}

pub fn handle_restore_command(dir: Option<&Path>) -> Result<()> {
    let program = config::program_name();
    let restored = match dir {
        Some(dir) => {
            if !dir.is_dir() {
                anyhow::bail!("{} is not a directory", dir.display());
            }
            restore_build_files_in_dir(dir, &program)
        }
        None => {
            let root = workspace_root()?;
            restore_build_files_in_repo(&root, &program)?
        }
    };

    println!("Restored {restored} build file(s)");
    Ok(())
}

/// Run the server, or signal a running one and wait for its pass.
#[cfg(unix)]
pub async fn handle_daemon_command(settings: DaemonSettings) -> Result<()> {
    if settings.server {
        tracing::info!(
            "Starting server for {} (idle timeout {})",
            settings.workspace.display(),
            humantime::format_duration(settings.idle_timeout)
        );
        let server = DaemonServer::new(&settings, config::program_name(), ProcessRunner);
        server.start().await?;
        tracing::info!("Server stopped");
        return Ok(());
    }

    client::signal(&settings.socket_path).await
}

#[cfg(not(unix))]
pub async fn handle_daemon_command(_settings: DaemonSettings) -> Result<()> {
    anyhow::bail!("The autogazelle server and client are only supported on Unix systems")
}
