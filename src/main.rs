use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
#[cfg(unix)]
mod daemon;
mod deps;
mod gazelle;
mod utils;
mod workspace;

use cli::args::{Cli, Commands};
use config::DaemonSettings;

fn env_filter(verbose: bool, quiet_level: &str) -> EnvFilter {
    let level = if verbose { "debug" } else { quiet_level };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("autogazelle={level}")))
}

fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, "warn"))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// The server has no terminal, so it appends to its log file instead.
fn init_server_logging(log_path: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, "info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Import { lockfile, go_proxy, go_private, format }) => {
            init_stderr_logging(cli.verbose);
            commands::handle_import_command(&lockfile, go_proxy.as_deref(), go_private, format)
                .await
        }
        Some(Commands::Restore { dir }) => {
            init_stderr_logging(cli.verbose);
            commands::handle_restore_command(dir.as_deref())
        }
        None => {
            let settings = DaemonSettings::from_env(&cli.daemon)?;
            settings.enter_workspace()?;
            if settings.server {
                init_server_logging(&settings.log_path, cli.verbose)?;
            } else {
                init_stderr_logging(cli.verbose);
            }
            commands::handle_daemon_command(settings).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Errors before logging is set up still go through a subscriber.
            if !tracing::dispatcher::has_been_set() {
                init_stderr_logging(verbose);
            }
            tracing::error!("{}: {err:#}", config::program_name());
            ExitCode::FAILURE
        }
    }
}
