//! Runs gazelle through `bazel run`, either over the whole repository or
//! over an explicit set of directories.

use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::utils::error::RegenerationError;

/// How much of the workspace a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The entire repository.
    Full,
    /// Only the given directories, without recursing.
    Fast,
}

/// A fully-built command line for the regeneration engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executes an [`Invocation`] to completion.
pub trait CommandRunner: Send + Sync + 'static {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<()>> + Send;
}

/// Runs invocations as child processes that inherit stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| RegenerationError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(RegenerationError::ExitStatus { status }.into());
        }
        Ok(())
    }
}

/// Builds gazelle command lines and hands them to a [`CommandRunner`].
pub struct Invoker<R> {
    bazel: PathBuf,
    gazelle_label: String,
    runner: R,
}

impl<R: CommandRunner> Invoker<R> {
    pub fn new(bazel: PathBuf, gazelle_label: String, runner: R) -> Self {
        Self { bazel, gazelle_label, runner }
    }

    /// The command line for a run, or `None` when there is nothing to do.
    pub fn invocation(&self, mode: Mode, dirs: &[PathBuf]) -> Option<Invocation> {
        if mode == Mode::Fast && dirs.is_empty() {
            return None;
        }

        let mut args = vec![
            "run".to_string(),
            self.gazelle_label.clone(),
            "--".to_string(),
            "-args".to_string(),
            "-index=false".to_string(),
        ];
        if mode == Mode::Fast {
            args.push("-r=false".to_string());
            args.extend(dirs.iter().map(|d| d.to_string_lossy().into_owned()));
        }

        Some(Invocation { program: self.bazel.clone(), args })
    }

    /// Run gazelle. A fast run over no directories succeeds without launching anything.
    pub async fn run(&self, mode: Mode, dirs: &[PathBuf]) -> Result<()> {
        let Some(invocation) = self.invocation(mode, dirs) else {
            tracing::debug!("no directories to update");
            return Ok(());
        };
        tracing::info!("running gazelle: {invocation}");
        self.runner.run(&invocation).await
    }
}
