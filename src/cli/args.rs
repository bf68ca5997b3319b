use clap::builder::styling::{AnsiColor, Styles};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::Cyan.on_default().bold())
    .placeholder(AnsiColor::Cyan.on_default())
    .error(AnsiColor::Red.on_default().bold());

const AFTER_HELP: &str = "\x1b[1;32mQuick Reference:\x1b[0m
  \x1b[1;36mKeep build files current\x1b[0m (run from a bazel wrapper script):
    autogazelle --server --gazelle //:gazelle   Start the background server
    autogazelle --gazelle //:gazelle            Ask the server to update changed directories

  \x1b[1;36mOne-shot commands:\x1b[0m
    autogazelle import Gopkg.lock               Print go_repository rules for a dep lock file
    autogazelle restore                         Regenerate BUILD files from BUILD.in templates";

#[derive(Parser)]
#[command(name = "autogazelle")]
#[command(about = "Track workspace changes and run gazelle to keep Bazel build files current")]
#[command(version)]
#[command(styles = STYLES)]
#[command(after_help = AFTER_HELP)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub daemon: DaemonArgs,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Flags of the client/server wrapper.
#[derive(Args, Debug, Clone)]
pub struct DaemonArgs {
    /// Act as the server instead of the client
    #[arg(long)]
    pub server: bool,

    /// Label of the gazelle target to invoke with 'bazel run'
    #[arg(long, value_name = "LABEL")]
    pub gazelle: Option<String>,

    /// How long the server waits for a client before quitting
    #[arg(long, value_name = "DURATION", default_value = "1h", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// UNIX socket the server listens on, relative to the workspace root
    #[arg(long, value_name = "PATH", default_value = "tools/autogazelle.socket")]
    pub socket: PathBuf,

    /// Server log file, relative to the workspace root
    #[arg(long, value_name = "PATH", default_value = "tools/autogazelle.log")]
    pub log: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a dep lock file (Gopkg.lock) into go_repository rules
    #[command(
        long_about = "Convert every project pinned in a dep lock file into a go_repository \
        rule. Public modules are resolved through the Go module proxy and pinned by the \
        SHA-256 of their archive; modules matching --go-private keep their commit.\n\n\
        Examples:\n  \
        autogazelle import Gopkg.lock\n  \
        autogazelle import Gopkg.lock --go-private 'github.com/mycorp/*'\n  \
        autogazelle import Gopkg.lock --format json"
    )]
    Import {
        /// Path to the lock file
        lockfile: PathBuf,

        /// Module proxy base URL
        #[arg(long, env = "GOPROXY", value_name = "URL")]
        go_proxy: Option<String>,

        /// Glob of module paths fetched directly from version control
        #[arg(long, env = "GOPRIVATE", value_name = "GLOB")]
        go_private: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Starlark)]
        format: OutputFormat,
    },

    /// Regenerate BUILD and BUILD.bazel files from their .in templates
    Restore {
        /// Restore only this directory (default: the whole workspace)
        dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Starlark,
    Json,
}
