//! Command-line interface definitions for pollwatch.
//!
//! The CLI definitions are shared between the main binary and build tools
//! (like xtask) for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes, so we
//! allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

use crate::event::Op;
use clap::{ArgAction, Parser};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Main CLI structure for pollwatch.
#[derive(Parser, Debug)]
#[command(
    name = "pollwatch",
    version = crate::VERSION,
    about = "Watch files for changes by polling",
    long_about = "A cross-platform file watcher that polls metadata and runs a command on changes"
)]
pub struct Cli {
    /// Paths to watch (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Poll interval, e.g. 100ms, 2s
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Watch directories recursively (default: true)
    #[arg(short, long, action = ArgAction::Set, value_name = "BOOL")]
    pub recursive: Option<bool>,

    /// Watch hidden files and directories (default: true)
    #[arg(long, action = ArgAction::Set, value_name = "BOOL")]
    pub dotfiles: Option<bool>,

    /// Comma separated path patterns to ignore
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Comma separated operations to report (create, write, remove, chmod)
    #[arg(long, value_delimiter = ',')]
    pub ops: Vec<Op>,

    /// Maximum events per poll cycle (0 for unlimited)
    #[arg(long)]
    pub max_events: Option<usize>,

    /// Command to run on each event
    #[arg(short, long)]
    pub cmd: Option<String>,

    /// Run the command once when watching starts
    #[arg(long)]
    pub startcmd: bool,

    /// Pipe the event to the command's stdin
    #[arg(long)]
    pub pipe: bool,

    /// Keep watching when the command exits with an error
    #[arg(long)]
    pub keepalive: bool,

    /// List watched files before watching
    #[arg(short, long)]
    pub list: bool,

    /// Configuration file
    #[arg(long, env = "POLLWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Paths to watch, defaulting to the current directory.
    #[must_use]
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }
}
