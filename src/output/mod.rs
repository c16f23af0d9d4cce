//! Output formatting and styling for the pollwatch CLI.
//!
//! - Events go to stdout, colored by operation
//! - Status messages go to stderr, dimmed
//! - Warnings and errors are bold and always shown
//! - Verbosity control (quiet, normal, verbose)

use crate::event::{Event, Op};
use crate::snapshot::FileMeta;
use colored::{ColoredString, Colorize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress informational messages, show only events, warnings and errors.
    Quiet = 0,
    /// Default verbosity level, show all standard messages.
    Normal = 1,
    /// Show verbose debug messages in addition to standard output.
    Verbose = 2,
}

impl Verbosity {
    /// Pick a level from the `-v`/`-q` flags.
    #[must_use]
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Default `tracing` filter directive for this level.
    #[must_use]
    pub const fn log_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "pollwatch=debug",
        }
    }
}

/// Global verbosity setting (default: Normal).
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Sets the global verbosity level for all output functions.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Gets the current global verbosity level.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Prints a warning message in bold yellow (always shown).
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Prints an informational message in dimmed color (respects quiet mode).
pub fn info(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints a verbose debug message (only in verbose mode).
pub fn verbose(message: &str) {
    if get_verbosity() != Verbosity::Verbose {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// Prints an event on stdout, tinted by its operation.
pub fn event(event: &Event) {
    println!("{}", paint(event.op, &event.to_string()));
}

/// Prints the watch set on stdout, sorted by path.
pub fn watch_list(files: &HashMap<PathBuf, FileMeta>) {
    let mut paths: Vec<_> = files.iter().collect();
    paths.sort_by(|a, b| a.0.cmp(b.0));
    for (path, meta) in paths {
        if meta.is_dir {
            println!("{}", path.display().to_string().blue().bold());
        } else {
            println!("{}", path.display());
        }
    }
}

/// Color for an operation.
fn paint(op: Op, text: &str) -> ColoredString {
    match op {
        Op::Create => text.green(),
        Op::Write => text.normal(),
        Op::Remove => text.red(),
        Op::Chmod => text.yellow(),
    }
}
