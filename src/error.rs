//! Error taxonomy for watcher configuration, lifecycle and polling.
//!
//! Synchronous failures (bad paths, bad intervals, lifecycle misuse) are
//! returned from the call that caused them. Transient failures seen while
//! polling are offered on the watcher's error stream instead.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the watcher and its snapshot engine.
#[derive(Error, Debug)]
pub enum WatchError {
    /// A path passed to add/build does not exist.
    #[error("path not found: {}", path.display())]
    NotFound {
        /// Path that could not be stat'ed
        path: PathBuf,
    },

    /// A watch root is itself a symbolic link.
    #[error("cannot watch symbolic link: {}", path.display())]
    SymlinkNotSupported {
        /// Offending root path
        path: PathBuf,
    },

    /// The polling interval is below the minimum resolution.
    #[error("polling interval {interval:?} is less than 1ns")]
    DurationTooShort {
        /// Interval that was rejected
        interval: Duration,
    },

    /// `start` was called while a polling loop is already running.
    #[error("watcher is already running")]
    AlreadyRunning,

    /// `start` was called on a watcher that has been closed.
    #[error("watcher has been closed; create a new one to watch again")]
    AlreadyClosed,

    /// A filter pattern failed to compile.
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern as supplied by the caller
        pattern: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },

    /// Any other I/O failure while reading the filesystem.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read when the failure occurred
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl WatchError {
    /// Classify an `lstat` failure on `path`.
    ///
    /// Missing entries become [`WatchError::NotFound`]; everything else is
    /// kept as [`WatchError::Io`].
    pub(crate) fn from_stat(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WatchError>;
