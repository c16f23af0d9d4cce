#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Event counters and node counts cannot overflow

//! # Pollwatch - Polling File Watcher
//!
//! Pollwatch detects filesystem changes by periodically re-reading metadata
//! and comparing it against an in-memory snapshot. It needs no kernel
//! notification facility, so it behaves the same on every platform and on
//! network or virtual filesystems.
//!
//! ## Features
//!
//! - **Snapshot Diffing**: Create, Write, Remove and Chmod detected per entry
//! - **Recursive Roots**: Whole trees or a directory plus its immediate children
//! - **Filtering**: Regex excludes/includes on names and paths, hidden-file policy
//! - **Backpressure**: Unbuffered event delivery paces detection to the consumer
//! - **Parallel Builds**: Uses Rayon to walk sibling subtrees concurrently
//!
//! ## Architecture
//!
//! - [`snapshot`]: Snapshot tree, builder and diff engine
//! - [`watcher`]: Lifecycle, poll loop and event delivery
//! - [`filter`]: Name/path patterns and hidden-file policy
//! - [`event`]: Change events and operation kinds
//! - [`config`]: TOML configuration for the command-line front-end
//! - [`runner`]: Command execution on events
//! - [`output`]: Output styling and verbosity
//!
//! ## Example Usage
//!
//! ```no_run
//! use pollwatch::{Op, Watcher};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let watcher = Arc::new(Watcher::new());
//! watcher.ignore_names(&[r"\.swp$"])?;
//! watcher.filter_ops(&[Op::Create, Op::Write]);
//! watcher.add_path("src", true)?;
//!
//! let events = watcher.events();
//! std::thread::spawn(move || {
//!     for event in events {
//!         println!("{event}");
//!     }
//! });
//!
//! watcher.start(Duration::from_millis(100))?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Configuration parsing, validation and application.
pub mod config;

/// Error types returned by the watcher.
pub mod error;

/// Change events and operation kinds.
pub mod event;

/// Include/exclude patterns and hidden-file detection.
pub mod filter;

/// Output formatting and verbosity control.
pub mod output;

/// Running a user command in response to events.
pub mod runner;

/// Snapshot trees and the diff engine.
pub mod snapshot;

/// The polling watcher.
pub mod watcher;

pub use error::{Result, WatchError};
pub use event::{Event, Op};
pub use filter::FilterSet;
pub use snapshot::FileMeta;
pub use watcher::{Lifecycle, Watcher};

/// Current version of the pollwatch crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Polling interval used when none is configured.
pub const DEFAULT_INTERVAL: &str = "100ms";

/// Configuration file path relative to the user's config directory.
pub const DEFAULT_CONFIG_PATH: &str = "pollwatch/config.toml";
