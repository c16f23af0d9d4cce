#![allow(dead_code)]

use anyhow::Result;
use crossbeam_channel::Receiver;
use filetime::FileTime;
use pollwatch::{Event, Op, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

/// How long a drained event channel must stay silent before a cycle is
/// considered finished.
pub const QUIET: Duration = Duration::from_millis(500);

/// Upper bound when waiting for a specific event.
pub const PATIENCE: Duration = Duration::from_secs(10);

/// Interval long enough that only the first cycle runs during a test.
pub const ONE_CYCLE: Duration = Duration::from_secs(3600);

/// Temporary directory tree to watch.
///
/// The watched root is a plain subdirectory: tempfile names its directories
/// with a leading dot, which the hidden-file policy would skip.
pub struct WatchFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl WatchFixture {
    /// Create an empty watch root
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("root");
        fs::create_dir(&root)?;
        Ok(Self { temp_dir, root })
    }

    /// Absolute path of `rel` under the root
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file, creating parent directories
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Create a directory and its parents
    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }
}

impl Default for WatchFixture {
    fn default() -> Self {
        Self::new().expect("Failed to create watch fixture")
    }
}

/// Move a path's modification time by `secs` without touching its content.
pub fn bump_mtime(path: &Path, secs: u64) {
    let mtime = SystemTime::now() + Duration::from_secs(secs);
    filetime::set_file_mtime(path, FileTime::from_system_time(mtime)).unwrap();
}

/// A watcher whose poll loop runs on a background thread.
pub struct Running {
    pub watcher: Arc<Watcher>,
    handle: Option<JoinHandle<pollwatch::Result<()>>>,
}

impl Running {
    /// Start `watcher` and wait until its loop is up
    pub fn start(watcher: Arc<Watcher>, interval: Duration) -> Self {
        let runner = Arc::clone(&watcher);
        let handle = thread::spawn(move || runner.start(interval));
        watcher.wait();
        Self {
            watcher,
            handle: Some(handle),
        }
    }

    /// Close the watcher and join the loop
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.watcher.close();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap().unwrap();
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if self.handle.is_some() && !thread::panicking() {
            self.shutdown();
        } else {
            self.watcher.close();
        }
    }
}

/// Receive events until the channel stays quiet for `QUIET`.
pub fn drain(events: &Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = events.recv_timeout(QUIET) {
        out.push(event);
    }
    out
}

/// Receive events until one matches `op` on `path`, or `PATIENCE` runs out.
pub fn wait_for(events: &Receiver<Event>, op: Op, path: &Path) -> Option<Event> {
    let deadline = Instant::now() + PATIENCE;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(left) {
            Ok(event) if event.op == op && event.path == path => return Some(event),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

/// Events in `events` for `path`.
pub fn for_path<'a>(events: &'a [Event], path: &'a Path) -> impl Iterator<Item = &'a Event> {
    events.iter().filter(move |event| event.path == path)
}
