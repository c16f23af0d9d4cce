//! Polling watcher: owns the watched roots, runs the poll loop and delivers
//! events to consumers.
//!
//! # Threads and channels
//!
//! [`Watcher::start`] blocks the calling thread and runs the poll loop. Each
//! cycle spawns one scoped diff thread that holds the state lock for the
//! whole pass and hands raw events over a rendezvous channel. The loop
//! filters, counts and forwards them onto the public event channel, which is
//! also a rendezvous channel, so a slow consumer slows detection down instead
//! of growing a buffer.
//!
//! ```text
//! diff thread ──raw──▶ poll loop ──events──▶ consumer
//!      ▲                   │
//!      └──── cancel ───────┘  (cap reached or close requested)
//! ```
//!
//! Shutdown is signalled by dropping the close sender: every `select!` that
//! listens on it wakes up, and the signal can never be consumed by just one
//! of them.

use crate::error::{Result, WatchError};
use crate::event::{Event, Op};
use crate::filter::FilterSet;
use crate::snapshot::{Cancelled, Differ, EventSink, FileMeta, SnapshotNode, TreeBuilder};
use crossbeam_channel::{self as channel, Receiver, Sender, TryRecvError, select};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{Level, debug, info, span, trace, warn};

/// Capacity of the error stream; errors beyond it are logged and dropped.
const ERROR_BACKLOG: usize = 32;

/// Name given to synthesized metadata on triggered events.
const TRIGGERED_EVENT_NAME: &str = "triggered event";

/// Everything guarded by the coarse state lock.
#[derive(Default)]
struct State {
    /// Snapshot trees keyed by absolute root path
    roots: BTreeMap<PathBuf, SnapshotNode>,
    /// Include/exclude patterns and hidden policy
    filters: FilterSet,
    /// Operation kinds surfaced to the consumer (empty = all)
    ops: HashSet<Op>,
    /// Per-cycle delivery cap (0 = unlimited)
    max_events: usize,
}

/// Lifecycle of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, not started
    Idle,
    /// Poll loop running
    Running,
    /// Closed for good
    Closed,
}

/// How a poll cycle ended.
enum Cycle {
    /// Diff finished or was cut short by the event cap
    Finished,
    /// Close was requested
    Closed,
}

/// Polling file watcher.
///
/// Share it between threads with an `Arc`: one thread runs
/// [`Watcher::start`], others consume [`Watcher::events`] and eventually
/// call [`Watcher::close`].
///
/// # Deadlocks
///
/// A diff pass holds the state lock while it waits for the consumer to take
/// each event. The thread draining [`Watcher::events`] must therefore not
/// call anything that takes that lock (`add_path`, `remove_path`, the
/// filter setters, `set_max_events`, `list_watched`) nor `trigger_event`.
/// Reconfigure from another thread instead.
/// [`Watcher::close`] is always safe to call.
///
/// # Examples
///
/// ```no_run
/// use pollwatch::Watcher;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> anyhow::Result<()> {
/// let watcher = Arc::new(Watcher::new());
/// watcher.add_path(".", true)?;
///
/// let events = watcher.events();
/// std::thread::spawn(move || {
///     for event in events {
///         println!("{event}");
///     }
/// });
///
/// watcher.start(Duration::from_millis(100))?;
/// # Ok(())
/// # }
/// ```
pub struct Watcher {
    /// Roots and configuration
    state: Mutex<State>,
    /// Kept apart from `state` so `close` never waits on a diff pass
    lifecycle: Mutex<Lifecycle>,
    event_tx: Sender<Event>,
    event_rx: Receiver<Event>,
    error_tx: Sender<WatchError>,
    error_rx: Receiver<WatchError>,
    /// Dropped when `start` returns
    closed_tx: Mutex<Option<Sender<()>>>,
    closed_rx: Receiver<()>,
    /// Dropped by `close`
    close_tx: Mutex<Option<Sender<()>>>,
    close_rx: Receiver<()>,
    /// Dropped when `start` begins
    started_tx: Mutex<Option<Sender<()>>>,
    started_rx: Receiver<()>,
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Watcher {
    /// Create an idle watcher with no roots and no filters.
    #[must_use]
    pub fn new() -> Self {
        let (event_tx, event_rx) = channel::bounded(0);
        let (error_tx, error_rx) = channel::bounded(ERROR_BACKLOG);
        let (closed_tx, closed_rx) = channel::bounded(0);
        let (close_tx, close_rx) = channel::bounded(0);
        let (started_tx, started_rx) = channel::bounded(0);

        Self {
            state: Mutex::new(State::default()),
            lifecycle: Mutex::new(Lifecycle::Idle),
            event_tx,
            event_rx,
            error_tx,
            error_rx,
            closed_tx: Mutex::new(Some(closed_tx)),
            closed_rx,
            close_tx: Mutex::new(Some(close_tx)),
            close_rx,
            started_tx: Mutex::new(Some(started_tx)),
            started_rx,
        }
    }

    /// Receiver for change events.
    ///
    /// The channel has no buffer: the poll loop waits until each event is
    /// taken, so consumers must drain it continuously and must not call the
    /// lock-taking methods listed under [`Watcher`]'s deadlock notes.
    #[must_use]
    pub fn events(&self) -> Receiver<Event> {
        self.event_rx.clone()
    }

    /// Receiver for recoverable errors seen while polling.
    #[must_use]
    pub fn errors(&self) -> Receiver<WatchError> {
        self.error_rx.clone()
    }

    /// Receiver that disconnects once the poll loop has shut down.
    #[must_use]
    pub fn closed(&self) -> Receiver<()> {
        self.closed_rx.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        *lock(&self.lifecycle)
    }

    /// Whether the poll loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Start watching `path`.
    ///
    /// Must be called after the filters are configured: filters are applied
    /// while building and diffing, never retroactively. Adding a path that is
    /// already a root, excluded, or hidden under the hidden policy does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `path` does not exist ([`WatchError::NotFound`])
    /// - `path` is a symbolic link ([`WatchError::SymlinkNotSupported`])
    /// - `path` cannot be made absolute or listed ([`WatchError::Io`])
    pub fn add_path(&self, path: impl AsRef<Path>, recursive: bool) -> Result<()> {
        let path = absolute(path.as_ref())?;
        let mut state = self.lock_state();

        let metadata = FileMeta::from_path(&path)?;
        if metadata.is_symlink {
            return Err(WatchError::SymlinkNotSupported { path });
        }
        if state.roots.contains_key(&path) {
            return Ok(());
        }
        if state.filters.is_excluded(&metadata.name, &path) || state.filters.skips_hidden(&path) {
            debug!(path = %path.display(), "Skipping filtered root");
            return Ok(());
        }

        let root = TreeBuilder::new(&state.filters).build(&path, recursive)?;
        debug!(path = %path.display(), nodes = root.len(), recursive, "Added watch root");
        state.roots.insert(path, root);
        Ok(())
    }

    /// Stop watching the root at `path`. Unknown paths are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Io`] if `path` cannot be made absolute.
    pub fn remove_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = absolute(path.as_ref())?;
        if self.lock_state().roots.remove(&path).is_some() {
            debug!(path = %path.display(), "Removed watch root");
        }
        Ok(())
    }

    /// Ignore entries whose base name matches any of `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] for a malformed regex.
    pub fn ignore_names<S: AsRef<str>>(&self, patterns: &[S]) -> Result<()> {
        self.lock_state().filters.exclude_names(patterns)
    }

    /// Ignore entries whose absolute path matches any of `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] for a malformed regex.
    pub fn ignore_paths<S: AsRef<str>>(&self, patterns: &[S]) -> Result<()> {
        self.lock_state().filters.exclude_paths(patterns)
    }

    /// Only surface events whose base name matches one of `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] for a malformed regex.
    pub fn filter_names<S: AsRef<str>>(&self, patterns: &[S]) -> Result<()> {
        self.lock_state().filters.include_names(patterns)
    }

    /// Only surface events whose absolute path matches one of `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] for a malformed regex.
    pub fn filter_paths<S: AsRef<str>>(&self, patterns: &[S]) -> Result<()> {
        self.lock_state().filters.include_paths(patterns)
    }

    /// Only surface the given operation kinds. An empty slice surfaces all.
    pub fn filter_ops(&self, ops: &[Op]) {
        self.lock_state().ops = ops.iter().copied().collect();
    }

    /// Skip hidden files and directories.
    pub fn set_ignore_hidden(&self, ignore: bool) {
        self.lock_state().filters.set_ignore_hidden(ignore);
    }

    /// Limit the events delivered per poll cycle. Zero means no limit.
    pub fn set_max_events(&self, max_events: usize) {
        self.lock_state().max_events = max_events;
    }

    /// Every watched entry, including ignored placeholders, by absolute path.
    #[must_use]
    pub fn list_watched(&self) -> HashMap<PathBuf, FileMeta> {
        let state = self.lock_state();
        let mut out = HashMap::new();
        for root in state.roots.values() {
            root.collect_into(&mut out);
        }
        out
    }

    /// Send a synthetic event straight to the consumer.
    ///
    /// Blocks until the watcher has started. Without `metadata`, a
    /// placeholder named "triggered event" stamped with the current time is
    /// attached. The event is dropped if the watcher closes first.
    pub fn trigger_event(&self, op: Op, metadata: Option<FileMeta>) {
        self.wait();
        let metadata = metadata.unwrap_or_else(|| FileMeta::synthetic(TRIGGERED_EVENT_NAME));
        if !self.deliver(Event::new(op, "-", metadata)) {
            debug!(%op, "Triggered event dropped, watcher closed");
        }
    }

    /// Block until [`Watcher::start`] has been called.
    pub fn wait(&self) {
        // Disconnects when `start` drops the sender
        let _ = self.started_rx.recv();
    }

    /// Run the poll loop until [`Watcher::close`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `interval` is zero ([`WatchError::DurationTooShort`])
    /// - the watcher is already running ([`WatchError::AlreadyRunning`])
    /// - the watcher was closed before ([`WatchError::AlreadyClosed`])
    pub fn start(&self, interval: Duration) -> Result<()> {
        if interval < Duration::from_nanos(1) {
            return Err(WatchError::DurationTooShort { interval });
        }

        {
            let mut lifecycle = lock(&self.lifecycle);
            match *lifecycle {
                Lifecycle::Running => return Err(WatchError::AlreadyRunning),
                Lifecycle::Closed => return Err(WatchError::AlreadyClosed),
                Lifecycle::Idle => *lifecycle = Lifecycle::Running,
            }
        }
        lock(&self.started_tx).take();
        info!(?interval, "Watcher started");

        while !self.close_requested() {
            if let Cycle::Closed = self.run_cycle() {
                break;
            }
            select! {
                recv(self.close_rx) -> _ => break,
                default(interval) => {}
            }
        }

        lock(&self.closed_tx).take();
        info!("Watcher closed");
        Ok(())
    }

    /// Stop the poll loop and discard every root.
    ///
    /// Does nothing unless the watcher is running. Returns once the in-flight
    /// diff pass (if any) has stopped and the roots are gone; the loop itself
    /// winds down on its own thread, see [`Watcher::closed`].
    pub fn close(&self) {
        {
            let mut lifecycle = lock(&self.lifecycle);
            if *lifecycle != Lifecycle::Running {
                return;
            }
            *lifecycle = Lifecycle::Closed;
        }
        lock(&self.close_tx).take();
        self.lock_state().roots.clear();
        debug!("Close requested, roots discarded");
    }

    /// One poll cycle: diff every root and forward the surviving events.
    fn run_cycle(&self) -> Cycle {
        let span = span!(Level::DEBUG, "poll_cycle");
        let _guard = span.enter();

        // Snapshot the delivery-side config so forwarding never contends
        // with the diff thread for the state lock.
        let (ops, includes, max_events) = {
            let state = self.lock_state();
            (state.ops.clone(), state.filters.includes_only(), state.max_events)
        };

        let (raw_tx, raw_rx) = channel::bounded::<Event>(0);
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);

        thread::scope(|scope| {
            scope.spawn(move || self.poll_roots(raw_tx, cancel_rx));

            // Dropping this cancels the diff thread at its next emission
            let mut cancel = Some(cancel_tx);
            let mut delivered = 0usize;

            loop {
                select! {
                    recv(self.close_rx) -> _ => {
                        cancel.take();
                        return Cycle::Closed;
                    }
                    recv(raw_rx) -> msg => {
                        // Disconnected: the diff thread is done
                        let Ok(event) = msg else {
                            return Cycle::Finished;
                        };
                        if !ops.is_empty() && !ops.contains(&event.op) {
                            continue;
                        }
                        if !includes.is_included(event.name(), &event.path) {
                            continue;
                        }

                        if !self.deliver(event) {
                            cancel.take();
                            return Cycle::Closed;
                        }

                        // Stop before receiving again: a handed-over event
                        // is already applied to the tree.
                        delivered += 1;
                        if max_events > 0 && delivered >= max_events {
                            debug!(max_events, "Event cap reached, cutting cycle short");
                            cancel.take();
                            return Cycle::Finished;
                        }
                    }
                }
            }
        })
    }

    /// Body of the diff thread.
    fn poll_roots(&self, events: Sender<Event>, cancel: Receiver<()>) {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let mut sink = ChannelSink {
            events,
            cancel,
            errors: &self.error_tx,
        };
        if Differ::new(&state.filters)
            .diff_roots(&mut state.roots, &mut sink)
            .is_err()
        {
            debug!("Diff pass cancelled");
        }
    }

    /// Hand `event` to the consumer unless close is requested first.
    fn deliver(&self, event: Event) -> bool {
        select! {
            send(self.event_tx, event) -> res => res.is_ok(),
            recv(self.close_rx) -> _ => false,
        }
    }

    fn close_requested(&self) -> bool {
        matches!(self.close_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

/// Sink used by the diff thread: forwards events until cancelled.
struct ChannelSink<'a> {
    events: Sender<Event>,
    cancel: Receiver<()>,
    errors: &'a Sender<WatchError>,
}

impl EventSink for ChannelSink<'_> {
    fn emit(&mut self, event: Event) -> std::result::Result<(), Cancelled> {
        if matches!(self.cancel.try_recv(), Err(TryRecvError::Disconnected)) {
            return Err(Cancelled);
        }
        trace!(op = %event.op, path = %event.path.display(), "Detected change");
        select! {
            send(self.events, event) -> res => res.map_err(|_| Cancelled),
            recv(self.cancel) -> _ => Err(Cancelled),
        }
    }

    fn report(&mut self, error: WatchError) {
        if let Err(e) = self.errors.try_send(error) {
            warn!(error = %e.into_inner(), "Error stream full, dropping poll error");
        }
    }
}

/// Lock a mutex, recovering the data if a panicking thread poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|source| WatchError::Io {
        path: path.to_path_buf(),
        source,
    })
}
