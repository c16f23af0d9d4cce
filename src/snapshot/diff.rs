use super::builder::TreeBuilder;
use super::meta::{Entry, FileMeta, list_dir};
use super::node::SnapshotNode;
use crate::error::WatchError;
use crate::event::{Event, Op};
use crate::filter::FilterSet;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, span, warn};

/// The sink refused an event; the current diff pass must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Whether a diffed entry still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Still on disk; the node was updated in place
    Present,
    /// Gone; the caller must drop the node
    Vanished,
}

/// Receives events and transient errors produced by a diff pass.
pub trait EventSink {
    /// Deliver one event, or report that the pass has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when no more events should be produced.
    fn emit(&mut self, event: Event) -> Result<(), Cancelled>;

    /// Report a recoverable failure. Dropped by default.
    fn report(&mut self, error: WatchError) {
        let _ = error;
    }
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) -> Result<(), Cancelled> {
        self.push(event);
        Ok(())
    }
}

/// Compares snapshot subtrees against the live filesystem.
///
/// Every mutation that belongs to an event is applied only after the sink
/// accepted that event, so a cancelled emission is detected again on the
/// next pass.
pub struct Differ<'a> {
    builder: TreeBuilder<'a>,
    /// Reads a directory's live entries
    list: fn(&Path) -> io::Result<Vec<Entry>>,
}

impl<'a> Differ<'a> {
    /// Create a differ that classifies new entries with `filters`.
    #[must_use]
    pub const fn new(filters: &'a FilterSet) -> Self {
        Self {
            builder: TreeBuilder::new(filters),
            list: list_dir,
        }
    }

    /// Diff every root, dropping roots whose path has vanished.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the sink stopped the pass early; roots not
    /// yet visited are left untouched.
    pub fn diff_roots<S: EventSink>(
        &self,
        roots: &mut BTreeMap<PathBuf, SnapshotNode>,
        sink: &mut S,
    ) -> Result<(), Cancelled> {
        let span = span!(Level::DEBUG, "diff_roots", roots = roots.len());
        let _guard = span.enter();

        let keys: Vec<PathBuf> = roots.keys().cloned().collect();
        for key in keys {
            let Some(root) = roots.get_mut(&key) else {
                continue;
            };
            if self.diff(root, sink)? == Presence::Vanished {
                debug!(root = %key.display(), "Watched root vanished");
                roots.remove(&key);
            }
        }
        Ok(())
    }

    /// Re-read `node` from disk, emit its changes and update it in place.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the sink refused an event; `node` keeps
    /// whatever was updated before that point.
    pub fn diff<S: EventSink>(
        &self,
        node: &mut SnapshotNode,
        sink: &mut S,
    ) -> Result<Presence, Cancelled> {
        if node.ignored {
            return Ok(Presence::Present);
        }

        let Ok(current) = FileMeta::from_path(&node.path) else {
            sink.emit(Event::new(Op::Remove, node.path.clone(), node.metadata.clone()))?;
            return Ok(Presence::Vanished);
        };

        if current.modified != node.metadata.modified {
            sink.emit(Event::new(Op::Write, node.path.clone(), current.clone()))?;
            node.metadata.modified = current.modified;
        }
        if current.mode != node.metadata.mode {
            sink.emit(Event::new(Op::Chmod, node.path.clone(), current.clone()))?;
        }
        node.metadata = current;

        if !node.metadata.is_dir || !node.recursive {
            return Ok(Presence::Present);
        }

        let live = match (self.list)(&node.path) {
            Ok(entries) => entries,
            Err(source) => {
                warn!(path = %node.path.display(), error = %source, "Failed to list directory, retrying next poll");
                sink.report(WatchError::Io {
                    path: node.path.clone(),
                    source,
                });
                return Ok(Presence::Present);
            }
        };
        let live: Vec<_> = live
            .into_iter()
            .filter(|entry| !self.builder.skips(entry))
            .collect();
        let live_names: HashSet<String> = live.iter().map(|e| e.name.clone()).collect();

        // Taken before inserting new children so they are not diffed twice
        let existing: Vec<String> = node
            .children
            .keys()
            .filter(|name| live_names.contains(*name))
            .cloned()
            .collect();

        for entry in live {
            if node.children.contains_key(&entry.name) {
                continue;
            }
            let name = entry.name.clone();
            let mut child = self.builder.shallow(entry, node.child_recursive);
            if child.excluded {
                node.children.insert(name, child);
                continue;
            }

            sink.emit(Event::new(Op::Create, child.path.clone(), child.metadata.clone()))?;
            if child.ignored {
                node.children.insert(name, child);
                continue;
            }
            let outcome = self.diff(&mut child, sink);
            if outcome != Ok(Presence::Vanished) {
                node.children.insert(name, child);
            }
            outcome?;
        }

        for name in existing {
            let Some(child) = node.children.get_mut(&name) else {
                continue;
            };
            if self.diff(child, sink)? == Presence::Vanished {
                node.children.remove(&name);
            }
        }

        let gone: Vec<String> = node
            .children
            .keys()
            .filter(|name| !live_names.contains(*name))
            .cloned()
            .collect();
        for name in gone {
            let Some(child) = node.children.get(&name) else {
                continue;
            };
            if !child.excluded {
                sink.emit(Event::new(Op::Remove, child.path.clone(), child.metadata.clone()))?;
            }
            node.children.remove(&name);
        }

        Ok(Presence::Present)
    }
}
