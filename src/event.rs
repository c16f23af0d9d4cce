//! Change events delivered to watcher consumers.

use crate::snapshot::FileMeta;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of change detected between two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    /// A new entry appeared
    Create,
    /// The entry's modification time changed
    Write,
    /// The entry disappeared
    Remove,
    /// The entry's mode bits changed
    Chmod,
}

impl Op {
    /// All operation kinds, in declaration order.
    pub const ALL: [Self; 4] = [Self::Create, Self::Write, Self::Remove, Self::Chmod];

    /// Uppercase name used when rendering events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Write => "WRITE",
            Self::Remove => "REMOVE",
            Self::Chmod => "CHMOD",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "write" => Ok(Self::Write),
            "remove" => Ok(Self::Remove),
            "chmod" => Ok(Self::Chmod),
            other => Err(format!(
                "unknown operation '{other}' (expected create, write, remove or chmod)"
            )),
        }
    }
}

/// A single change notification.
///
/// `metadata` is the new state for `Create`/`Write`/`Chmod` and the last
/// known state for `Remove`. Triggered events carry the path `-`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// What happened
    pub op: Op,
    /// Absolute path of the affected entry
    pub path: PathBuf,
    /// Metadata attached to the event, if any
    pub metadata: Option<FileMeta>,
}

impl Event {
    /// Build an event carrying metadata.
    #[must_use]
    pub fn new(op: Op, path: impl Into<PathBuf>, metadata: FileMeta) -> Self {
        Self {
            op,
            path: path.into(),
            metadata: Some(metadata),
        }
    }

    /// Base name of the affected entry, empty when no metadata is attached.
    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.as_ref().map_or("", |meta| meta.name.as_str())
    }

    /// Whether the entry is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.metadata.as_ref().is_some_and(|meta| meta.is_dir)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(meta) = &self.metadata else {
            return f.write_str("???");
        };
        let kind = if meta.is_dir { "DIRECTORY" } else { "FILE" };
        write!(
            f,
            "{kind} {:?} {} [{}]",
            meta.name,
            self.op,
            self.path.display()
        )
    }
}
