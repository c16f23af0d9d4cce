//! In-memory filesystem snapshots and the tree diff that turns two
//! filesystem states into change events.
//!
//! - [`FileMeta`]: the observed state of a single entry
//! - [`SnapshotNode`]: one entry plus its owned children
//! - [`TreeBuilder`]: walks the filesystem once to create a subtree
//! - [`Differ`]: re-reads the filesystem, emits events and updates a subtree

/// Tree construction from the live filesystem.
pub mod builder;
/// Tree comparison against the live filesystem.
pub mod diff;
/// Entry metadata and directory listing.
pub mod meta;
/// Snapshot tree nodes.
pub mod node;

pub use builder::TreeBuilder;
pub use diff::{Cancelled, Differ, EventSink, Presence};
pub use meta::FileMeta;
pub use node::SnapshotNode;
