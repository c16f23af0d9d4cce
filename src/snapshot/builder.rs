use super::meta::{Entry, FileMeta, list_dir};
use super::node::SnapshotNode;
use crate::error::{Result, WatchError};
use crate::filter::FilterSet;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{Level, debug, span, warn};

/// Builds snapshot subtrees by walking the live filesystem once.
///
/// Sibling subtrees of a recursive build are walked in parallel on the
/// rayon pool.
pub struct TreeBuilder<'a> {
    /// Exclusion and hidden-file policy applied while walking
    filters: &'a FilterSet,
}

impl<'a> TreeBuilder<'a> {
    /// Create a builder that applies `filters`.
    #[must_use]
    pub const fn new(filters: &'a FilterSet) -> Self {
        Self { filters }
    }

    /// Snapshot `path` and, if it is a directory, its contents.
    ///
    /// With `recursive` false only the immediate children are recorded, as
    /// shallow nodes. The returned root always polls its own listing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `path` does not exist ([`WatchError::NotFound`])
    /// - `path` is a symbolic link ([`WatchError::SymlinkNotSupported`])
    /// - `path` is a directory that cannot be listed ([`WatchError::Io`])
    pub fn build(&self, path: &Path, recursive: bool) -> Result<SnapshotNode> {
        let span = span!(Level::DEBUG, "build", path = %path.display(), recursive);
        let _guard = span.enter();

        let metadata = FileMeta::from_path(path)?;
        if metadata.is_symlink {
            return Err(WatchError::SymlinkNotSupported {
                path: path.to_path_buf(),
            });
        }

        let mut root = SnapshotNode::new(path.to_path_buf(), metadata, true, false);
        root.child_recursive = recursive;

        if root.metadata.is_dir {
            let entries = list_dir(path).map_err(|source| WatchError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            root.children = self.build_children(entries, recursive);
        }

        debug!(nodes = root.len(), "snapshot built");
        Ok(root)
    }

    /// Node for a freshly listed entry, without descending into it.
    pub(crate) fn shallow(&self, entry: Entry, recursive: bool) -> SnapshotNode {
        let excluded = self.filters.is_excluded(&entry.name, &entry.path);
        SnapshotNode::new(entry.path, entry.meta, recursive, excluded)
    }

    /// Whether a listed entry is skipped by the hidden-file policy.
    pub(crate) fn skips(&self, entry: &Entry) -> bool {
        self.filters.skips_hidden(&entry.path)
    }

    fn build_children(&self, entries: Vec<Entry>, recursive: bool) -> BTreeMap<String, SnapshotNode> {
        entries
            .into_par_iter()
            .filter(|entry| !self.skips(entry))
            .map(|entry| (entry.name.clone(), self.build_child(entry, recursive)))
            .collect()
    }

    fn build_child(&self, entry: Entry, recursive: bool) -> SnapshotNode {
        let mut node = self.shallow(entry, recursive);
        if !recursive || node.ignored || !node.metadata.is_dir {
            return node;
        }

        match list_dir(&node.path) {
            Ok(entries) => node.children = self.build_children(entries, true),
            Err(e) => {
                // Left empty; the next diff lists it again
                warn!(path = %node.path.display(), error = %e, "Failed to list directory");
            }
        }
        node
    }
}
