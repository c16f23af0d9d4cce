use super::meta::FileMeta;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Cached state of one filesystem entry and, for directories, its children.
///
/// Nodes are owned by their parent (or by the watcher's root map) and are
/// only ever touched while the watcher's state lock is held.
#[derive(Debug, Clone)]
pub struct SnapshotNode {
    /// Absolute path of the entry
    pub(crate) path: PathBuf,
    /// Metadata seen on the last successful poll
    pub(crate) metadata: FileMeta,
    /// Excluded or a symlink: listed but never expanded or diffed
    pub(crate) ignored: bool,
    /// Matched an exclusion filter: never reported in events
    pub(crate) excluded: bool,
    /// Poll this directory's listing and keep its children
    pub(crate) recursive: bool,
    /// `recursive` flag handed to children discovered under this node
    pub(crate) child_recursive: bool,
    /// Children keyed by base name
    pub(crate) children: BTreeMap<String, SnapshotNode>,
}

impl SnapshotNode {
    /// Create a childless node.
    ///
    /// Symbolic links are always ignored so traversal can never cycle,
    /// but unlike excluded entries their creation and removal are reported.
    pub(crate) fn new(path: PathBuf, metadata: FileMeta, recursive: bool, excluded: bool) -> Self {
        Self {
            ignored: excluded || metadata.is_symlink,
            excluded,
            path,
            metadata,
            recursive,
            child_recursive: recursive,
            children: BTreeMap::new(),
        }
    }

    /// Absolute path of this entry.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata from the last poll.
    #[must_use]
    pub const fn metadata(&self) -> &FileMeta {
        &self.metadata
    }

    /// Whether this entry is a placeholder that is never polled.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Whether this entry matched an exclusion filter.
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Whether this directory's listing is polled.
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Child node by base name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.get(name)
    }

    /// Iterate over the direct children in name order.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.values()
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.values().map(Self::len).sum::<usize>()
    }

    /// Always false; a subtree contains at least its own root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Flatten this subtree into `out`, keyed by absolute path.
    pub fn collect_into(&self, out: &mut HashMap<PathBuf, FileMeta>) {
        out.insert(self.path.clone(), self.metadata.clone());
        for child in self.children.values() {
            child.collect_into(out);
        }
    }

    /// Flatten this subtree into a new map.
    #[must_use]
    pub fn flatten(&self) -> HashMap<PathBuf, FileMeta> {
        let mut out = HashMap::new();
        self.collect_into(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn meta(name: &str, is_dir: bool, is_symlink: bool) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            size: 0,
            mode: 0o755,
            modified: SystemTime::UNIX_EPOCH,
            is_dir,
            is_symlink,
        }
    }

    fn tree() -> SnapshotNode {
        let mut root = SnapshotNode::new(PathBuf::from("/r"), meta("r", true, false), true, false);
        let mut sub = SnapshotNode::new(PathBuf::from("/r/sub"), meta("sub", true, false), true, false);
        sub.children.insert(
            "leaf".to_string(),
            SnapshotNode::new(PathBuf::from("/r/sub/leaf"), meta("leaf", false, false), true, false),
        );
        root.children.insert("sub".to_string(), sub);
        root.children.insert(
            "a".to_string(),
            SnapshotNode::new(PathBuf::from("/r/a"), meta("a", false, false), true, false),
        );
        root
    }

    #[test]
    fn test_symlink_nodes_are_ignored() {
        let node = SnapshotNode::new(PathBuf::from("/r/link"), meta("link", false, true), true, false);
        assert!(node.is_ignored());
        assert!(!node.is_excluded());
    }

    #[test]
    fn test_len_counts_subtree() {
        assert_eq!(tree().len(), 4);
    }

    #[test]
    fn test_flatten_contains_every_node() {
        let flat = tree().flatten();
        assert_eq!(flat.len(), 4);
        assert!(flat.contains_key(Path::new("/r")));
        assert!(flat.contains_key(Path::new("/r/sub/leaf")));
        assert_eq!(flat[Path::new("/r/a")].name, "a");
    }

    #[test]
    fn test_children_in_name_order() {
        let root = tree();
        let names: Vec<_> = root.children().map(|c| c.metadata().name.clone()).collect();
        assert_eq!(names, vec!["a", "sub"]);
        assert!(root.child("sub").is_some_and(SnapshotNode::is_recursive));
    }
}
