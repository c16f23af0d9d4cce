use crate::error::{Result, WatchError};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Last observed state of a filesystem entry.
///
/// The same record is used for real `lstat` results and for synthesized
/// metadata attached to triggered events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Base name of the entry
    pub name: String,
    /// Length in bytes
    pub size: u64,
    /// Mode bits (`st_mode` on Unix, a simplified model elsewhere)
    pub mode: u32,
    /// Modification time
    pub modified: SystemTime,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Whether the entry is a symbolic link
    pub is_symlink: bool,
}

impl FileMeta {
    /// Read metadata for `path` without following symbolic links.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NotFound`] if the entry is missing, or
    /// [`WatchError::Io`] for any other stat failure.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)
            .map_err(|e| WatchError::from_stat(path.to_path_buf(), e))?;
        Ok(Self::from_metadata(base_name(path), &metadata))
    }

    /// Build a record from already fetched `lstat` metadata.
    #[must_use]
    pub fn from_metadata(name: String, metadata: &Metadata) -> Self {
        Self {
            name,
            size: metadata.len(),
            mode: mode_bits(metadata),
            // Some platforms cannot report mtime; treat it as the epoch so
            // comparisons stay stable between polls.
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: metadata.is_dir(),
            is_symlink: metadata.file_type().is_symlink(),
        }
    }

    /// Placeholder metadata stamped with the current time.
    #[must_use]
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            mode: 0,
            modified: SystemTime::now(),
            is_dir: false,
            is_symlink: false,
        }
    }
}

/// One entry of a live directory listing.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub meta: FileMeta,
}

/// List the immediate entries of `dir`, sorted by file name.
///
/// Entries that vanish between the directory read and their `lstat` are
/// skipped; only a failure to read `dir` itself is reported.
pub(crate) fn list_dir(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();

    for item in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory listing failed")));
            }
            Err(_) => continue,
        };

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push(Entry {
            meta: FileMeta::from_metadata(name.clone(), &metadata),
            name,
            path: entry.into_path(),
        });
    }

    Ok(entries)
}

/// Base name of `path`, falling back to the whole path for roots like `/`.
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(windows)]
fn mode_bits(metadata: &Metadata) -> u32 {
    // Only the read-only flag is meaningful on Windows
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(not(any(unix, windows)))]
fn mode_bits(_metadata: &Metadata) -> u32 {
    0o644
}
