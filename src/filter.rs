//! Name/path filters and hidden-file policy.
//!
//! Exclusion patterns decide which entries are recorded as ignored
//! placeholders (never expanded or diffed). Inclusion patterns only affect
//! which events reach the consumer.

use crate::error::{Result, WatchError};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Ordered include/exclude pattern sets plus the hidden-file policy.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    /// Names that must match for an event to be surfaced
    name_includes: Vec<Regex>,
    /// Names that mark an entry as ignored
    name_excludes: Vec<Regex>,
    /// Absolute paths that must match for an event to be surfaced
    path_includes: Vec<Regex>,
    /// Absolute paths that mark an entry as ignored
    path_excludes: Vec<Regex>,
    /// Skip hidden entries entirely
    ignore_hidden: bool,
}

impl FilterSet {
    /// Create an empty filter set that lets everything through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append name exclusion patterns.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] if any pattern fails to compile;
    /// no pattern from the batch is added in that case.
    pub fn exclude_names<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<()> {
        let compiled = compile_all(patterns.iter().map(|p| p.as_ref().to_string()))?;
        self.name_excludes.extend(compiled);
        Ok(())
    }

    /// Append name inclusion patterns.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] if any pattern fails to compile.
    pub fn include_names<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<()> {
        let compiled = compile_all(patterns.iter().map(|p| p.as_ref().to_string()))?;
        self.name_includes.extend(compiled);
        Ok(())
    }

    /// Append path exclusion patterns.
    ///
    /// Relative patterns are made absolute against the current directory
    /// before compiling, so `--ignore target` matches `$PWD/target`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] if any pattern fails to compile,
    /// or [`WatchError::Io`] if the current directory cannot be resolved.
    pub fn exclude_paths<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<()> {
        let compiled = compile_all(absolutize_patterns(patterns)?)?;
        self.path_excludes.extend(compiled);
        Ok(())
    }

    /// Append path inclusion patterns (made absolute like [`Self::exclude_paths`]).
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] if any pattern fails to compile,
    /// or [`WatchError::Io`] if the current directory cannot be resolved.
    pub fn include_paths<S: AsRef<str>>(&mut self, patterns: &[S]) -> Result<()> {
        let compiled = compile_all(absolutize_patterns(patterns)?)?;
        self.path_includes.extend(compiled);
        Ok(())
    }

    /// Set whether hidden entries are skipped.
    pub fn set_ignore_hidden(&mut self, ignore: bool) {
        self.ignore_hidden = ignore;
    }

    /// Whether hidden entries are skipped.
    #[must_use]
    pub const fn ignore_hidden(&self) -> bool {
        self.ignore_hidden
    }

    /// True if the entry matches any exclusion pattern.
    #[must_use]
    pub fn is_excluded(&self, name: &str, path: &Path) -> bool {
        if self.name_excludes.iter().any(|re| re.is_match(name)) {
            return true;
        }
        let path = path.to_string_lossy();
        self.path_excludes.iter().any(|re| re.is_match(&path))
    }

    /// True if events for the entry should reach the consumer.
    ///
    /// With no include patterns configured every entry is surfaced.
    #[must_use]
    pub fn is_included(&self, name: &str, path: &Path) -> bool {
        if self.name_includes.is_empty() && self.path_includes.is_empty() {
            return true;
        }
        if self.name_includes.iter().any(|re| re.is_match(name)) {
            return true;
        }
        let path = path.to_string_lossy();
        self.path_includes.iter().any(|re| re.is_match(&path))
    }

    /// True if the hidden policy is on and the entry is hidden.
    #[must_use]
    pub fn skips_hidden(&self, path: &Path) -> bool {
        self.ignore_hidden && is_hidden(path)
    }

    /// Copy of the inclusion side only, used by the event forwarder.
    #[must_use]
    pub fn includes_only(&self) -> Self {
        Self {
            name_includes: self.name_includes.clone(),
            path_includes: self.path_includes.clone(),
            ..Self::default()
        }
    }
}

fn compile_all(patterns: impl IntoIterator<Item = String>) -> Result<Vec<Regex>> {
    patterns
        .into_iter()
        .map(|pattern| {
            Regex::new(&pattern).map_err(|source| WatchError::InvalidPattern { pattern, source })
        })
        .collect()
}

fn absolutize_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<String>> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            let path = PathBuf::from(pattern);
            if path.is_absolute() {
                return Ok(pattern.to_string());
            }
            std::path::absolute(&path)
                .map(|abs| abs.to_string_lossy().into_owned())
                .map_err(|source| WatchError::Io { path, source })
        })
        .collect()
}

/// Whether `path` names a hidden entry.
///
/// Dot-prefixed names are hidden everywhere; on Windows the hidden file
/// attribute counts as well.
#[must_use]
pub fn is_hidden(path: &Path) -> bool {
    let dotted = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'));
    dotted || has_hidden_attribute(path)
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    std::fs::symlink_metadata(path)
        .is_ok_and(|meta| meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
}

#[cfg(not(windows))]
const fn has_hidden_attribute(_path: &Path) -> bool {
    false
}
