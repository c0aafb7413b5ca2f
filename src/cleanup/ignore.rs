//! Paths exempted from cleaning by `x` and `X` rules.
use std::os::unix::ffi::OsStrExt as _;
use std::path::{Path, PathBuf};

/// One registered exemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreEntry {
    /// Path as registered (root-prefixed).
    pub path: PathBuf,
    /// Match every path that starts with `path`, not just `path` itself.
    pub is_prefix: bool,
}

impl IgnoreEntry {
    fn matches(&self, candidate: &Path) -> bool {
        if self.is_prefix {
            candidate
                .as_os_str()
                .as_bytes()
                .starts_with(self.path.as_os_str().as_bytes())
        } else {
            candidate.as_os_str() == self.path.as_os_str()
        }
    }
}

/// Exemptions collected from the configuration file being processed.
///
/// Reset at the start of every source file.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRegistry {
    entries: Vec<IgnoreEntry>,
}

impl IgnoreRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exemption.
    pub fn register(&mut self, path: PathBuf, is_prefix: bool) {
        self.entries.push(IgnoreEntry { path, is_prefix });
    }

    /// Whether deleting `path` is forbidden.
    ///
    /// Prefix entries compare raw bytes, so `/data` also covers
    /// `/database`.
    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.matches(path))
    }

    /// Whether every path below `path` is covered by a prefix entry, so a
    /// walk need not descend.
    #[must_use]
    pub fn covers_subtree(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.is_prefix && e.matches(path))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
