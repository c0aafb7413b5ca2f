//! Path utilities: alternate-root prefixing, specifier expansion, globbing.

pub mod glob;
pub mod specifier;

use std::path::{Path, PathBuf};

/// Prefix an absolute configuration path with the alternate root.
///
/// Plain string concatenation: the root's trailing `/` is dropped and the
/// path is appended as written, so `with_root(Some("/mnt/"), "/tmp")` is
/// `/mnt/tmp`. Without a root the path is returned unchanged.
#[must_use]
pub fn with_root(root: Option<&Path>, path: &str) -> PathBuf {
    match root {
        None => PathBuf::from(path),
        Some(root) => {
            let root = root.to_string_lossy();
            let trimmed = root.trim_end_matches('/');
            PathBuf::from(format!("{trimmed}{path}"))
        }
    }
}

/// Return `true` for `/`, `.` and `..`, which must never be deleted.
///
/// Paths are compared after stripping redundant trailing separators, so
/// `//` and `./` are protected too.
#[must_use]
pub fn is_protected(path: &Path) -> bool {
    let raw = path.to_string_lossy();
    if !raw.is_empty() && raw.chars().all(|c| c == '/') {
        return true;
    }
    let trimmed = raw.trim_end_matches('/');
    trimmed == "." || trimmed == ".."
}
