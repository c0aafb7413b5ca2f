//! Expansion of rule paths that may contain shell wildcards.
use std::io;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use thiserror::Error;

/// Result of resolving a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobMatch {
    /// One or more existing paths matched. The order is whatever the `glob`
    /// crate yields; handlers must not depend on it.
    Found(Vec<PathBuf>),
    /// Nothing matched. Callers treat this as nothing to do.
    NoMatch,
}

impl GlobMatch {
    /// Matched paths, empty for [`GlobMatch::NoMatch`].
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Found(paths) => paths,
            Self::NoMatch => &[],
        }
    }
}

/// Errors from [`resolve`], distinct from an empty match.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The pattern is syntactically invalid.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// Pattern as written.
        pattern: String,
        /// Underlying pattern error.
        source: glob::PatternError,
    },
    /// A directory along the pattern could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Resolve `pattern` to the existing paths it names.
///
/// A pattern without wildcards matches itself when something (including a
/// dangling symlink) exists at that path.
///
/// # Errors
///
/// Returns [`ResolveError`] if the pattern is malformed, or if reading the
/// filesystem failed and produced no matches at all.
pub fn resolve(pattern: &Path) -> Result<GlobMatch, ResolveError> {
    let raw = pattern.to_string_lossy();
    if !has_wildcards(&raw) {
        return match pattern.symlink_metadata() {
            Ok(_) => Ok(GlobMatch::Found(vec![pattern.to_path_buf()])),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(GlobMatch::NoMatch),
            Err(source) => Err(ResolveError::Io {
                path: pattern.to_path_buf(),
                source,
            }),
        };
    }

    let entries = glob::glob_with(&raw, OPTIONS).map_err(|source| ResolveError::Pattern {
        pattern: raw.to_string(),
        source,
    })?;

    let mut found = Vec::new();
    let mut first_error = None;
    for entry in entries {
        match entry {
            Ok(path) => found.push(path),
            Err(e) => {
                tracing::debug!("glob {raw}: {e}");
                if first_error.is_none() {
                    let path = e.path().to_path_buf();
                    first_error = Some(ResolveError::Io {
                        path,
                        source: e.into_error(),
                    });
                }
            }
        }
    }

    if !found.is_empty() {
        return Ok(GlobMatch::Found(found));
    }
    first_error.map_or(Ok(GlobMatch::NoMatch), Err)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn literal_existing_path_matches_itself() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        fs::write(&file, "").unwrap();
        assert_eq!(resolve(&file).unwrap(), GlobMatch::Found(vec![file]));
    }

    #[test]
    fn literal_missing_path_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(&dir.path().join("gone")).unwrap(), GlobMatch::NoMatch);
    }

    #[test]
    fn dangling_symlink_matches() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("l");
        std::os::unix::fs::symlink("/nonexistent-target", &link).unwrap();
        assert_eq!(resolve(&link).unwrap().paths(), &[link]);
    }

    #[test]
    fn wildcard_expands_to_all_matches() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["x1", "x2", "y1"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let mut paths = resolve(&dir.path().join("x*")).unwrap().paths().to_vec();
        paths.sort();
        assert_eq!(paths, vec![dir.path().join("x1"), dir.path().join("x2")]);
    }

    #[test]
    fn wildcard_does_not_match_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();
        assert_eq!(resolve(&dir.path().join("*")).unwrap(), GlobMatch::NoMatch);
    }

    #[test]
    fn wildcard_without_matches_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(&dir.path().join("*.log")).unwrap(), GlobMatch::NoMatch);
    }

    #[test]
    fn malformed_pattern_is_error() {
        let err = resolve(Path::new("/tmp/[")).unwrap_err();
        assert!(matches!(err, ResolveError::Pattern { .. }));
    }
}
