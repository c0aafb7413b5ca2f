//! Configuration sources: the standard search directories plus any files
//! named on the command line.
//!
//! Files inside a search directory are returned in directory-listing
//! order. The order is not sorted and not guaranteed to be stable across
//! filesystems.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::paths::with_root;

/// Search directories, in the order they are applied.
pub const SEARCH_DIRS: [&str; 3] = ["/etc/tmpfiles.d", "/run/tmpfiles.d", "/usr/lib/tmpfiles.d"];

/// Extension a file needs to be picked up from a search directory.
const CONF_SUFFIX: &str = ".conf";

/// One line of a configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Line text without the trailing newline.
    pub text: String,
}

fn is_conf_name(name: &str) -> bool {
    name.strip_suffix(CONF_SUFFIX)
        .is_some_and(|stem| !stem.is_empty())
}

/// List the `*.conf` files in `dir`.
///
/// A directory that does not exist yields no files.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the directory exists but cannot be read.
pub fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let io_err = |source: io::Error| ConfigError::Io {
        path: dir.display().to_string(),
        source,
    };
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name();
        if name.to_str().is_some_and(is_conf_name) && !entry.path().is_dir() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Where an explicitly named file lives: absolute names are placed under
/// `root`, relative names are taken as given.
#[must_use]
pub fn explicit_path(root: Option<&Path>, file: &Path) -> PathBuf {
    match file.to_str() {
        Some(name) if file.is_absolute() => with_root(root, name),
        _ => file.to_path_buf(),
    }
}

/// Every configuration source of a run: the search directories under
/// `root`, then the explicit files.
///
/// Each entry is reported separately so one unreadable directory does not
/// hide the others.
#[must_use]
pub fn discover(root: Option<&Path>, explicit: &[PathBuf]) -> Vec<Result<PathBuf, ConfigError>> {
    let mut sources = Vec::new();
    for dir in SEARCH_DIRS {
        match list_dir(&with_root(root, dir)) {
            Ok(files) => sources.extend(files.into_iter().map(Ok)),
            Err(e) => sources.push(Err(e)),
        }
    }
    sources.extend(explicit.iter().map(|file| Ok(explicit_path(root, file))));
    sources
}

/// Read `path` as numbered lines. Invalid UTF-8 is replaced, not rejected.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read.
pub fn read_lines(path: &Path) -> Result<Vec<Line>, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .enumerate()
        .map(|(i, text)| Line {
            number: i + 1,
            text: text.to_string(),
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn conf_names() {
        assert!(is_conf_name("a.conf"));
        assert!(is_conf_name("00-base.conf"));
        assert!(!is_conf_name(".conf"));
        assert!(!is_conf_name("a.conf.bak"));
        assert!(!is_conf_name("README"));
    }

    #[test]
    fn list_dir_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.conf"), "").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::create_dir(dir.path().join("c.conf")).unwrap();

        let files = list_dir(dir.path()).unwrap();

        assert_eq!(files, vec![dir.path().join("a.conf")]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_dir(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn unreadable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "").unwrap();
        let err = list_dir(&file).unwrap_err();
        assert!(err.to_string().contains("not-a-dir"));
    }

    #[test]
    fn discover_orders_search_dirs_then_explicit() {
        let root = tempfile::tempdir().unwrap();
        for dir in SEARCH_DIRS {
            let dir = with_root(Some(root.path()), dir);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("x.conf"), "").unwrap();
        }

        let sources: Vec<PathBuf> = discover(Some(root.path()), &[PathBuf::from("/extra.conf")])
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(
            sources,
            vec![
                root.path().join("etc/tmpfiles.d/x.conf"),
                root.path().join("run/tmpfiles.d/x.conf"),
                root.path().join("usr/lib/tmpfiles.d/x.conf"),
                root.path().join("extra.conf"),
            ]
        );
    }

    #[test]
    fn explicit_relative_path_is_not_rooted() {
        assert_eq!(
            explicit_path(Some(Path::new("/mnt")), Path::new("local.conf")),
            PathBuf::from("local.conf")
        );
        assert_eq!(
            explicit_path(Some(Path::new("/mnt")), Path::new("/etc/a.conf")),
            PathBuf::from("/mnt/etc/a.conf")
        );
    }

    #[test]
    fn read_lines_numbers_from_one() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.conf");
        fs::write(&file, "# comment\nd /tmp/x\n").unwrap();

        let lines = read_lines(&file).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].text, "d /tmp/x");
    }

    #[test]
    fn read_lines_missing_file_is_config_error() {
        let err = read_lines(Path::new("/nonexistent/tmpfiles/a.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
