//! The recursive age-cleaner and guarded deletion.
//!
//! Every deletion goes through [`Cleaner::remove_entry`], which enforces the
//! protected-path rail before anything else. The walk in [`Cleaner::visit`]
//! only ever deletes non-directories; emptied directories are removed
//! separately by [`Cleaner::remove_empty_dirs`].
use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::ops::AddAssign;
use std::path::Path;
use std::time::{Duration, SystemTime};

use super::IgnoreRegistry;
use crate::error::CleanupError;
use crate::logging::Log;
use crate::paths::is_protected;

/// Counters from a cleaning pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    /// Entries deleted (or that would be deleted in a dry run).
    pub removed: usize,
    /// Entries kept because they are not old enough.
    pub kept: usize,
    /// Entries spared by the ignore registry.
    pub ignored: usize,
}

impl AddAssign for CleanStats {
    fn add_assign(&mut self, rhs: Self) {
        self.removed += rhs.removed;
        self.kept += rhs.kept;
        self.ignored += rhs.ignored;
    }
}

/// What happened to a single entry passed to [`Cleaner::remove_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The entry was deleted.
    Removed,
    /// The entry is exempt and was left in place.
    Ignored,
    /// Nothing existed at the path.
    Absent,
}

/// `true` when `mtime` lies strictly more than `age` before `now`.
///
/// An mtime in the future is never old.
#[must_use]
pub fn is_older_than(mtime: SystemTime, now: SystemTime, age: Duration) -> bool {
    now.duration_since(mtime).is_ok_and(|elapsed| elapsed > age)
}

/// Collects child failures while a directory is walked.
#[derive(Default)]
struct Failures {
    count: usize,
    first: Option<String>,
}

impl Failures {
    fn record(&mut self, err: CleanupError) -> Result<(), CleanupError> {
        match err {
            e if e.is_fatal() => return Err(e),
            CleanupError::Subtree { failures, first, .. } => {
                self.count += failures;
                self.first.get_or_insert(first);
            }
            other => {
                self.count += 1;
                self.first.get_or_insert_with(|| other.to_string());
            }
        }
        Ok(())
    }

    fn finish<T>(self, path: &Path, value: T) -> Result<T, CleanupError> {
        match self.first {
            None => Ok(value),
            Some(first) => Err(CleanupError::Subtree {
                path: path.to_path_buf(),
                failures: self.count,
                first,
            }),
        }
    }
}

/// Walks a tree deleting entries that are old enough and not ignored.
pub struct Cleaner<'a> {
    age: Option<Duration>,
    ignores: Option<&'a IgnoreRegistry>,
    now: SystemTime,
    dry_run: bool,
    log: &'a dyn Log,
}

impl fmt::Debug for Cleaner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleaner")
            .field("age", &self.age)
            .field("ignores", &self.ignores)
            .field("now", &self.now)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl<'a> Cleaner<'a> {
    /// A cleaner with no age bound and no ignore registry: it deletes
    /// every non-directory it visits.
    #[must_use]
    pub fn new(log: &'a dyn Log) -> Self {
        Self {
            age: None,
            ignores: None,
            now: SystemTime::now(),
            dry_run: false,
            log,
        }
    }

    /// Only delete entries older than `age`.
    #[must_use]
    pub const fn with_age(mut self, age: Option<Duration>) -> Self {
        self.age = age;
        self
    }

    /// Consult `ignores` before every deletion.
    #[must_use]
    pub const fn with_ignores(mut self, ignores: &'a IgnoreRegistry) -> Self {
        self.ignores = Some(ignores);
        self
    }

    /// Log deletions instead of performing them.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reference time for the age test.
    #[must_use]
    pub const fn with_now(mut self, now: SystemTime) -> Self {
        self.now = now;
        self
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignores.is_some_and(|reg| reg.is_ignored(path))
    }

    fn is_old(&self, meta: &Metadata) -> bool {
        let Some(age) = self.age else {
            return true;
        };
        meta.modified()
            .is_ok_and(|mtime| is_older_than(mtime, self.now, age))
    }

    /// Delete one entry: a non-directory, or a directory that must be empty.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError::ProtectedPath`] for `/`, `.` and `..` before
    /// anything else is checked, and [`CleanupError::Io`] if deletion fails.
    pub fn remove_entry(&self, path: &Path) -> Result<Outcome, CleanupError> {
        if is_protected(path) {
            return Err(CleanupError::ProtectedPath(path.to_path_buf()));
        }
        if self.is_ignored(path) {
            self.log.debug(&format!("ignored: {}", path.display()));
            return Ok(Outcome::Ignored);
        }
        let meta = match path.symlink_metadata() {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Outcome::Absent),
            Err(source) => {
                return Err(CleanupError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if self.dry_run {
            self.log.dry_run(&format!("would remove {}", path.display()));
            return Ok(Outcome::Removed);
        }

        let result = if meta.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => {
                self.log.debug(&format!("removed {}", path.display()));
                Ok(Outcome::Removed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Outcome::Absent),
            Err(source) => Err(CleanupError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn remove_leaf(&self, path: &Path, meta: &Metadata) -> Result<CleanStats, CleanupError> {
        let mut stats = CleanStats::default();
        if !self.is_old(meta) {
            stats.kept += 1;
            return Ok(stats);
        }
        match self.remove_entry(path)? {
            Outcome::Removed => stats.removed += 1,
            Outcome::Ignored => stats.ignored += 1,
            Outcome::Absent => {}
        }
        Ok(stats)
    }

    /// Visit `path`: age-test a non-directory, or walk a directory's
    /// contents recursively. Directories themselves are never deleted.
    ///
    /// Child failures do not stop the walk; they are reported together
    /// once the whole subtree has been visited.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError::ProtectedPath`] immediately, or
    /// [`CleanupError::Subtree`] summarising failed children.
    pub fn visit(&self, path: &Path) -> Result<CleanStats, CleanupError> {
        if is_protected(path) {
            return Err(CleanupError::ProtectedPath(path.to_path_buf()));
        }
        let meta = match path.symlink_metadata() {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CleanStats::default()),
            Err(source) => {
                return Err(CleanupError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if !meta.is_dir() {
            return self.remove_leaf(path, &meta);
        }
        if self.ignores.is_some_and(|reg| reg.covers_subtree(path)) {
            self.log.debug(&format!("ignored tree: {}", path.display()));
            return Ok(CleanStats {
                ignored: 1,
                ..CleanStats::default()
            });
        }
        self.walk_children(path, true)
    }

    /// Clean only the entries directly inside `dir`; subdirectories are
    /// neither descended into nor deleted.
    ///
    /// # Errors
    ///
    /// As for [`visit`](Self::visit).
    pub fn clean_children(&self, dir: &Path) -> Result<CleanStats, CleanupError> {
        if is_protected(dir) {
            return Err(CleanupError::ProtectedPath(dir.to_path_buf()));
        }
        match dir.symlink_metadata() {
            Ok(meta) if meta.is_dir() => self.walk_children(dir, false),
            Ok(_) => Ok(CleanStats::default()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CleanStats::default()),
            Err(source) => Err(CleanupError::Io {
                path: dir.to_path_buf(),
                source,
            }),
        }
    }

    fn walk_children(&self, dir: &Path, recursive: bool) -> Result<CleanStats, CleanupError> {
        let entries = fs::read_dir(dir).map_err(|source| CleanupError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut stats = CleanStats::default();
        let mut failures = Failures::default();
        for entry in entries {
            let child = match entry {
                Ok(entry) => entry.path(),
                Err(source) => {
                    failures.record(CleanupError::Io {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                    continue;
                }
            };
            let result = if recursive {
                self.visit(&child)
            } else {
                match child.symlink_metadata() {
                    Ok(meta) if meta.is_dir() => Ok(CleanStats::default()),
                    Ok(meta) => self.remove_leaf(&child, &meta),
                    Err(source) => Err(CleanupError::Io {
                        path: child.clone(),
                        source,
                    }),
                }
            };
            match result {
                Ok(child_stats) => stats += child_stats,
                Err(e) => failures.record(e)?,
            }
        }
        failures.finish(dir, stats)
    }

    /// Remove `path` and every directory below it, deepest first.
    ///
    /// Meant to follow an unbounded [`visit`](Self::visit); directories
    /// that are still not empty are reported as failures. Symlinks to
    /// directories are not followed.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError::ProtectedPath`] immediately, or
    /// [`CleanupError::Subtree`] summarising directories that could not be
    /// removed.
    pub fn remove_empty_dirs(&self, path: &Path) -> Result<usize, CleanupError> {
        if is_protected(path) {
            return Err(CleanupError::ProtectedPath(path.to_path_buf()));
        }
        match path.symlink_metadata() {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(CleanupError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        let mut removed = 0;
        let mut failures = Failures::default();
        if let Ok(entries) = fs::read_dir(path) {
            for entry in entries.flatten() {
                match self.remove_empty_dirs(&entry.path()) {
                    Ok(n) => removed += n,
                    Err(e) => failures.record(e)?,
                }
            }
        }
        match self.remove_entry(path) {
            Ok(Outcome::Removed) => removed += 1,
            Ok(_) => {}
            Err(e) => failures.record(e)?,
        }
        failures.finish(path, removed)
    }

    /// Delete `path` and everything below it.
    ///
    /// # Errors
    ///
    /// As for [`visit`](Self::visit) and
    /// [`remove_empty_dirs`](Self::remove_empty_dirs).
    pub fn remove_tree(&self, path: &Path) -> Result<CleanStats, CleanupError> {
        let mut stats = self.visit(path)?;
        stats.removed += self.remove_empty_dirs(path)?;
        Ok(stats)
    }

    /// Delete every entry inside `dir` but keep `dir` itself.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError::ProtectedPath`] immediately, or
    /// [`CleanupError::Subtree`] summarising entries that survived.
    pub fn clear_dir(&self, dir: &Path) -> Result<CleanStats, CleanupError> {
        if is_protected(dir) {
            return Err(CleanupError::ProtectedPath(dir.to_path_buf()));
        }
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CleanStats::default()),
            Err(source) => {
                return Err(CleanupError::Io {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        let mut stats = CleanStats::default();
        let mut failures = Failures::default();
        for entry in entries.flatten() {
            match self.remove_tree(&entry.path()) {
                Ok(child_stats) => stats += child_stats,
                Err(e) => failures.record(e)?,
            }
        }
        failures.finish(dir, stats)
    }
}
