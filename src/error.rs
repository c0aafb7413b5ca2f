//! Typed failures for configuration, parsing and cleanup.
//!
//! Lower layers return these so callers can match on them; the run loop
//! wraps them in [`anyhow::Error`] with the offending line or path as
//! context. [`is_fatal`] looks through that context for the one failure
//! that stops a run.
//!
//! Per-object filesystem failures are
//! [`ResourceError`](crate::resources::error::ResourceError).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that arise while reading configuration sources.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a config file or directory.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path to the file or directory that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while turning one configuration line into a rule.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The line has fewer than the two mandatory fields.
    #[error("expected at least TYPE and PATH: {0}")]
    TooFewFields(String),

    /// The action letter is not a known rule type.
    #[error("unknown type '{0}'")]
    UnknownType(char),

    /// A character after the action letter is not a known modifier.
    #[error("type modifier '{0}' is unsupported")]
    UnsupportedModifier(char),

    /// The rule path is not absolute.
    #[error("path is not absolute: {0}")]
    RelativePath(String),

    /// A user name could not be resolved.
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    /// A group name could not be resolved.
    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    /// The account database lookup itself failed.
    #[error("account lookup for '{name}' failed: {reason}")]
    AccountLookup {
        /// User or group name that was looked up.
        name: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// The mode field is not an octal number.
    #[error("invalid mode '{0}'")]
    InvalidMode(String),

    /// The age field is not an integer with a known unit suffix.
    #[error("invalid age '{0}'")]
    InvalidAge(String),

    /// A device argument is not `MAJOR:MINOR`.
    #[error("invalid device number '{0}': expected MAJOR:MINOR")]
    InvalidDevice(String),

    /// Specifier expansion failed.
    #[error(transparent)]
    Specifier(#[from] SpecifierError),
}

/// Errors that arise while expanding `%` specifiers.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SpecifierError {
    /// The expanded path would exceed the maximum path length.
    #[error("expanded path exceeds {limit} bytes")]
    TooLong {
        /// Maximum allowed length in bytes.
        limit: usize,
    },
}

/// Errors that arise from cleaning and removal.
#[derive(Error, Debug)]
pub enum CleanupError {
    /// Deletion of `/`, `.` or `..` was attempted. Always fatal for the run.
    #[error("refusing to remove protected path '{}'", .0.display())]
    ProtectedPath(PathBuf),

    /// A single entry could not be inspected or deleted.
    #[error("cannot remove {}: {source}", .path.display())]
    Io {
        /// Entry that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// One or more entries below a directory could not be cleaned.
    #[error("{failures} entries under {} could not be cleaned; first: {first}", .path.display())]
    Subtree {
        /// Directory whose walk reported failures.
        path: PathBuf,
        /// Number of failed entries.
        failures: usize,
        /// Description of the first failure.
        first: String,
    },
}

impl CleanupError {
    /// Whether this error must abort the whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtectedPath(_))
    }
}

/// Return `true` when `err` carries a fatal [`CleanupError`] anywhere in its chain.
#[must_use]
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<CleanupError>()
            .is_some_and(CleanupError::is_fatal)
    })
}
