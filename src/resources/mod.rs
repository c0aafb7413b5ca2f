//! Filesystem objects a rule asks for, each checked before it is touched.
//!
//! A handler first asks a [`Resource`] for its [`ResourceState`] and only
//! calls [`Applicable::apply`] when the state calls for it.
pub mod content;
pub mod copy;
pub mod directory;
pub mod error;
pub mod file;
pub mod fs;
pub mod node;
pub mod permissions;
pub mod symlink;

use anyhow::Result;

/// Something that can be described, created and, for nodes, removed again.
pub trait Applicable {
    /// Short description used in log lines and error contexts.
    fn description(&self) -> String;

    /// Create or update the object.
    ///
    /// # Errors
    ///
    /// Returns an error if a filesystem call fails or the requested mode
    /// cannot be applied.
    fn apply(&self) -> Result<ResourceChange>;

    /// Delete the object so it can be recreated.
    ///
    /// Only nodes and symlinks support this; everything else errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be removed or removal is not
    /// supported.
    fn remove(&self) -> Result<ResourceChange> {
        anyhow::bail!("cannot remove {}", self.description())
    }
}

/// State of a filesystem object relative to what a rule asks for.
///
/// # Examples
///
/// ```
/// use tmpfiles::resources::ResourceState;
///
/// let wrong = ResourceState::Incorrect { current: "points to /other".into() };
/// let blocked = ResourceState::Invalid { reason: "exists as directory".into() };
///
/// assert_ne!(wrong, blocked);
/// assert_eq!(ResourceState::Missing, ResourceState::Missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing exists at the path.
    Missing,
    /// An object of the requested type exists and matches.
    Correct,
    /// An object of the requested type exists but differs.
    Incorrect {
        /// What is there now.
        current: String,
    },
    /// An object of a different type occupies the path.
    Invalid {
        /// Why the object cannot be used.
        reason: String,
    },
}

/// What [`Applicable::apply`] or [`Applicable::remove`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// The filesystem was modified.
    Applied,
    /// Nothing needed doing.
    AlreadyCorrect,
}

/// An [`Applicable`] whose current state can be inspected.
pub trait Resource: Applicable {
    /// Inspect the path without modifying it.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be inspected.
    fn current_state(&self) -> Result<ResourceState>;
}
