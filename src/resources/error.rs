//! Failures of individual filesystem objects.
//!
//! Resource code returns [`ResourceError`] where a caller may want to tell
//! the cases apart (tests downcast on them); everything else is plain
//! [`anyhow::Error`] with context.

use thiserror::Error;

/// Why a filesystem object could not be brought into the requested state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Something the rule depends on does not exist: a copy source or a
    /// credential.
    #[error("{resource} does not exist")]
    NotFound {
        /// What was looked for.
        resource: String,
    },

    /// The path is occupied by an object of the wrong type.
    #[error("{resource}: {reason}")]
    InvalidState {
        /// Description of the object the rule asked for.
        resource: String,
        /// What is in the way.
        reason: String,
    },

    /// The rule asks for something this implementation does not do.
    #[error("{operation} is not supported ({resource})")]
    UnsupportedOperation {
        /// The unsupported request, e.g. `mode mask ~0644`.
        operation: String,
        /// Path the request was made for.
        resource: String,
    },
}
