//! Shared primitives for all Rust crates in TrackStar.

#![forbid(unsafe_code)]

/// Identity primitives shared across services.
pub mod identity;

use thiserror::Error;

pub use identity::{ProjectId, UserId};

/// Result type used across TrackStar crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// Role registry and assignment failures carry their own variants so callers
/// can tell programmer or data errors apart from storage failures.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced role does not exist.
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// A parent role named while creating or linking a role does not exist.
    #[error("unknown parent role '{0}'")]
    UnknownParent(String),

    /// Adding an inheritance edge would make the role graph cyclic.
    #[error("role hierarchy cycle: {0}")]
    Cycle(String),

    /// A role with the same name already exists.
    #[error("role '{0}' already exists")]
    DuplicateRole(String),

    /// The user already holds the role.
    #[error("duplicate assignment: {0}")]
    DuplicateAssignment(String),

    /// A condition predicate could not be decoded or evaluated.
    #[error("malformed predicate: {0}")]
    MalformedPredicate(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// User is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
