//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Why a command or a constructor refused to proceed.
///
/// Command `decide` closures return these to reject a command before any event
/// is produced. Folding events never yields one: a recorded event is a fact.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The command's input is unacceptable (e.g. a negative amount); no events were decided.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Accepting the command would break a rule of the aggregate's current state,
    /// such as opening an account that already exists.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Raised by `AggregateId::new` and `FromStr` for an empty aggregate id.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Raised by `ExpectedVersion::check` when a stream is not at the expected version.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
