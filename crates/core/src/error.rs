//! Domain error model.

use thiserror::Error;

/// Failure of a command against an aggregate.
///
/// Only deterministic business outcomes live here: replaying the same command
/// against the same stream always yields the same error. Storage and counter
/// failures are reported by `invtrack-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected before any state was consulted (blank title, bad field data,
    /// malformed id format).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The command contradicts state the aggregate guarantees (e.g. ordinal 0).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The aggregate was never created, or has been deleted. Carries the kind of
    /// aggregate ("inventory", "item").
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The aggregate already exists.
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

    pub fn not_found(kind: &'static str) -> Self {
        Self::NotFound(kind)
    }
}
