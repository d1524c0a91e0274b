//! Failure taxonomy for store-backed operations.

use thiserror::Error;

/// Result type used by the database layer and the engines on top of it.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Failures a single store-backed operation can surface.
///
/// Advisories (low stock after a successful write) are not errors; they ride
/// along on successful results and never abort or roll back a write.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced log, recipe, or stock row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Input failed validation; in batch loops the offending row is skipped.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backing store failed; the message is surfaced verbatim.
    #[error(transparent)]
    Remote(#[from] rusqlite::Error),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True when the failure is a missing row rather than a store fault.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
