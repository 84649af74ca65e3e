//! Error taxonomy for timetable operations.

use thiserror::Error;

use crate::types::ValidationError;

/// Errors surfaced by the timetable service and mutation planner.
///
/// Every variant except [`TimetableError::Store`] is detected before any write
/// is attempted.
#[derive(Debug, Error)]
pub enum TimetableError {
    /// The record does not exist or is not visible to the requesting user.
    ///
    /// The two cases are deliberately indistinguishable.
    #[error("not found")]
    NotFound,

    /// A request field is structurally invalid.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// A request contradicts the current state of the entry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A value failed type-level validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The persistence layer failed.
    #[error("storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TimetableError {
    /// Wraps a persistence error.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TimetableError>;
