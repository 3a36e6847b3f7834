//! Error types for the competence engine and its stores.
//!
//! Store errors are defined here rather than in `competence-store` so the
//! update service can classify conflicts for its retry loop without string
//! matching.

use thiserror::Error;

/// A response event or its addressing was rejected before any store access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidEvent {
    #[error("learner id must not be empty")]
    EmptyLearnerId,

    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("subtopic must not be empty")]
    EmptySubtopic,

    /// Difficulty outside the 1..=5 scale.
    #[error("difficulty must be between 1 and 5, got {0}")]
    DifficultyOutOfRange(u8),

    /// Quality score outside `[0, 1]`, including NaN.
    #[error("quality score must be within [0, 1], got {0}")]
    QualityOutOfRange(f64),
}

/// Errors reported by a [`CompetenceStore`](crate::traits::CompetenceStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The stored entry no longer has the history the caller built on.
    #[error(
        "history conflict for learner '{learner_id}' at {topic}/{subtopic}: \
         expected {expected} responses, found {found}"
    )]
    Conflict {
        learner_id: String,
        topic: String,
        subtopic: String,
        expected: usize,
        found: usize,
    },

    /// An I/O operation against the backing medium failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The store cannot serve requests at the moment.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("corrupt record for learner '{learner_id}': {message}")]
    Corrupt { learner_id: String, message: String },
}

impl StoreError {
    /// Returns `true` if another writer appended to the same entry first and
    /// the cycle can be re-applied on fresh state.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Errors surfaced to callers of the
/// [`CompetenceService`](crate::engine::CompetenceService).
#[derive(Debug, Error)]
pub enum CompetenceError {
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] InvalidEvent),

    /// Load or save failed, or conflict retries were exhausted.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl CompetenceError {
    /// Returns `true` if retrying the same call can never succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, CompetenceError::InvalidEvent(_))
    }
}
