//! Store trait for durable competence records.
//!
//! Implemented by the backends in `competence-store`. A store persists
//! learner records one (topic, subtopic) entry at a time; it never computes
//! scores.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{TopicCompetence, VersionedRecord};

/// Durable storage with one record per learner.
///
/// `save_entry` is a compare-and-swap on a single entry. Response history is
/// append-only, so its length identifies how far an entry has progressed: the
/// save succeeds only when the stored entry still holds `expected_responses`
/// responses (0 when the entry does not exist yet), and otherwise fails with
/// [`StoreError::Conflict`] without writing anything. On success the entry
/// replaces the stored one inside the latest stored record, leaving every
/// other entry as it currently is, and the record's version is bumped by one
/// (the first save of a learner yields version 1). Saves to different entries
/// of one learner therefore never conflict with each other.
#[async_trait]
pub trait CompetenceStore: Send + Sync {
    /// Human-readable backend name (e.g. "memory").
    fn name(&self) -> &str;

    /// Load a learner's record, or `None` if nothing was ever saved for them.
    async fn load(&self, learner_id: &str) -> Result<Option<VersionedRecord>, StoreError>;

    /// Persist one entry if its stored history length is still `expected_responses`.
    async fn save_entry(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
        competence: &TopicCompetence,
        expected_responses: usize,
    ) -> Result<u64, StoreError>;
}
