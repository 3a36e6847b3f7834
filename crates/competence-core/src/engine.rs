//! Competence update service.
//!
//! Folds graded responses into stored learner records. Each update runs one
//! load → append → recompute → save cycle. Updates to the same
//! (learner, topic, subtopic) key are serialized by a per-key lock. The store
//! saves one entry at a time and merges it into the latest record, so updates
//! to different keys never invalidate each other. A conflict on the same
//! entry, possible when several services share one store, is resolved by
//! re-running the cycle on fresh state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{CompetenceError, InvalidEvent, StoreError};
use crate::locks::KeyedLocks;
use crate::model::{ResponseEvent, StudentCompetenceRecord, TopicCompetence};
use crate::traits::CompetenceStore;

/// Configuration for the update service.
#[derive(Debug, Clone)]
pub struct CompetenceServiceConfig {
    /// Re-apply attempts after a same-entry conflict before giving up.
    pub max_conflict_retries: u32,
    /// Delay before the first re-apply; doubles on each further attempt.
    pub retry_delay: Duration,
}

impl Default for CompetenceServiceConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 5,
            retry_delay: Duration::from_millis(10),
        }
    }
}

const MAX_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Identifies one competence entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    learner_id: String,
    topic: String,
    subtopic: String,
}

/// Reads and updates learner competence through a [`CompetenceStore`].
pub struct CompetenceService {
    store: Arc<dyn CompetenceStore>,
    locks: KeyedLocks<EntryKey>,
    config: CompetenceServiceConfig,
}

impl CompetenceService {
    pub fn new(store: Arc<dyn CompetenceStore>, config: CompetenceServiceConfig) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn CompetenceStore> {
        &self.store
    }

    /// Append `event` to the learner's (topic, subtopic) history and return
    /// the recomputed competence.
    ///
    /// Either the event is appended and persisted together with the
    /// recomputed score, or nothing is written.
    pub async fn update(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
        event: ResponseEvent,
    ) -> Result<TopicCompetence, CompetenceError> {
        validate_key(learner_id, topic, subtopic)?;
        event.validate()?;

        let _guard = self
            .locks
            .lock(EntryKey {
                learner_id: learner_id.to_string(),
                topic: topic.to_string(),
                subtopic: subtopic.to_string(),
            })
            .await;

        let mut retry_delay = self.config.retry_delay;
        let mut attempt = 0u32;
        loop {
            match self.apply_once(learner_id, topic, subtopic, &event).await {
                Ok(competence) => return Ok(competence),
                Err(e) if e.is_conflict() && attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    tracing::warn!(
                        learner_id,
                        topic,
                        subtopic,
                        attempt,
                        "save conflict, re-applying update: {e}"
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                }
                Err(e) => {
                    tracing::error!(learner_id, topic, subtopic, "competence update failed: {e}");
                    return Err(CompetenceError::StoreUnavailable(e));
                }
            }
        }
    }

    async fn apply_once(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
        event: &ResponseEvent,
    ) -> Result<TopicCompetence, StoreError> {
        let mut record = match self.store.load(learner_id).await? {
            Some(stored) => stored.record,
            None => StudentCompetenceRecord::new(learner_id),
        };
        let expected = record
            .competence(topic, subtopic)
            .map_or(0, TopicCompetence::total_questions);

        let competence = record
            .apply_response(topic, subtopic, event.clone(), Utc::now())
            .clone();

        let new_version = self
            .store
            .save_entry(learner_id, topic, subtopic, &competence, expected)
            .await?;
        tracing::debug!(
            learner_id,
            topic,
            subtopic,
            version = new_version,
            responses = competence.total_questions(),
            score = competence.score(),
            "competence updated"
        );
        Ok(competence)
    }

    /// Current competence for one entry, or `None` if the learner, topic, or
    /// subtopic has no history yet.
    pub async fn get(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
    ) -> Result<Option<TopicCompetence>, CompetenceError> {
        let stored = self.store.load(learner_id).await?;
        Ok(stored.and_then(|s| s.record.competence(topic, subtopic).cloned()))
    }

    /// The learner's full record, or `None` if nothing was recorded yet.
    pub async fn record(
        &self,
        learner_id: &str,
    ) -> Result<Option<StudentCompetenceRecord>, CompetenceError> {
        Ok(self.store.load(learner_id).await?.map(|s| s.record))
    }

    /// Apply a sequence of events in order and return the final competence.
    ///
    /// Every event is validated before the first one is applied. An empty
    /// sequence returns the current state without writing.
    pub async fn replay(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
        events: Vec<ResponseEvent>,
    ) -> Result<Option<TopicCompetence>, CompetenceError> {
        validate_key(learner_id, topic, subtopic)?;
        for event in &events {
            event.validate()?;
        }

        let mut latest = None;
        for event in events {
            latest = Some(self.update(learner_id, topic, subtopic, event).await?);
        }
        match latest {
            Some(competence) => Ok(Some(competence)),
            None => self.get(learner_id, topic, subtopic).await,
        }
    }
}

fn validate_key(learner_id: &str, topic: &str, subtopic: &str) -> Result<(), InvalidEvent> {
    if learner_id.is_empty() {
        return Err(InvalidEvent::EmptyLearnerId);
    }
    if topic.is_empty() {
        return Err(InvalidEvent::EmptyTopic);
    }
    if subtopic.is_empty() {
        return Err(InvalidEvent::EmptySubtopic);
    }
    Ok(())
}
