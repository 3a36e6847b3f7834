//! In-memory store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use competence_core::error::StoreError;
use competence_core::model::{StudentCompetenceRecord, TopicCompetence, VersionedRecord};
use competence_core::traits::CompetenceStore;

/// Keeps every record in a map guarded by an async read-write lock.
///
/// Nothing survives the process; intended for tests and short-lived runs.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, VersionedRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of learners with a stored record.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CompetenceStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, learner_id: &str) -> Result<Option<VersionedRecord>, StoreError> {
        Ok(self.records.read().await.get(learner_id).cloned())
    }

    async fn save_entry(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
        competence: &TopicCompetence,
        expected_responses: usize,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let mut stored = records
            .get(learner_id)
            .cloned()
            .unwrap_or_else(|| VersionedRecord {
                record: StudentCompetenceRecord::new(learner_id),
                version: 0,
            });
        stored
            .record
            .merge_entry(topic, subtopic, competence, expected_responses)?;
        stored.version += 1;

        let version = stored.version;
        records.insert(learner_id.to_string(), stored);
        Ok(version)
    }
}
