//! Fault-injecting store for testing.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use competence_core::error::StoreError;
use competence_core::model::{TopicCompetence, VersionedRecord};
use competence_core::traits::CompetenceStore;

/// One successful save, as seen by [`FaultyStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveLogEntry {
    pub learner_id: String,
    pub topic: String,
    pub subtopic: String,
    /// Record version returned by the inner store.
    pub version: u64,
    /// Response count of the saved entry.
    pub responses: usize,
}

/// Wraps another store and injects failures, conflicts, and latency.
///
/// Every call is counted and every successful save is logged, so tests can
/// check exactly which states reached the backing store.
pub struct FaultyStore {
    inner: Arc<dyn CompetenceStore>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    forced_conflicts: AtomicU32,
    save_delay: Option<Duration>,
    load_count: AtomicU32,
    save_count: AtomicU32,
    save_log: Mutex<Vec<SaveLogEntry>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn CompetenceStore>) -> Self {
        Self {
            inner,
            fail_loads: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
            forced_conflicts: AtomicU32::new(0),
            save_delay: None,
            load_count: AtomicU32::new(0),
            save_count: AtomicU32::new(0),
            save_log: Mutex::new(Vec::new()),
        }
    }

    /// Make every subsequent load fail with [`StoreError::Unavailable`].
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent save fail with [`StoreError::Io`].
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Reject the next `n` saves with a conflict, whatever their version.
    pub fn force_conflicts(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Sleep this long before forwarding each save.
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// Number of load calls received, including failed ones.
    pub fn load_count(&self) -> u32 {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Number of save calls received, including failed ones.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Successful saves, in the order they completed.
    pub fn save_log(&self) -> Vec<SaveLogEntry> {
        self.save_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CompetenceStore for FaultyStore {
    fn name(&self) -> &str {
        "faulty"
    }

    async fn load(&self, learner_id: &str) -> Result<Option<VersionedRecord>, StoreError> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected load failure".into()));
        }
        self.inner.load(learner_id).await
    }

    async fn save_entry(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
        competence: &TopicCompetence,
        expected_responses: usize,
    ) -> Result<u64, StoreError> {
        self.save_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io("injected save failure".into()));
        }
        if self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Conflict {
                learner_id: learner_id.to_string(),
                topic: topic.to_string(),
                subtopic: subtopic.to_string(),
                expected: expected_responses,
                found: expected_responses + 1,
            });
        }

        let version = self
            .inner
            .save_entry(learner_id, topic, subtopic, competence, expected_responses)
            .await?;
        self.save_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SaveLogEntry {
                learner_id: learner_id.to_string(),
                topic: topic.to_string(),
                subtopic: subtopic.to_string(),
                version,
                responses: competence.total_questions(),
            });
        Ok(version)
    }
}
