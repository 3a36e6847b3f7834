//! JSON file store.
//!
//! One pretty-printed JSON document per learner under a root directory. The
//! file name is the hex encoding of the learner id, so arbitrary ids map to
//! safe, case-preserving names; ids too long for a file name are shortened to
//! a hex prefix plus a SHA-256 digest. Writes go to a unique temp file that is
//! then renamed over the old document, so readers never observe a partial
//! record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use competence_core::error::StoreError;
use competence_core::locks::KeyedLocks;
use competence_core::model::{StudentCompetenceRecord, TopicCompetence, VersionedRecord};
use competence_core::traits::CompetenceStore;

/// Borrowed form of [`VersionedRecord`] for writing without a clone.
#[derive(Serialize)]
struct Document<'a> {
    record: &'a StudentCompetenceRecord,
    version: u64,
}

/// Stores each learner's record as `<root>/<hex(learner_id)>.json`, with long
/// ids shortened (see [`JsonFileStore::record_path`]).
pub struct JsonFileStore {
    root: PathBuf,
    writers: KeyedLocks<String>,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writers: KeyedLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document holding `learner_id`'s record.
    pub fn record_path(&self, learner_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(learner_id)))
    }

    async fn read(&self, learner_id: &str) -> Result<Option<VersionedRecord>, StoreError> {
        let path = self.record_path(learner_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let stored: VersionedRecord =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                learner_id: learner_id.to_string(),
                message: e.to_string(),
            })?;
        if stored.record.learner_id() != learner_id {
            return Err(StoreError::Corrupt {
                learner_id: learner_id.to_string(),
                message: format!(
                    "document at {} belongs to learner '{}'",
                    path.display(),
                    stored.record.learner_id()
                ),
            });
        }
        Ok(Some(stored))
    }
}

#[async_trait]
impl CompetenceStore for JsonFileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, learner_id: &str) -> Result<Option<VersionedRecord>, StoreError> {
        self.read(learner_id).await
    }

    async fn save_entry(
        &self,
        learner_id: &str,
        topic: &str,
        subtopic: &str,
        competence: &TopicCompetence,
        expected_responses: usize,
    ) -> Result<u64, StoreError> {
        let _writer = self.writers.lock(learner_id.to_string()).await;

        let (mut record, version) = match self.read(learner_id).await? {
            Some(stored) => (stored.record, stored.version + 1),
            None => (StudentCompetenceRecord::new(learner_id), 1),
        };
        record.merge_entry(topic, subtopic, competence, expected_responses)?;

        let json = serde_json::to_string_pretty(&Document {
            record: &record,
            version,
        })
        .map_err(|e| StoreError::Io(format!("failed to serialize record: {e}")))?;

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            StoreError::Io(format!("failed to create {}: {e}", self.root.display()))
        })?;

        let path = self.record_path(learner_id);
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&tmp, json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Io(format!(
                "failed to write {}: {e}",
                tmp.display()
            )));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Io(format!(
                "failed to replace {}: {e}",
                path.display()
            )));
        }

        tracing::debug!(
            learner_id,
            topic,
            subtopic,
            version,
            path = %path.display(),
            "entry saved"
        );
        Ok(version)
    }
}

/// Longest learner id, in bytes, stored under its plain hex name.
const MAX_PLAIN_ID_BYTES: usize = 64;

/// File name (without extension) for a learner's document.
///
/// Plain hex for ids up to [`MAX_PLAIN_ID_BYTES`]; longer ids become the hex
/// of their first bytes, a `-`, and the hex SHA-256 of the whole id. Plain
/// names never contain `-`, so the two forms cannot collide.
fn file_stem(learner_id: &str) -> String {
    let bytes = learner_id.as_bytes();
    if bytes.len() <= MAX_PLAIN_ID_BYTES {
        return hex_bytes(bytes);
    }
    let digest = Sha256::digest(bytes);
    format!(
        "{}-{}",
        hex_bytes(&bytes[..MAX_PLAIN_ID_BYTES / 2]),
        hex_bytes(&digest)
    )
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
