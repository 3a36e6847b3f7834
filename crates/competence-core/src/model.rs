//! Core data model types for competence tracking.
//!
//! A learner owns one [`StudentCompetenceRecord`], which maps topic and
//! subtopic names to a [`TopicCompetence`]. Each competence entry keeps the
//! full, append-only history of [`ResponseEvent`]s; its score and confidence
//! are always recomputed from that history and can never be set directly.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidEvent, StoreError};
use crate::scoring::{compute_confidence, compute_score, round_to_hundredths};

/// Question difficulty on a 1..=5 scale.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Difficulty {
    VeryEasy = 1,
    #[default]
    Easy = 2,
    Medium = 3,
    Hard = 4,
    VeryHard = 5,
}

impl Difficulty {
    /// All difficulties, easiest first.
    pub const ALL: [Difficulty; 5] = [
        Difficulty::VeryEasy,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    /// Numeric weight used by the scoring functions.
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = InvalidEvent;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Difficulty::VeryEasy),
            2 => Ok(Difficulty::Easy),
            3 => Ok(Difficulty::Medium),
            4 => Ok(Difficulty::Hard),
            5 => Ok(Difficulty::VeryHard),
            other => Err(InvalidEvent::DifficultyOutOfRange(other)),
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.value()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::VeryEasy => write!(f, "very-easy"),
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::VeryHard => write!(f, "very-hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "very-easy" | "veryeasy" => Ok(Difficulty::VeryEasy),
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "very-hard" | "veryhard" => Ok(Difficulty::VeryHard),
            other => match other.parse::<u8>() {
                Ok(n) => Difficulty::try_from(n).map_err(|e| e.to_string()),
                Err(_) => Err(format!("unknown difficulty: {other}")),
            },
        }
    }
}

/// Coarse reliability label for a competence score, based on sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "Low"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::High => write!(f, "High"),
        }
    }
}

/// Learning-material complexity band suited to a competence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Beginner = 1,
    Elementary = 2,
    Intermediate = 3,
    Advanced = 4,
    Expert = 5,
}

impl ComplexityLevel {
    /// Band a 0..=100 competence score into 20-point complexity levels.
    ///
    /// Lower competence maps to simpler material.
    pub fn from_score(score: f64) -> Self {
        if score < 20.0 {
            ComplexityLevel::Beginner
        } else if score < 40.0 {
            ComplexityLevel::Elementary
        } else if score < 60.0 {
            ComplexityLevel::Intermediate
        } else if score < 80.0 {
            ComplexityLevel::Advanced
        } else {
            ComplexityLevel::Expert
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityLevel::Beginner => write!(f, "beginner"),
            ComplexityLevel::Elementary => write!(f, "elementary"),
            ComplexityLevel::Intermediate => write!(f, "intermediate"),
            ComplexityLevel::Advanced => write!(f, "advanced"),
            ComplexityLevel::Expert => write!(f, "expert"),
        }
    }
}

/// A single graded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Opaque question identifier.
    pub question_id: String,
    /// Difficulty of the question.
    pub difficulty: Difficulty,
    /// Whether the answer was correct.
    pub is_correct: bool,
    /// Grader's quality assessment in `[0, 1]`.
    pub quality_score: f64,
    /// When the answer was given.
    pub timestamp: DateTime<Utc>,
}

impl ResponseEvent {
    /// Create an event timestamped now.
    pub fn new(
        question_id: impl Into<String>,
        difficulty: Difficulty,
        is_correct: bool,
        quality_score: f64,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            difficulty,
            is_correct,
            quality_score,
            timestamp: Utc::now(),
        }
    }

    /// Replace the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check the value constraints that the type system does not enforce.
    pub fn validate(&self) -> Result<(), InvalidEvent> {
        if !(0.0..=1.0).contains(&self.quality_score) {
            return Err(InvalidEvent::QualityOutOfRange(self.quality_score));
        }
        Ok(())
    }
}

/// Competence state for one (topic, subtopic) pair.
///
/// `score` and `confidence` are derived from `responses` on every change and
/// on deserialization; there is no setter for either.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicCompetence {
    score: f64,
    confidence: ConfidenceLevel,
    last_updated: DateTime<Utc>,
    responses: Vec<ResponseEvent>,
}

impl TopicCompetence {
    /// A freshly initialized entry with no history.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            score: 0.0,
            confidence: ConfidenceLevel::Low,
            last_updated: created_at,
            responses: Vec::new(),
        }
    }

    fn from_history(
        topic: &str,
        responses: Vec<ResponseEvent>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            score: compute_score(topic, &responses),
            confidence: compute_confidence(&responses),
            last_updated,
            responses,
        }
    }

    fn append(&mut self, topic: &str, event: ResponseEvent, now: DateTime<Utc>) {
        self.responses.push(event);
        self.score = compute_score(topic, &self.responses);
        self.confidence = compute_confidence(&self.responses);
        self.last_updated = now;
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn confidence(&self) -> ConfidenceLevel {
        self.confidence
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Response history in insertion order.
    pub fn responses(&self) -> &[ResponseEvent] {
        &self.responses
    }

    pub fn total_questions(&self) -> usize {
        self.responses.len()
    }

    pub fn correct_answers(&self) -> usize {
        self.responses.iter().filter(|r| r.is_correct).count()
    }

    /// Score on a 0..=10 scale, rounded to two decimals.
    pub fn normalized_score(&self) -> f64 {
        round_to_hundredths(self.score / 10.0)
    }

    pub fn complexity(&self) -> ComplexityLevel {
        ComplexityLevel::from_score(self.score)
    }
}

/// Every (topic, subtopic) competence entry of one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct StudentCompetenceRecord {
    learner_id: String,
    topics: BTreeMap<String, BTreeMap<String, TopicCompetence>>,
}

impl StudentCompetenceRecord {
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            topics: BTreeMap::new(),
        }
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn competence(&self, topic: &str, subtopic: &str) -> Option<&TopicCompetence> {
        self.topics.get(topic)?.get(subtopic)
    }

    /// Topic → subtopic → competence.
    pub fn topics(&self) -> &BTreeMap<String, BTreeMap<String, TopicCompetence>> {
        &self.topics
    }

    /// Iterate all entries as `(topic, subtopic, competence)`, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &TopicCompetence)> {
        self.topics.iter().flat_map(|(topic, subtopics)| {
            subtopics
                .iter()
                .map(move |(subtopic, c)| (topic.as_str(), subtopic.as_str(), c))
        })
    }

    /// Number of (topic, subtopic) entries.
    pub fn len(&self) -> usize {
        self.topics.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold one response into the (topic, subtopic) entry, creating it if
    /// needed, and return the updated entry.
    pub fn apply_response(
        &mut self,
        topic: &str,
        subtopic: &str,
        event: ResponseEvent,
        now: DateTime<Utc>,
    ) -> &TopicCompetence {
        let entry = self
            .topics
            .entry(topic.to_string())
            .or_default()
            .entry(subtopic.to_string())
            .or_insert_with(|| TopicCompetence::new(now));
        entry.append(topic, event, now);
        entry
    }

    /// Replace the (topic, subtopic) entry with `competence`, provided the
    /// entry currently holds `expected_responses` responses (0 if absent).
    ///
    /// Other entries are untouched. On conflict nothing changes.
    pub fn merge_entry(
        &mut self,
        topic: &str,
        subtopic: &str,
        competence: &TopicCompetence,
        expected_responses: usize,
    ) -> Result<(), StoreError> {
        let found = self
            .competence(topic, subtopic)
            .map_or(0, TopicCompetence::total_questions);
        if found != expected_responses {
            return Err(StoreError::Conflict {
                learner_id: self.learner_id.clone(),
                topic: topic.to_string(),
                subtopic: subtopic.to_string(),
                expected: expected_responses,
                found,
            });
        }
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(subtopic.to_string(), competence.clone());
        Ok(())
    }
}

/// A record together with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub record: StudentCompetenceRecord,
    pub version: u64,
}

// Persisted shape. Derived fields present in the document are ignored and
// recomputed from the response history.
#[derive(Deserialize)]
struct StoredRecord {
    learner_id: String,
    #[serde(default)]
    topics: BTreeMap<String, BTreeMap<String, StoredCompetence>>,
}

#[derive(Deserialize)]
struct StoredCompetence {
    last_updated: DateTime<Utc>,
    #[serde(default)]
    responses: Vec<ResponseEvent>,
}

impl From<StoredRecord> for StudentCompetenceRecord {
    fn from(stored: StoredRecord) -> Self {
        let topics = stored
            .topics
            .into_iter()
            .map(|(topic, subtopics)| {
                let subtopics = subtopics
                    .into_iter()
                    .map(|(name, c)| {
                        let competence =
                            TopicCompetence::from_history(&topic, c.responses, c.last_updated);
                        (name, competence)
                    })
                    .collect();
                (topic, subtopics)
            })
            .collect();
        Self {
            learner_id: stored.learner_id,
            topics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn event(difficulty: Difficulty, correct: bool) -> ResponseEvent {
        ResponseEvent::new("q", difficulty, correct, 1.0).at(ts(0))
    }

    #[test]
    fn difficulty_parse_and_display() {
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(
            "Very Easy".parse::<Difficulty>().unwrap(),
            Difficulty::VeryEasy
        );
        assert_eq!(
            "very_hard".parse::<Difficulty>().unwrap(),
            Difficulty::VeryHard
        );
        assert_eq!("3".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert!("6".parse::<Difficulty>().is_err());
        assert!("impossible".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::VeryHard.to_string(), "very-hard");
        assert_eq!(Difficulty::Easy.value(), 2);
    }

    #[test]
    fn difficulty_rejects_out_of_range() {
        assert_eq!(
            Difficulty::try_from(0),
            Err(InvalidEvent::DifficultyOutOfRange(0))
        );
        assert_eq!(
            Difficulty::try_from(6),
            Err(InvalidEvent::DifficultyOutOfRange(6))
        );
        let err = serde_json::from_str::<Difficulty>("9").unwrap_err();
        assert!(err.to_string().contains("between 1 and 5"), "got: {err}");
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), "4");
    }

    #[test]
    fn quality_score_validation() {
        let mut e = event(Difficulty::Easy, true);
        assert!(e.validate().is_ok());
        e.quality_score = 0.0;
        assert!(e.validate().is_ok());
        e.quality_score = 1.5;
        assert_eq!(e.validate(), Err(InvalidEvent::QualityOutOfRange(1.5)));
        e.quality_score = -0.1;
        assert!(e.validate().is_err());
        e.quality_score = f64::NAN;
        assert!(e.validate().is_err());
    }

    #[test]
    fn complexity_bands() {
        assert_eq!(ComplexityLevel::from_score(0.0), ComplexityLevel::Beginner);
        assert_eq!(ComplexityLevel::from_score(19.99), ComplexityLevel::Beginner);
        assert_eq!(ComplexityLevel::from_score(20.0), ComplexityLevel::Elementary);
        assert_eq!(
            ComplexityLevel::from_score(59.99),
            ComplexityLevel::Intermediate
        );
        assert_eq!(ComplexityLevel::from_score(79.99), ComplexityLevel::Advanced);
        assert_eq!(ComplexityLevel::from_score(80.0), ComplexityLevel::Expert);
        assert_eq!(ComplexityLevel::from_score(100.0), ComplexityLevel::Expert);
    }

    #[test]
    fn new_entry_is_initialized() {
        let c = TopicCompetence::new(ts(5));
        assert_eq!(c.score(), 0.0);
        assert_eq!(c.confidence(), ConfidenceLevel::Low);
        assert_eq!(c.last_updated(), ts(5));
        assert!(c.responses().is_empty());
    }

    #[test]
    fn apply_response_creates_entries_lazily() {
        let mut record = StudentCompetenceRecord::new("alice");
        assert!(record.is_empty());
        assert!(record.competence("math", "algebra").is_none());

        let c = record.apply_response("math", "algebra", event(Difficulty::Easy, true), ts(10));
        assert_eq!(c.total_questions(), 1);
        assert_eq!(c.last_updated(), ts(10));

        record.apply_response("math", "geometry", event(Difficulty::Hard, false), ts(11));
        record.apply_response("Math", "algebra", event(Difficulty::Hard, false), ts(12));

        assert_eq!(record.len(), 3);
        assert_eq!(record.topics().len(), 2, "topic keys are case-sensitive");
        let names: Vec<_> = record.entries().map(|(t, s, _)| (t, s)).collect();
        assert_eq!(
            names,
            vec![("Math", "algebra"), ("math", "algebra"), ("math", "geometry")]
        );
    }

    #[test]
    fn derived_fields_follow_history() {
        let mut record = StudentCompetenceRecord::new("bob");
        for i in 0..5 {
            record.apply_response("t", "s", event(Difficulty::Medium, i % 2 == 0), ts(i));
        }
        let c = record.competence("t", "s").unwrap();
        assert_eq!(c.total_questions(), 5);
        assert_eq!(c.correct_answers(), 3);
        assert_eq!(c.confidence(), ConfidenceLevel::Medium);
        assert_eq!(c.score(), compute_score("t", c.responses()));
        assert_eq!(c.last_updated(), ts(4));
    }

    #[test]
    fn normalized_score_is_tenth() {
        let mut record = StudentCompetenceRecord::new("carol");
        let c = record.apply_response("t", "s", event(Difficulty::Medium, true), ts(0));
        assert_eq!(c.score(), 99.33);
        assert_eq!(c.normalized_score(), 9.93);
        assert_eq!(c.complexity(), ComplexityLevel::Expert);
    }

    #[test]
    fn merge_entry_checks_history_length() {
        let mut base = StudentCompetenceRecord::new("erin");
        base.apply_response("t", "a", event(Difficulty::Easy, true), ts(0));

        // Two writers start from the same record and touch different entries.
        let mut left = base.clone();
        let a = left
            .apply_response("t", "a", event(Difficulty::Hard, true), ts(1))
            .clone();
        let mut right = base.clone();
        let b = right
            .apply_response("t", "b", event(Difficulty::Medium, false), ts(2))
            .clone();

        let mut stored = base.clone();
        stored.merge_entry("t", "a", &a, 1).unwrap();
        stored.merge_entry("t", "b", &b, 0).unwrap();
        assert_eq!(stored.competence("t", "a").unwrap().total_questions(), 2);
        assert_eq!(stored.competence("t", "b").unwrap().total_questions(), 1);

        // A writer that built on the old history of "a" is rejected.
        let stale = base
            .clone()
            .apply_response("t", "a", event(Difficulty::Easy, false), ts(3))
            .clone();
        let err = stored.merge_entry("t", "a", &stale, 1).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 1,
                found: 2,
                ..
            }
        ));
        assert_eq!(stored.competence("t", "a").unwrap(), &a);
    }

    #[test]
    fn deserialization_recomputes_derived_fields() {
        let mut record = StudentCompetenceRecord::new("dave");
        record.apply_response("t", "s", event(Difficulty::Easy, true), ts(0));
        record.apply_response("t", "s", event(Difficulty::Hard, false), ts(1));

        let mut json: serde_json::Value = serde_json::to_value(&record).unwrap();
        json["topics"]["t"]["s"]["score"] = serde_json::json!(1.0);
        json["topics"]["t"]["s"]["confidence"] = serde_json::json!("High");

        let restored: StudentCompetenceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.competence("t", "s").unwrap().confidence(), ConfidenceLevel::Low);
    }
}
