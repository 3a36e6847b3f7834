//! Learner summaries with JSON persistence and progress comparison.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use competence_core::model::{
    ComplexityLevel, ConfidenceLevel, StudentCompetenceRecord, TopicCompetence,
};
use competence_core::scoring::round_to_hundredths;

use crate::markdown::md_escape;

/// Snapshot of one learner's competence across all topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerSummary {
    /// Unique summary identifier.
    pub id: Uuid,
    pub learner_id: String,
    /// When the summary was generated.
    pub generated_at: DateTime<Utc>,
    /// One row per (topic, subtopic), ordered by topic then subtopic.
    pub entries: Vec<SubtopicSummary>,
    /// Totals across all entries.
    pub overall: OverallStats,
}

/// Summary row for one (topic, subtopic) entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtopicSummary {
    pub topic: String,
    pub subtopic: String,
    /// Competence score, 0..=100.
    pub score: f64,
    /// Competence score, 0..=10.
    pub normalized_score: f64,
    pub confidence: ConfidenceLevel,
    pub complexity: ComplexityLevel,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Fraction of correct answers, rounded to two decimals.
    pub accuracy: f64,
    pub last_updated: DateTime<Utc>,
}

impl SubtopicSummary {
    pub fn new(topic: &str, subtopic: &str, competence: &TopicCompetence) -> Self {
        let total = competence.total_questions();
        let correct = competence.correct_answers();
        Self {
            topic: topic.to_string(),
            subtopic: subtopic.to_string(),
            score: competence.score(),
            normalized_score: competence.normalized_score(),
            confidence: competence.confidence(),
            complexity: competence.complexity(),
            total_questions: total,
            correct_answers: correct,
            accuracy: if total == 0 {
                0.0
            } else {
                round_to_hundredths(correct as f64 / total as f64)
            },
            last_updated: competence.last_updated(),
        }
    }
}

/// Aggregates over every entry of a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub topics: usize,
    pub subtopics: usize,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Mean entry score, rounded to two decimals; 0 with no entries.
    pub mean_score: f64,
}

impl LearnerSummary {
    /// Summarize a record as of `generated_at`.
    pub fn from_record(record: &StudentCompetenceRecord, generated_at: DateTime<Utc>) -> Self {
        let entries: Vec<SubtopicSummary> = record
            .entries()
            .map(|(topic, subtopic, c)| SubtopicSummary::new(topic, subtopic, c))
            .collect();

        let mean_score = if entries.is_empty() {
            0.0
        } else {
            round_to_hundredths(
                entries.iter().map(|e| e.score).sum::<f64>() / entries.len() as f64,
            )
        };

        let overall = OverallStats {
            topics: record.topics().len(),
            subtopics: entries.len(),
            total_questions: entries.iter().map(|e| e.total_questions).sum(),
            correct_answers: entries.iter().map(|e| e.correct_answers).sum(),
            mean_score,
        };

        Self {
            id: Uuid::new_v4(),
            learner_id: record.learner_id().to_string(),
            generated_at,
            entries,
            overall,
        }
    }

    /// Find the entry for a (topic, subtopic) pair.
    pub fn entry(&self, topic: &str, subtopic: &str) -> Option<&SubtopicSummary> {
        self.entries
            .iter()
            .find(|e| e.topic == topic && e.subtopic == subtopic)
    }

    /// Save the summary as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize summary")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        Ok(())
    }

    /// Load a summary from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read summary from {}", path.display()))?;
        let summary: LearnerSummary =
            serde_json::from_str(&content).context("failed to parse summary JSON")?;
        Ok(summary)
    }

    /// Compare this summary against an earlier one of the same learner.
    ///
    /// Score changes within `threshold` points count as unchanged.
    pub fn compare(&self, baseline: &LearnerSummary, threshold: f64) -> ProgressReport {
        let baseline_scores: HashMap<(&str, &str), f64> = baseline
            .entries
            .iter()
            .map(|e| ((e.topic.as_str(), e.subtopic.as_str()), e.score))
            .collect();

        let mut declines = Vec::new();
        let mut improvements = Vec::new();
        let mut unchanged = 0usize;
        let mut new_entries = 0usize;

        for e in &self.entries {
            let Some(&before) = baseline_scores.get(&(e.topic.as_str(), e.subtopic.as_str()))
            else {
                new_entries += 1;
                continue;
            };
            let delta = round_to_hundredths(e.score - before);
            let change = ScoreChange {
                topic: e.topic.clone(),
                subtopic: e.subtopic.clone(),
                baseline_score: before,
                current_score: e.score,
                delta,
            };
            if delta < -threshold {
                declines.push(change);
            } else if delta > threshold {
                improvements.push(change);
            } else {
                unchanged += 1;
            }
        }

        ProgressReport {
            learner_id: self.learner_id.clone(),
            declines,
            improvements,
            unchanged,
            new_entries,
        }
    }
}

/// Result of comparing two summaries of one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub learner_id: String,
    /// Entries whose score dropped by more than the threshold.
    pub declines: Vec<ScoreChange>,
    /// Entries whose score rose by more than the threshold.
    pub improvements: Vec<ScoreChange>,
    pub unchanged: usize,
    /// Entries present now but not in the baseline.
    pub new_entries: usize,
}

/// Score movement of one entry between two summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub topic: String,
    pub subtopic: String,
    pub baseline_score: f64,
    pub current_score: f64,
    pub delta: f64,
}

impl ProgressReport {
    /// Format the progress report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Progress for {}:** {} improvements, {} declines, {} unchanged, {} new\n\n",
            md_escape(&self.learner_id),
            self.improvements.len(),
            self.declines.len(),
            self.unchanged,
            self.new_entries
        ));

        for (title, changes) in [
            ("Improvements", &self.improvements),
            ("Declines", &self.declines),
        ] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Topic | Subtopic | Baseline | Current | Delta |\n");
            md.push_str("|-------|----------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {} | {:.2} | {:.2} | {:+.2} |\n",
                    md_escape(&c.topic),
                    md_escape(&c.subtopic),
                    c.baseline_score,
                    c.current_score,
                    c.delta
                ));
            }
            md.push('\n');
        }

        md
    }

    pub fn has_declines(&self) -> bool {
        !self.declines.is_empty()
    }
}
