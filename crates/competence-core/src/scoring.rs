//! Competence scoring and confidence functions.
//!
//! All functions here are pure: the same ordered history always yields the
//! same, bit-identical result. Scores blend accuracy with difficulty-weighted
//! answer quality, then pass the blend through a logistic curve centered at 50
//! so gains flatten out near both ends of the 0..=100 range.

use serde::{Deserialize, Serialize};

use crate::model::{ComplexityLevel, ConfidenceLevel, ResponseEvent};

/// Accuracy weight before any responses are counted.
pub const BASE_ACCURACY_WEIGHT: f64 = 0.4;

/// Accuracy weight cap, reached at 20 responses.
pub const MAX_ACCURACY_WEIGHT: f64 = 0.6;

/// Logistic steepness applied to the raw score.
pub const LOGISTIC_STEEPNESS: f64 = 0.1;

/// Raw score mapped to 50 by the logistic curve.
pub const LOGISTIC_MIDPOINT: f64 = 50.0;

/// Responses needed for [`ConfidenceLevel::Medium`].
pub const MEDIUM_CONFIDENCE_RESPONSES: usize = 5;

/// Responses needed for [`ConfidenceLevel::High`].
pub const HIGH_CONFIDENCE_RESPONSES: usize = 20;

/// Every intermediate value of one score computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Fraction of correct answers.
    pub accuracy: f64,
    /// Sum of `difficulty * quality_score` over correct answers.
    pub weighted_difficulty_score: f64,
    /// Sum of difficulty over all answers.
    pub total_difficulty: u32,
    pub accuracy_weight: f64,
    pub difficulty_weight: f64,
    /// Linear blend on a 0..=100 scale, before the logistic curve.
    pub raw_score: f64,
    /// Logistic-squashed score, unrounded.
    pub final_score: f64,
}

impl ScoreBreakdown {
    /// The score as stored and reported: `final_score` rounded to two decimals.
    pub fn rounded(&self) -> f64 {
        round_to_hundredths(self.final_score)
    }
}

/// Accuracy weight for `n` responses: `min(0.6, 0.4 + n / 100)`.
pub fn accuracy_weight(n: usize) -> f64 {
    MAX_ACCURACY_WEIGHT.min(BASE_ACCURACY_WEIGHT + n as f64 / 100.0)
}

/// Round to two decimal places, halves away from zero.
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Break down the score for a response history.
///
/// Returns `None` for an empty history, which scores 0 without evaluating the
/// formula.
pub fn score_breakdown(responses: &[ResponseEvent]) -> Option<ScoreBreakdown> {
    if responses.is_empty() {
        return None;
    }

    let total_questions = responses.len();
    let correct_answers = responses.iter().filter(|r| r.is_correct).count();
    let accuracy = correct_answers as f64 / total_questions as f64;

    let weighted_difficulty_score: f64 = responses
        .iter()
        .filter(|r| r.is_correct)
        .map(|r| f64::from(r.difficulty.value()) * r.quality_score)
        .sum();
    let total_difficulty: u32 = responses
        .iter()
        .map(|r| u32::from(r.difficulty.value()))
        .sum();

    let accuracy_weight = accuracy_weight(total_questions);
    let difficulty_weight = 1.0 - accuracy_weight;

    let raw_score = 100.0
        * (accuracy * accuracy_weight
            + (weighted_difficulty_score / f64::from(total_difficulty)) * difficulty_weight);
    let final_score =
        100.0 / (1.0 + (-LOGISTIC_STEEPNESS * (raw_score - LOGISTIC_MIDPOINT)).exp());

    Some(ScoreBreakdown {
        total_questions,
        correct_answers,
        accuracy,
        weighted_difficulty_score,
        total_difficulty,
        accuracy_weight,
        difficulty_weight,
        raw_score,
        final_score,
    })
}

/// Compute the 0..=100 competence score for a response history.
///
/// `_topic` does not influence the result yet; it is part of the signature so
/// per-topic tuning can be added without changing callers.
pub fn compute_score(_topic: &str, responses: &[ResponseEvent]) -> f64 {
    score_breakdown(responses)
        .map(|b| b.rounded())
        .unwrap_or(0.0)
}

/// Confidence label from the number of responses alone.
pub fn compute_confidence(responses: &[ResponseEvent]) -> ConfidenceLevel {
    let n = responses.len();
    if n < MEDIUM_CONFIDENCE_RESPONSES {
        ConfidenceLevel::Low
    } else if n < HIGH_CONFIDENCE_RESPONSES {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::High
    }
}

/// One-shot scoring of a batch of responses that is not persisted anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub topic: String,
    /// Score on the 0..=100 scale.
    pub competence_score: f64,
    /// Score on a 0..=10 scale.
    pub normalized_score: f64,
    pub confidence: ConfidenceLevel,
    pub complexity: ComplexityLevel,
    pub total_questions: usize,
    pub correct_answers: usize,
}

/// Score a batch of responses without touching any store.
pub fn assess(topic: &str, responses: &[ResponseEvent]) -> Assessment {
    let competence_score = compute_score(topic, responses);
    Assessment {
        topic: topic.to_string(),
        competence_score,
        normalized_score: round_to_hundredths(competence_score / 10.0),
        confidence: compute_confidence(responses),
        complexity: ComplexityLevel::from_score(competence_score),
        total_questions: responses.len(),
        correct_answers: responses.iter().filter(|r| r.is_correct).count(),
    }
}
