pub mod assess;
pub mod compare;
pub mod init;
pub mod record;
pub mod replay;
pub mod report;
pub mod show;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};
use serde::Deserialize;

use competence_core::engine::CompetenceService;
use competence_core::model::{Difficulty, ResponseEvent, TopicCompetence};
use competence_store::config::load_config_from;
use competence_store::create_store;

/// Build the update service from the configured store backend.
pub fn open_service(config_path: Option<&Path>) -> Result<CompetenceService> {
    let config = load_config_from(config_path)?;
    let store = create_store(&config.store);
    tracing::debug!(backend = store.name(), "store opened");
    Ok(CompetenceService::new(store, config.service_config()))
}

/// One response as written in an input file. Missing fields take the same
/// defaults as the quiz submission payload.
#[derive(Debug, Deserialize)]
pub struct ResponseInput {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ResponseInput {
    pub fn into_event(self) -> Result<ResponseEvent> {
        let difficulty = match self.difficulty {
            Some(d) => Difficulty::try_from(d)?,
            None => Difficulty::default(),
        };
        let question_id = self
            .question_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let event = ResponseEvent::new(
            question_id,
            difficulty,
            self.is_correct,
            self.quality_score.unwrap_or(1.0),
        );
        Ok(match self.timestamp {
            Some(ts) => event.at(ts),
            None => event,
        })
    }
}

/// Reject an output format the command does not support.
pub fn check_format(format: &str, supported: &[&str]) -> Result<()> {
    anyhow::ensure!(
        supported.contains(&format),
        "unknown output format: {format} (expected one of: {})",
        supported.join(", ")
    );
    Ok(())
}

/// Read a JSON array of responses from a file.
pub fn read_responses(path: &Path) -> Result<Vec<ResponseEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read responses: {}", path.display()))?;
    let inputs: Vec<ResponseInput> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse responses: {}", path.display()))?;
    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            input
                .into_event()
                .with_context(|| format!("invalid response at index {i}"))
        })
        .collect()
}

/// Render competence entries as a table.
pub fn competence_table<'a>(
    rows: impl IntoIterator<Item = (&'a str, &'a str, &'a TopicCompetence)>,
) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Topic",
        "Subtopic",
        "Score",
        "/10",
        "Confidence",
        "Correct",
        "Level",
        "Last updated",
    ]);

    for (topic, subtopic, c) in rows {
        table.add_row(vec![
            Cell::new(topic),
            Cell::new(subtopic),
            Cell::new(format!("{:.2}", c.score())),
            Cell::new(format!("{:.2}", c.normalized_score())),
            Cell::new(c.confidence()),
            Cell::new(format!("{}/{}", c.correct_answers(), c.total_questions())),
            Cell::new(c.complexity()),
            Cell::new(c.last_updated().format("%Y-%m-%d %H:%M:%S")),
        ]);
    }

    table
}
