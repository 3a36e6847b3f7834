//! The `competence record` command.

use std::path::PathBuf;

use anyhow::Result;

use competence_core::model::{Difficulty, ResponseEvent};

use super::{check_format, competence_table, open_service};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    config_path: Option<PathBuf>,
    learner: String,
    topic: String,
    subtopic: String,
    difficulty: Difficulty,
    correct: bool,
    quality: f64,
    question_id: Option<String>,
    format: String,
) -> Result<()> {
    check_format(&format, &["table", "json"])?;
    let service = open_service(config_path.as_deref())?;

    let question_id = question_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let event = ResponseEvent::new(question_id, difficulty, correct, quality);
    let competence = service.update(&learner, &topic, &subtopic, event).await?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&competence)?),
        _ => {
            println!("{}", competence_table([(topic.as_str(), subtopic.as_str(), &competence)]));
        }
    }

    Ok(())
}
