//! The `competence assess` command.

use std::path::PathBuf;

use anyhow::Result;

use competence_core::scoring::assess;

use super::{check_format, read_responses};

pub fn execute(topic: String, responses_path: PathBuf, format: String) -> Result<()> {
    check_format(&format, &["text", "json"])?;
    anyhow::ensure!(!topic.is_empty(), "topic must not be empty");
    let responses = read_responses(&responses_path)?;
    anyhow::ensure!(!responses.is_empty(), "responses must not be empty");
    for (i, r) in responses.iter().enumerate() {
        r.validate()
            .map_err(|e| anyhow::anyhow!("invalid response at index {i}: {e}"))?;
    }

    let assessment = assess(&topic, &responses);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&assessment)?),
        _ => {
            println!("Topic: {}", assessment.topic);
            println!(
                "Competence score: {:.2}/100 ({:.2}/10)",
                assessment.competence_score, assessment.normalized_score
            );
            println!("Confidence level: {}", assessment.confidence);
            println!(
                "Correct answers: {}/{}",
                assessment.correct_answers, assessment.total_questions
            );
            println!("Suggested material level: {}", assessment.complexity);
        }
    }

    Ok(())
}
