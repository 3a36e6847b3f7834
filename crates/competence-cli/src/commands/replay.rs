//! The `competence replay` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{competence_table, open_service, read_responses};

pub async fn execute(
    config_path: Option<PathBuf>,
    learner: String,
    topic: String,
    subtopic: String,
    events_path: PathBuf,
) -> Result<()> {
    let events = read_responses(&events_path)?;
    let count = events.len();
    let service = open_service(config_path.as_deref())?;

    match service.replay(&learner, &topic, &subtopic, events).await? {
        Some(competence) => {
            eprintln!("Applied {count} response(s) to {learner} :: {topic} / {subtopic}");
            println!("{}", competence_table([(topic.as_str(), subtopic.as_str(), &competence)]));
        }
        None => println!("No responses to apply."),
    }

    Ok(())
}
