//! The `competence show` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{check_format, competence_table, open_service};

pub async fn execute(
    config_path: Option<PathBuf>,
    learner: String,
    topic: Option<String>,
    subtopic: Option<String>,
    format: String,
) -> Result<()> {
    check_format(&format, &["table", "json"])?;
    let service = open_service(config_path.as_deref())?;

    let Some(record) = service.record(&learner).await? else {
        println!("No competence recorded for learner '{learner}'.");
        return Ok(());
    };

    let rows: Vec<_> = record
        .entries()
        .filter(|(t, s, _)| {
            topic.as_deref().map_or(true, |want| want == *t)
                && subtopic.as_deref().map_or(true, |want| want == *s)
        })
        .collect();

    if rows.is_empty() {
        println!("No competence recorded for learner '{learner}' matching the filter.");
        return Ok(());
    }

    match format.as_str() {
        "json" => {
            let entries: Vec<_> = rows
                .iter()
                .map(|(t, s, c)| {
                    serde_json::json!({
                        "topic": t,
                        "subtopic": s,
                        "competence": c,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => println!("{}", competence_table(rows)),
    }

    Ok(())
}
