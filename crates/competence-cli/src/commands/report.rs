//! The `competence report` command.

use std::path::PathBuf;

use anyhow::Result;

use competence_report::{generate_markdown, write_markdown_report, LearnerSummary};

use super::{check_format, open_service};

pub async fn execute(
    config_path: Option<PathBuf>,
    learner: String,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    check_format(&format, &["markdown", "md", "json"])?;
    let service = open_service(config_path.as_deref())?;
    let record = service
        .record(&learner)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no competence recorded for learner '{learner}'"))?;
    let summary = LearnerSummary::from_record(&record, chrono::Utc::now());

    match (format.as_str(), output) {
        ("json", Some(path)) => {
            summary.save_json(&path)?;
            eprintln!("Report saved to: {}", path.display());
        }
        ("json", None) => println!("{}", serde_json::to_string_pretty(&summary)?),
        ("markdown" | "md", Some(path)) => {
            write_markdown_report(&summary, &path)?;
            eprintln!("Report saved to: {}", path.display());
        }
        ("markdown" | "md", None) => print!("{}", generate_markdown(&summary)),
        (other, _) => anyhow::bail!("unknown report format: {other}"),
    }

    Ok(())
}
