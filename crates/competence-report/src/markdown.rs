//! Markdown report generator.

use std::path::Path;

use anyhow::{Context, Result};

use crate::summary::LearnerSummary;

/// Escape characters that would break a Markdown table cell.
pub(crate) fn md_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('|', "\\|").replace('\n', " ")
}

/// Generate a Markdown report from a learner summary.
pub fn generate_markdown(summary: &LearnerSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# Competence report: {}\n\n",
        md_escape(&summary.learner_id)
    ));
    md.push_str(&format!(
        "Generated {} | {} topics | {} subtopics | {} questions answered\n\n",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.overall.topics,
        summary.overall.subtopics,
        summary.overall.total_questions,
    ));

    if summary.entries.is_empty() {
        md.push_str("_No responses recorded yet._\n");
        return md;
    }

    md.push_str(&format!(
        "**Mean score:** {:.2} / 100 | **Correct:** {}/{}\n\n",
        summary.overall.mean_score,
        summary.overall.correct_answers,
        summary.overall.total_questions,
    ));

    let mut current_topic: Option<&str> = None;
    for e in &summary.entries {
        if current_topic != Some(e.topic.as_str()) {
            if current_topic.is_some() {
                md.push('\n');
            }
            md.push_str(&format!("## {}\n\n", md_escape(&e.topic)));
            md.push_str("| Subtopic | Score | /10 | Confidence | Correct | Accuracy | Level | Last updated |\n");
            md.push_str("|----------|-------|-----|------------|---------|----------|-------|--------------|\n");
            current_topic = Some(e.topic.as_str());
        }
        md.push_str(&format!(
            "| {} | {:.2} | {:.2} | {} | {}/{} | {:.0}% | {} | {} |\n",
            md_escape(&e.subtopic),
            e.score,
            e.normalized_score,
            e.confidence,
            e.correct_answers,
            e.total_questions,
            e.accuracy * 100.0,
            e.complexity,
            e.last_updated.format("%Y-%m-%d %H:%M"),
        ));
    }

    md
}

/// Write a Markdown report to a file.
pub fn write_markdown_report(summary: &LearnerSummary, path: &Path) -> Result<()> {
    let md = generate_markdown(summary);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, md)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}
