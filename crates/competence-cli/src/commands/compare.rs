//! The `competence compare` command.

use std::path::PathBuf;

use anyhow::Result;

use competence_report::LearnerSummary;

use super::check_format;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_decline: bool,
    format: String,
) -> Result<()> {
    check_format(&format, &["text", "json", "markdown", "md"])?;
    anyhow::ensure!(threshold >= 0.0, "threshold must not be negative");
    let baseline = LearnerSummary::load_json(&baseline_path)?;
    let current = LearnerSummary::load_json(&current_path)?;
    if baseline.learner_id != current.learner_id {
        eprintln!(
            "Warning: comparing different learners ('{}' vs '{}')",
            baseline.learner_id, current.learner_id
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!(
                "Comparison: {} improvements, {} declines, {} unchanged",
                report.improvements.len(),
                report.declines.len(),
                report.unchanged
            );

            if !report.improvements.is_empty() {
                println!("\nImprovements:");
                for c in &report.improvements {
                    println!(
                        "  {} / {} {:.2} -> {:.2} ({:+.2})",
                        c.topic, c.subtopic, c.baseline_score, c.current_score, c.delta
                    );
                }
            }

            if !report.declines.is_empty() {
                println!("\nDeclines:");
                for c in &report.declines {
                    println!(
                        "  {} / {} {:.2} -> {:.2} ({:+.2})",
                        c.topic, c.subtopic, c.baseline_score, c.current_score, c.delta
                    );
                }
            }

            if report.new_entries > 0 {
                println!("\n{} new subtopic(s)", report.new_entries);
            }
        }
    }

    if fail_on_decline && report.has_declines() {
        std::process::exit(1);
    }

    Ok(())
}
