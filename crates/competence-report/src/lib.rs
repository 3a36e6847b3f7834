//! competence-report: Learner summaries and report generation.
//!
//! Turns a learner's competence record into a flat summary that can be saved
//! as JSON, rendered as Markdown, or compared against an earlier snapshot.

pub mod markdown;
pub mod summary;

pub use markdown::{generate_markdown, write_markdown_report};
pub use summary::{LearnerSummary, ProgressReport, SubtopicSummary};
