//! competence CLI: record graded responses and report learner competence.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use competence_core::model::Difficulty;

mod commands;

#[derive(Parser)]
#[command(
    name = "competence",
    version,
    about = "Track learner competence from graded responses"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one graded response
    Record {
        /// Learner identifier
        #[arg(long)]
        learner: String,

        /// Topic name
        #[arg(long)]
        topic: String,

        /// Subtopic name
        #[arg(long)]
        subtopic: String,

        /// Difficulty: 1-5 or very-easy, easy, medium, hard, very-hard
        #[arg(long, default_value = "easy")]
        difficulty: Difficulty,

        /// The answer was correct
        #[arg(long)]
        correct: bool,

        /// Answer quality in [0, 1]
        #[arg(long, default_value = "1.0")]
        quality: f64,

        /// Question identifier (default: random UUID)
        #[arg(long)]
        question_id: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show stored competence for a learner
    Show {
        /// Learner identifier
        #[arg(long)]
        learner: String,

        /// Limit to one topic
        #[arg(long)]
        topic: Option<String>,

        /// Limit to one subtopic (requires --topic)
        #[arg(long, requires = "topic")]
        subtopic: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Score a JSON array of responses without storing anything
    Assess {
        /// Topic name
        #[arg(long)]
        topic: String,

        /// Path to a JSON array of responses
        #[arg(long)]
        responses: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Apply a JSON array of responses to one subtopic, in order
    Replay {
        /// Learner identifier
        #[arg(long)]
        learner: String,

        /// Topic name
        #[arg(long)]
        topic: String,

        /// Subtopic name
        #[arg(long)]
        subtopic: String,

        /// Path to a JSON array of responses
        #[arg(long)]
        events: PathBuf,
    },

    /// Generate a learner report
    Report {
        /// Learner identifier
        #[arg(long)]
        learner: String,

        /// Output format: markdown, json
        #[arg(long, default_value = "markdown")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compare two JSON learner reports
    Compare {
        /// Earlier report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Later report JSON
        #[arg(long)]
        current: PathBuf,

        /// Score change (points) treated as noise
        #[arg(long, default_value = "1.0")]
        threshold: f64,

        /// Exit code 1 if any score declined
        #[arg(long)]
        fail_on_decline: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("competence=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Record {
            learner,
            topic,
            subtopic,
            difficulty,
            correct,
            quality,
            question_id,
            format,
        } => {
            commands::record::execute(
                config,
                learner,
                topic,
                subtopic,
                difficulty,
                correct,
                quality,
                question_id,
                format,
            )
            .await
        }
        Commands::Show {
            learner,
            topic,
            subtopic,
            format,
        } => commands::show::execute(config, learner, topic, subtopic, format).await,
        Commands::Assess {
            topic,
            responses,
            format,
        } => commands::assess::execute(topic, responses, format),
        Commands::Replay {
            learner,
            topic,
            subtopic,
            events,
        } => commands::replay::execute(config, learner, topic, subtopic, events).await,
        Commands::Report {
            learner,
            format,
            output,
        } => commands::report::execute(config, learner, format, output).await,
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_decline,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_decline, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
