//! The `competence init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("competence.toml").exists() {
        println!("competence.toml already exists, skipping.");
    } else {
        std::fs::write("competence.toml", SAMPLE_CONFIG)?;
        println!("Created competence.toml");
    }

    println!("\nNext steps:");
    println!(
        "  1. Run: competence record --learner alice --topic math --subtopic algebra --difficulty medium --correct"
    );
    println!("  2. Run: competence show --learner alice");
    println!("  3. Run: competence report --learner alice");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# competence configuration

[store]
backend = "file"
path = "./competence-data"

[service]
max_conflict_retries = 5
retry_delay_ms = 10
"#;
