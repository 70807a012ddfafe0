//! Chem Agent - command line entry point
//!
//! Runs one conversational turn and prints the outcome as JSON.
//!
//! ```text
//! chem-agent "<question>" [--context-file <path>]
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use chem_agent::{agent::Agent, config::Config};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chem-agent", about = "Answer a chemistry question with tool calls", version)]
struct Args {
    /// The question to answer.
    question: String,
    /// File with retrieved reference material for the question.
    #[arg(long)]
    context_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr, so stdout stays pure JSON)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chem_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let context = match &args.context_file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading context file {}", path.display()))?,
        ),
        None => None,
    };

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, max_tool_iterations={}",
        config.model, config.max_tool_iterations
    );

    let agent = Agent::new(&config)?;
    let outcome = agent.run_turn(&args.question, context.as_deref()).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_and_context_file() {
        let args =
            Args::try_parse_from(["chem-agent", "What is benzene?", "--context-file", "notes.txt"])
                .unwrap();
        assert_eq!(args.question, "What is benzene?");
        assert_eq!(args.context_file, Some(PathBuf::from("notes.txt")));
    }

    #[test]
    fn missing_question_or_path() {
        assert!(Args::try_parse_from(["chem-agent"]).is_err());
        assert!(Args::try_parse_from(["chem-agent", "q", "--context-file"]).is_err());
        assert!(Args::try_parse_from(["chem-agent", "q", "extra"]).is_err());
    }
}
