//! Binary entry point for `slack-rag-bot`.
//!
//! This module provides the command-line interface for slack-rag-bot with options
//! for configuration file paths and logging verbosity. It initializes the
//! necessary components and either serves queue events or processes one.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slack_rag_bot::base::{config::Config, telemetry, types::Void};
use tokio::io::AsyncReadExt;

/// Slack-rag-bot – answers Slack threads with a retrieval-augmented LLM chain.
///
/// Configuration can come from `config.toml` or environment variables
/// (prefixed with `SLACK_RAG_BOT_`).
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: the configured `log_level`
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve queue events through the AWS Lambda runtime.
    Serve,
    /// Process a single queue event and print the acknowledgment.
    Process {
        /// Path to a JSON queue event (`{"Records": [...]}`); reads stdin when omitted.
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
}

/// Main entry point for the slack-rag-bot binary.
///
/// Loads configuration, sets up logging from it, and runs the chosen command.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    let _telemetry = telemetry::init(&config, args.verbose)?;

    match args.command {
        Command::Serve => slack_rag_bot::start(config).await,
        Command::Process { event } => {
            let raw = match event {
                Some(path) => tokio::fs::read_to_string(path).await?,
                None => {
                    let mut raw = String::new();
                    tokio::io::stdin().read_to_string(&mut raw).await?;
                    raw
                }
            };

            let acknowledgment = slack_rag_bot::process_once(config, &raw).await?;

            println!("{}", serde_json::to_string(&acknowledgment)?);

            Ok(())
        }
    }
}
