//! Tally CLI - AI financial advisor over linked bank accounts
//!
//! Usage:
//!   tally serve --port 5001   Start the web server
//!   tally snapshot            Aggregate linked accounts and print JSON
//!   tally ask "question"      One-shot advisor chat
//!   tally insights            Generate four insights

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    // API keys usually live in .env; a missing file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let data_file = cli.data_file.as_deref();

    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
            allowed_origins,
        } => {
            commands::cmd_serve(
                data_file,
                &host,
                port,
                static_dir.as_deref(),
                allowed_origins,
            )
            .await
        }
        Commands::Snapshot => commands::cmd_snapshot(data_file).await,
        Commands::Context => commands::cmd_context(data_file).await,
        Commands::Ask { question, model } => {
            commands::cmd_ask(data_file, &question, model.as_deref()).await
        }
        Commands::Insights => commands::cmd_insights(data_file).await,
        Commands::Models => commands::cmd_models(),
    }
}
