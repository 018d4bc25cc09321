//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Ask an AI advisor about your linked accounts
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "AI financial advisor over linked bank accounts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Credential file (default: $TALLY_DATA_FILE or .session-data.json)
    #[arg(long, global = true)]
    pub data_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = tally_server::DEFAULT_PORT)]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing the built front-end (e.g., client/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "allowed-origin")]
        allowed_origins: Vec<String>,
    },

    /// Aggregate linked accounts and print the snapshot as JSON
    Snapshot,

    /// Aggregate linked accounts and print the advisor's financial context
    Context,

    /// Ask the advisor a single question
    Ask {
        /// The question
        question: String,

        /// Preferred chat model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Generate four insights from linked accounts
    Insights,

    /// List selectable chat models
    Models,
}
