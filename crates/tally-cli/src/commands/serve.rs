//! Server command implementation

use std::path::Path;

use anyhow::Result;
use tally_core::LinkProvider;
use tally_server::{AppState, ServerConfig};

use super::{advisor_from_env, aggregator_from_env, open_store};

pub async fn cmd_serve(
    data_file: Option<&Path>,
    host: &str,
    port: u16,
    static_dir: Option<&Path>,
    allowed_origins: Vec<String>,
) -> Result<()> {
    let store = open_store(data_file);
    let aggregator = aggregator_from_env()?;
    let advisor = advisor_from_env()?;

    println!("🚀 Starting Tally web server...");
    println!("   Linked connections: {}", store.len());
    println!("   Link provider: {}", aggregator.provider().name());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    if !allowed_origins.is_empty() {
        println!("   CORS origins: {}", allowed_origins.join(", "));
    }
    if advisor.is_none() {
        println!("   💡 Tip: Set OPENAI_API_KEY to enable the advisor");
    }
    println!();

    let config = ServerConfig { allowed_origins };
    let state = AppState::new(store, aggregator, advisor, config);
    let static_dir = static_dir.and_then(|d| d.to_str());

    tally_server::serve(state, host, port, static_dir).await
}
