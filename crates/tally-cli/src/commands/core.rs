//! Shared command utilities
//!
//! Everything here is configured from the environment (see `.env.example`);
//! the commands only decide what to do with the pieces.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tally_core::{
    timeout_from_env, AIClient, Advisor, AdvisorConfig, Aggregator, CredentialStore,
    FileCredentials, ProviderClient, Snapshot,
};
use tracing::info;

/// Open the credential store at `data_file`, or wherever `TALLY_DATA_FILE` points
pub fn open_store(data_file: Option<&Path>) -> CredentialStore {
    let persistence = match data_file {
        Some(path) => FileCredentials::new(path),
        None => FileCredentials::from_env(),
    };
    CredentialStore::open(persistence)
}

/// Build the aggregator for the configured linking provider
pub fn aggregator_from_env() -> Result<Aggregator> {
    let provider = ProviderClient::from_env().context(
        "Link provider not configured (set PLAID_CLIENT_ID and PLAID_SECRET, or LINK_PROVIDER=mock)",
    )?;

    let mut aggregator = Aggregator::new(Arc::new(provider));
    if let Some(timeout) = timeout_from_env() {
        aggregator = aggregator.with_call_timeout(timeout);
    }
    Ok(aggregator)
}

/// Build the advisor if a model backend is configured
pub fn advisor_from_env() -> Result<Option<Advisor>> {
    let Some(backend) = AIClient::from_env() else {
        return Ok(None);
    };
    let config = AdvisorConfig::load().context("Failed to load advisor config")?;
    info!(
        backend = backend.kind(),
        default_model = %config.default_model,
        "Advisor configured"
    );
    Ok(Some(Advisor::new(backend, config)))
}

/// Like [`advisor_from_env`], but a missing backend is an error
pub fn require_advisor() -> Result<Advisor> {
    advisor_from_env()?.context("AI backend not configured (set OPENAI_API_KEY, or AI_BACKEND=mock)")
}

/// Aggregate every stored credential once
pub async fn aggregate_stored(data_file: Option<&Path>) -> Result<Snapshot> {
    let store = open_store(data_file);
    if store.is_empty() {
        println!("ℹ️  No linked accounts yet (link one through the web UI: tally serve)");
    }
    let aggregator = aggregator_from_env()?;
    Ok(aggregator.aggregate(store.credentials()).await)
}
