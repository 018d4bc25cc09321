//! Snapshot and context commands

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tally_core::{build_context, format_currency, Snapshot};

use super::aggregate_stored;

/// One-line summary printed after a snapshot
pub fn snapshot_summary(snapshot: &Snapshot) -> String {
    let totals = snapshot.totals();
    format!(
        "{} account(s) at {} institution(s), {} transaction(s); net worth {}",
        snapshot.accounts.len(),
        snapshot.institution_names.len(),
        snapshot.transactions.len(),
        format_currency(totals.net_worth)
    )
}

pub async fn cmd_snapshot(data_file: Option<&Path>) -> Result<()> {
    let snapshot = aggregate_stored(data_file).await?;

    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
    println!("{}", json);
    eprintln!("{}", snapshot_summary(&snapshot));

    Ok(())
}

pub async fn cmd_context(data_file: Option<&Path>) -> Result<()> {
    let snapshot = aggregate_stored(data_file).await?;
    println!("{}", build_context(&snapshot, Utc::now().date_naive()));
    Ok(())
}
