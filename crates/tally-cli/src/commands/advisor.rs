//! Advisor commands (ask, insights, models)

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tally_core::{AdvisorConfig, ChatMessage, Insight, InsightType};

use super::{aggregate_stored, require_advisor};

fn insight_icon(insight_type: InsightType) -> &'static str {
    match insight_type {
        InsightType::Warning => "⚠️ ",
        InsightType::Tip => "💡",
        InsightType::Positive => "✅",
        InsightType::Action => "👉",
    }
}

/// Render one insight for the terminal
pub fn format_insight(insight: &Insight) -> String {
    format!(
        "{} {} [{}]\n   {}",
        insight_icon(insight.insight_type),
        insight.title,
        insight.insight_type,
        insight.description
    )
}

/// Render the model catalog, marking the default and fallback models
pub fn format_models(config: &AdvisorConfig) -> Vec<String> {
    config
        .catalog
        .iter()
        .map(|m| {
            let marker = if m.id == config.default_model {
                " (default)"
            } else if m.id == config.fallback_model {
                " (fallback)"
            } else {
                ""
            };
            format!("{:<14} {} - {}{}", m.id, m.name, m.description, marker)
        })
        .collect()
}

pub async fn cmd_ask(data_file: Option<&Path>, question: &str, model: Option<&str>) -> Result<()> {
    let advisor = require_advisor()?;
    let snapshot = aggregate_stored(data_file).await?;

    let reply = advisor
        .chat(
            &snapshot,
            &[ChatMessage::user(question)],
            model,
            Utc::now().date_naive(),
        )
        .await;

    println!("{}", reply.content);
    Ok(())
}

pub async fn cmd_insights(data_file: Option<&Path>) -> Result<()> {
    let advisor = require_advisor()?;
    let snapshot = aggregate_stored(data_file).await?;

    let insights = advisor
        .generate_insights(&snapshot, Utc::now().date_naive())
        .await;

    if insights.is_empty() {
        println!("No insights available.");
        return Ok(());
    }

    println!();
    for insight in &insights {
        println!("{}", format_insight(insight));
        println!();
    }
    Ok(())
}

pub fn cmd_models() -> Result<()> {
    let config = AdvisorConfig::load().context("Failed to load advisor config")?;

    println!("🤖 Chat models");
    for line in format_models(&config) {
        println!("   {}", line);
    }
    if !config.catalog.iter().any(|m| m.id == config.fallback_model) {
        println!("   Fallback: {}", config.fallback_model);
    }
    Ok(())
}
