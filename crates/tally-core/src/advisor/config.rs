//! Advisor model configuration
//!
//! Two-layer resolution: an override file in the platform data directory
//! (`<data_local_dir>/tally/config/advisor.toml`), else the default embedded
//! at compile time. Keys missing from the override keep their default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::ModelInfo;

/// Default configuration (embedded at compile time)
const DEFAULT_CONFIG: &str = include_str!("../../../../config/advisor.toml");

/// Resolved advisor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorConfig {
    /// Chat model when the caller gives no hint
    pub default_model: String,
    /// Always-available model tried after the chosen one
    pub fallback_model: String,
    pub chat_max_tokens: u32,
    pub chat_temperature: f32,
    /// Ordered insight candidates
    pub insight_models: Vec<String>,
    pub insight_max_tokens: u32,
    pub insight_temperature: f32,
    /// Models the user may pick from
    pub catalog: Vec<ModelInfo>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-5.2".to_string(),
            fallback_model: "gpt-4o".to_string(),
            chat_max_tokens: 1000,
            chat_temperature: 0.7,
            insight_models: vec![
                "gpt-5.2".to_string(),
                "gpt-5-mini".to_string(),
                "gpt-4o-mini".to_string(),
            ],
            insight_max_tokens: 800,
            insight_temperature: 0.7,
            catalog: Vec::new(),
        }
    }
}

impl AdvisorConfig {
    /// Load the override if present, else the embedded default
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => parse_config(DEFAULT_CONFIG),
        }
    }

    /// Load from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = parse_config(&content)?;
        info!(path = %path.display(), "Loaded advisor config override");
        Ok(config)
    }

    /// The embedded default
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }
}

/// Location of the user override file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("advisor.toml"))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    chat: Option<RawChat>,
    insights: Option<RawInsights>,
    catalog: Option<Vec<ModelInfo>>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    default_model: Option<String>,
    fallback_model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawInsights {
    models: Option<Vec<String>>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<AdvisorConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = AdvisorConfig::default();

    if let Some(chat) = raw.chat {
        if let Some(model) = chat.default_model {
            config.default_model = model;
        }
        if let Some(model) = chat.fallback_model {
            config.fallback_model = model;
        }
        if let Some(max_tokens) = chat.max_tokens {
            config.chat_max_tokens = max_tokens;
        }
        if let Some(temperature) = chat.temperature {
            config.chat_temperature = temperature;
        }
    }

    if let Some(insights) = raw.insights {
        if let Some(models) = insights.models {
            config.insight_models = models;
        }
        if let Some(max_tokens) = insights.max_tokens {
            config.insight_max_tokens = max_tokens;
        }
        if let Some(temperature) = insights.temperature {
            config.insight_temperature = temperature;
        }
    }

    if let Some(catalog) = raw.catalog {
        config.catalog = catalog;
    }

    validate(&config)?;
    debug!(
        default_model = %config.default_model,
        fallback_model = %config.fallback_model,
        insight_models = config.insight_models.len(),
        "Parsed advisor config"
    );
    Ok(config)
}

fn validate(config: &AdvisorConfig) -> Result<()> {
    if config.default_model.trim().is_empty() || config.fallback_model.trim().is_empty() {
        return Err(Error::Config("Chat models must not be empty".into()));
    }
    if config.insight_models.iter().any(|m| m.trim().is_empty()) {
        return Err(Error::Config("Insight models must not be empty".into()));
    }
    if config.chat_max_tokens == 0 || config.insight_max_tokens == 0 {
        return Err(Error::Config("max_tokens must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_default_parses() {
        let config = AdvisorConfig::embedded().unwrap();
        assert_eq!(config.default_model, "gpt-5.2");
        assert_eq!(config.fallback_model, "gpt-4o");
        assert_eq!(config.chat_max_tokens, 1000);
        assert_eq!(config.insight_max_tokens, 800);
        assert_eq!(
            config.insight_models,
            vec!["gpt-5.2", "gpt-5-mini", "gpt-4o-mini"]
        );
        let ids: Vec<&str> = config.catalog.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["gpt-5.2", "gpt-5-mini", "gpt-5-nano"]);
        assert_eq!(config.catalog[0].description, "Latest flagship model");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = parse_config(
            r#"
            [chat]
            default_model = "gpt-4o-mini"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.fallback_model, "gpt-4o");
        assert_eq!(config.insight_models.len(), 3);
    }

    #[test]
    fn test_invalid_toml_errors() {
        assert!(matches!(parse_config("[chat"), Err(Error::Toml(_))));
    }

    #[test]
    fn test_empty_model_rejected() {
        let result = parse_config(
            r#"
            [chat]
            fallback_model = "  "
            "#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("advisor.toml");
        fs::write(
            &path,
            r#"
            [insights]
            models = ["gpt-4o-mini"]
            max_tokens = 400
            "#,
        )
        .unwrap();

        let config = AdvisorConfig::load_from(&path).unwrap();
        assert_eq!(config.insight_models, vec!["gpt-4o-mini"]);
        assert_eq!(config.insight_max_tokens, 400);
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(AdvisorConfig::load_from(&dir.path().join("nope.toml")).is_err());
    }
}
