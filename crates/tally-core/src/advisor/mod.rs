//! AI financial advisor
//!
//! Grounds a language model in the current [`Snapshot`] and produces either
//! a chat reply or a fixed-size list of insights. Both paths walk an ordered
//! list of model candidates and never fail: the worst case is a fixed apology
//! message or an empty insight list.
//!
//! [`Snapshot`]: crate::models::Snapshot

mod chat;
mod config;
mod insights;
pub mod prompts;

pub use config::{default_config_path, AdvisorConfig};
pub use prompts::APOLOGY_MESSAGE;

use crate::ai::AIClient;
use crate::models::ModelInfo;

/// Chat and insight generation over one completion backend
#[derive(Clone)]
pub struct Advisor {
    backend: AIClient,
    config: AdvisorConfig,
}

impl Advisor {
    pub fn new(backend: AIClient, config: AdvisorConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &AIClient {
        &self.backend
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Models the user may choose from
    pub fn models(&self) -> &[ModelInfo] {
        &self.config.catalog
    }
}
