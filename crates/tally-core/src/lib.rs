//! Tally Core Library
//!
//! Shared functionality for the Tally financial advisor:
//! - Credential store with pluggable persistence
//! - Account-linking providers (Plaid, mock)
//! - Aggregator that merges linked connections into one snapshot
//! - Snapshot cell with serialized refresh passes
//! - Context builder for LLM prompt grounding
//! - Chat completion backends (OpenAI-compatible, mock)
//! - Advisor chat and insight generation with model fallback

pub mod advisor;
pub mod aggregator;
pub mod ai;
pub mod context;
pub mod credentials;
pub mod error;
pub mod models;
pub mod provider;
pub mod state;
pub mod timeout;

/// Test utilities including mock Plaid and chat completion servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use advisor::{Advisor, AdvisorConfig, APOLOGY_MESSAGE};
pub use aggregator::{Aggregator, TRANSACTION_WINDOW_DAYS, UNKNOWN_INSTITUTION};
pub use ai::{
    AIClient, CompletionBackend, CompletionRequest, MockBackend, MockReply, ModelFamily,
    OpenAIBackend, SamplingParams,
};
pub use context::{build_context, format_currency, FinancialSummary, NO_ACCOUNTS_CONTEXT};
pub use credentials::{
    Credential, CredentialPersistence, CredentialStore, FileCredentials, MemoryCredentials,
};
pub use error::{Error, Result};
pub use models::{
    Account, AccountType, Balances, BalanceTotals, ChatMessage, Insight, InsightType, ModelInfo,
    Role, Snapshot, Transaction,
};
pub use provider::{
    LinkProvider, MockItem, MockProvider, PlaidConfig, PlaidEnvironment, PlaidProvider,
    ProviderClient,
};
pub use state::SnapshotCell;
pub use timeout::{parse_timeout, timeout_from_env, TIMEOUT_ENV};
