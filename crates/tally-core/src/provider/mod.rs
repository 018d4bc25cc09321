//! Account-linking provider abstraction
//!
//! The linking provider issues link tokens for the front-end widget,
//! exchanges the resulting public token for a durable [`Credential`], and
//! serves accounts, institution identity and transactions for a credential.
//!
//! # Architecture
//!
//! - `LinkProvider` trait: the operations the aggregator and server need
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `PlaidProvider` (HTTP), `MockProvider` (fixtures)
//!
//! # Configuration
//!
//! Environment variables:
//! - `LINK_PROVIDER`: Provider to use (plaid, mock). Default: plaid
//! - `PLAID_CLIENT_ID`, `PLAID_SECRET`: API credentials (required for plaid)
//! - `PLAID_ENV`: sandbox (default), development, production
//! - `PLAID_BASE_URL`: Override the environment URL (tests, proxies)

mod mock;
mod plaid;

pub use mock::{MockItem, MockProvider};
pub use plaid::{PlaidConfig, PlaidEnvironment, PlaidProvider};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::credentials::Credential;
use crate::error::Result;
use crate::models::{Account, Transaction};

/// Interface to the external account-linking service
#[async_trait]
pub trait LinkProvider: Send + Sync {
    /// Create a short-lived link token for the front-end linking flow
    async fn create_link_token(&self) -> Result<String>;

    /// Exchange a public token from the linking flow for a durable credential
    async fn exchange_public_token(&self, public_token: &str) -> Result<Credential>;

    /// Accounts with current balances
    async fn get_accounts(&self, credential: &Credential) -> Result<Vec<Account>>;

    /// Institution id of the connection, if the provider knows it
    async fn get_item_institution_id(&self, credential: &Credential) -> Result<Option<String>>;

    /// Display name of an institution
    async fn get_institution_name(&self, institution_id: &str) -> Result<String>;

    /// Transactions dated within `[start, end]`
    async fn get_transactions(
        &self,
        credential: &Credential,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>>;

    /// Provider name (for logging)
    fn name(&self) -> &str;
}

/// Concrete provider enum
#[derive(Clone)]
pub enum ProviderClient {
    Plaid(PlaidProvider),
    Mock(MockProvider),
}

impl ProviderClient {
    /// Create a provider from environment variables
    ///
    /// Returns None if the selected provider is not configured.
    pub fn from_env() -> Option<Self> {
        let provider = std::env::var("LINK_PROVIDER").unwrap_or_else(|_| "plaid".to_string());

        match provider.to_lowercase().as_str() {
            "plaid" => PlaidProvider::from_env().map(ProviderClient::Plaid),
            "mock" => Some(ProviderClient::Mock(MockProvider::demo())),
            _ => {
                tracing::warn!(provider = %provider, "Unknown LINK_PROVIDER, falling back to plaid");
                PlaidProvider::from_env().map(ProviderClient::Plaid)
            }
        }
    }

    /// Create a mock provider
    pub fn mock(provider: MockProvider) -> Self {
        ProviderClient::Mock(provider)
    }
}

#[async_trait]
impl LinkProvider for ProviderClient {
    async fn create_link_token(&self) -> Result<String> {
        match self {
            ProviderClient::Plaid(p) => p.create_link_token().await,
            ProviderClient::Mock(p) => p.create_link_token().await,
        }
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<Credential> {
        match self {
            ProviderClient::Plaid(p) => p.exchange_public_token(public_token).await,
            ProviderClient::Mock(p) => p.exchange_public_token(public_token).await,
        }
    }

    async fn get_accounts(&self, credential: &Credential) -> Result<Vec<Account>> {
        match self {
            ProviderClient::Plaid(p) => p.get_accounts(credential).await,
            ProviderClient::Mock(p) => p.get_accounts(credential).await,
        }
    }

    async fn get_item_institution_id(&self, credential: &Credential) -> Result<Option<String>> {
        match self {
            ProviderClient::Plaid(p) => p.get_item_institution_id(credential).await,
            ProviderClient::Mock(p) => p.get_item_institution_id(credential).await,
        }
    }

    async fn get_institution_name(&self, institution_id: &str) -> Result<String> {
        match self {
            ProviderClient::Plaid(p) => p.get_institution_name(institution_id).await,
            ProviderClient::Mock(p) => p.get_institution_name(institution_id).await,
        }
    }

    async fn get_transactions(
        &self,
        credential: &Credential,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        match self {
            ProviderClient::Plaid(p) => p.get_transactions(credential, start, end).await,
            ProviderClient::Mock(p) => p.get_transactions(credential, start, end).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            ProviderClient::Plaid(p) => p.name(),
            ProviderClient::Mock(p) => p.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_client_mock() {
        let client = ProviderClient::mock(MockProvider::new());
        assert_eq!(client.name(), "mock");
    }

    #[tokio::test]
    async fn test_provider_client_delegates() {
        let client = ProviderClient::mock(MockProvider::new());
        let credential = client.exchange_public_token("public-abc").await.unwrap();
        assert_eq!(credential.expose(), "access-abc");
    }
}
