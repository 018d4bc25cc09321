//! Plaid linking provider
//!
//! Talks to the Plaid REST API over HTTPS. Every request carries the client
//! id and secret as headers and is bounded by the configured timeout.
//!
//! Error bodies from Plaid are reduced to their `error_type`/`error_code`
//! before they leave this module; the human-readable message and request
//! payloads are only logged at debug level.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::LinkProvider;
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::models::{resolve_category, Account, AccountType, Balances, Transaction};
use crate::timeout::timeout_from_env;

/// Page size for `/transactions/get` (Plaid maximum is 500)
const TRANSACTIONS_PAGE_SIZE: usize = 500;

/// Upper bound on pages fetched per credential
const MAX_TRANSACTION_PAGES: usize = 10;

/// Default per-request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Plaid deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

impl std::str::FromStr for PlaidEnvironment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("Unknown Plaid environment: {}", s)),
        }
    }
}

/// Connection settings for Plaid
#[derive(Debug, Clone)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Shown in the link widget
    pub client_name: String,
    /// Stable id for the single end user
    pub client_user_id: String,
}

impl PlaidConfig {
    pub fn new(client_id: &str, secret: &str, environment: PlaidEnvironment) -> Self {
        Self {
            client_id: client_id.to_string(),
            secret: secret.to_string(),
            base_url: environment.base_url().to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client_name: "AI Financial Advisor".to_string(),
            client_user_id: "user-1".to_string(),
        }
    }

    /// Point at a different base URL
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Create from environment variables
    ///
    /// Required: `PLAID_CLIENT_ID`, `PLAID_SECRET`
    /// Optional: `PLAID_ENV` (default: sandbox), `PLAID_BASE_URL`,
    /// `TALLY_REQUEST_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("PLAID_CLIENT_ID").ok()?;
        let secret = std::env::var("PLAID_SECRET").ok()?;

        let environment = match std::env::var("PLAID_ENV") {
            Ok(env) => env.parse().unwrap_or_else(|e: String| {
                warn!("{}, using sandbox", e);
                PlaidEnvironment::Sandbox
            }),
            Err(_) => PlaidEnvironment::Sandbox,
        };

        let mut config = Self::new(&client_id, &secret, environment);
        if let Ok(base_url) = std::env::var("PLAID_BASE_URL") {
            config = config.with_base_url(&base_url);
        }
        if let Some(timeout) = timeout_from_env() {
            config.timeout = timeout;
        }
        Some(config)
    }
}

/// Plaid HTTP client
#[derive(Clone)]
pub struct PlaidProvider {
    http_client: Client,
    config: PlaidConfig,
}

impl PlaidProvider {
    pub fn new(config: PlaidConfig) -> Result<Self> {
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables (see [`PlaidConfig::from_env`])
    pub fn from_env() -> Option<Self> {
        let config = PlaidConfig::from_env()?;
        match Self::new(config) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "Failed to build Plaid HTTP client");
                None
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// POST a JSON body to a Plaid endpoint and decode the response
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(format!("{}{}", self.config.base_url, path))
            .header("PLAID-CLIENT-ID", &self.config.client_id)
            .header("PLAID-SECRET", &self.config.secret)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error: PlaidError = serde_json::from_str(&body).unwrap_or_default();
            debug!(path, %status, message = %error.error_message, "Plaid error body");
            return Err(Error::Provider(format!(
                "{} returned {} ({}/{})",
                path, status, error.error_type, error.error_code
            )));
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Default, Deserialize)]
struct PlaidError {
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Serialize)]
struct LinkTokenCreateRequest<'a> {
    user: LinkUser<'a>,
    client_name: &'a str,
    products: [&'a str; 1],
    country_codes: [&'a str; 1],
    language: &'a str,
}

#[derive(Debug, Serialize)]
struct LinkUser<'a> {
    client_user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Debug, Serialize)]
struct PublicTokenExchangeRequest<'a> {
    public_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublicTokenExchangeResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct AccessTokenRequest<'a> {
    access_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccountsGetResponse {
    accounts: Vec<PlaidAccount>,
}

#[derive(Debug, Deserialize)]
struct PlaidAccount {
    account_id: String,
    name: String,
    #[serde(default)]
    official_name: Option<String>,
    #[serde(rename = "type", default)]
    account_type: AccountType,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    mask: Option<String>,
    balances: Balances,
}

impl From<PlaidAccount> for Account {
    fn from(a: PlaidAccount) -> Self {
        Account {
            id: a.account_id,
            name: a.name,
            official_name: a.official_name,
            account_type: a.account_type,
            subtype: a.subtype,
            mask: a.mask,
            balances: a.balances,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemGetResponse {
    item: PlaidItem,
}

#[derive(Debug, Deserialize)]
struct PlaidItem {
    #[serde(default)]
    institution_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct InstitutionGetRequest<'a> {
    institution_id: &'a str,
    country_codes: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct InstitutionGetResponse {
    institution: PlaidInstitution,
}

#[derive(Debug, Deserialize)]
struct PlaidInstitution {
    name: String,
}

#[derive(Debug, Serialize)]
struct TransactionsGetRequest<'a> {
    access_token: &'a str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    options: TransactionsOptions,
}

#[derive(Debug, Serialize)]
struct TransactionsOptions {
    count: usize,
    offset: usize,
}

#[derive(Debug, Deserialize)]
struct TransactionsGetResponse {
    transactions: Vec<PlaidTransaction>,
    #[serde(default)]
    total_transactions: usize,
}

#[derive(Debug, Deserialize)]
struct PlaidTransaction {
    transaction_id: String,
    account_id: String,
    date: NaiveDate,
    name: String,
    #[serde(default)]
    merchant_name: Option<String>,
    amount: f64,
    #[serde(default)]
    category: Option<Vec<String>>,
    #[serde(default)]
    personal_finance_category: Option<PersonalFinanceCategory>,
    #[serde(default)]
    pending: bool,
}

#[derive(Debug, Deserialize)]
struct PersonalFinanceCategory {
    #[serde(default)]
    primary: Option<String>,
}

impl From<PlaidTransaction> for Transaction {
    fn from(t: PlaidTransaction) -> Self {
        let category = resolve_category(
            t.personal_finance_category
                .as_ref()
                .and_then(|c| c.primary.as_deref()),
            t.category.as_deref().unwrap_or(&[]),
        );
        Transaction {
            id: t.transaction_id,
            account_id: t.account_id,
            date: t.date,
            name: t.name,
            merchant_name: t.merchant_name,
            amount: t.amount,
            category,
            pending: t.pending,
        }
    }
}

#[async_trait]
impl LinkProvider for PlaidProvider {
    async fn create_link_token(&self) -> Result<String> {
        let request = LinkTokenCreateRequest {
            user: LinkUser {
                client_user_id: &self.config.client_user_id,
            },
            client_name: &self.config.client_name,
            products: ["transactions"],
            country_codes: ["US"],
            language: "en",
        };
        let response: LinkTokenCreateResponse = self.post("/link/token/create", &request).await?;
        Ok(response.link_token)
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<Credential> {
        let response: PublicTokenExchangeResponse = self
            .post(
                "/item/public_token/exchange",
                &PublicTokenExchangeRequest { public_token },
            )
            .await?;
        Ok(Credential::new(response.access_token))
    }

    async fn get_accounts(&self, credential: &Credential) -> Result<Vec<Account>> {
        let response: AccountsGetResponse = self
            .post(
                "/accounts/get",
                &AccessTokenRequest {
                    access_token: credential.expose(),
                },
            )
            .await?;
        Ok(response.accounts.into_iter().map(Account::from).collect())
    }

    async fn get_item_institution_id(&self, credential: &Credential) -> Result<Option<String>> {
        let response: ItemGetResponse = self
            .post(
                "/item/get",
                &AccessTokenRequest {
                    access_token: credential.expose(),
                },
            )
            .await?;
        Ok(response.item.institution_id)
    }

    async fn get_institution_name(&self, institution_id: &str) -> Result<String> {
        let response: InstitutionGetResponse = self
            .post(
                "/institutions/get_by_id",
                &InstitutionGetRequest {
                    institution_id,
                    country_codes: ["US"],
                },
            )
            .await?;
        Ok(response.institution.name)
    }

    async fn get_transactions(
        &self,
        credential: &Credential,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();

        for page in 0..MAX_TRANSACTION_PAGES {
            let request = TransactionsGetRequest {
                access_token: credential.expose(),
                start_date: start,
                end_date: end,
                options: TransactionsOptions {
                    count: TRANSACTIONS_PAGE_SIZE,
                    offset: transactions.len(),
                },
            };
            let response: TransactionsGetResponse =
                self.post("/transactions/get", &request).await?;

            let fetched = response.transactions.len();
            transactions.extend(response.transactions.into_iter().map(Transaction::from));

            if fetched == 0 || transactions.len() >= response.total_transactions {
                break;
            }
            if page + 1 == MAX_TRANSACTION_PAGES {
                warn!(
                    credential = %credential,
                    fetched = transactions.len(),
                    total = response.total_transactions,
                    "Transaction page limit reached"
                );
            }
        }

        Ok(transactions)
    }

    fn name(&self) -> &str {
        "plaid"
    }
}
