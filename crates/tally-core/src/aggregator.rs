//! Account/transaction aggregator
//!
//! Fetches every linked connection and merges the results into one
//! [`Snapshot`]. Each credential is fetched in isolation: any failure while
//! fetching one connection drops that connection's contribution and is
//! logged, the pass carries on with the rest. The pass itself never fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::models::{Account, Snapshot, Transaction};
use crate::provider::LinkProvider;

/// Trailing window of transactions fetched per pass
pub const TRANSACTION_WINDOW_DAYS: i64 = 90;

/// Placeholder when the institution lookup fails
pub const UNKNOWN_INSTITUTION: &str = "Unknown Institution";

/// Default bound for a single provider call
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything fetched for one credential
#[derive(Debug, Default)]
struct ConnectionData {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    institution_name: Option<String>,
}

/// Runs aggregation passes against a linking provider
#[derive(Clone)]
pub struct Aggregator {
    provider: Arc<dyn LinkProvider>,
    call_timeout: Duration,
    window_days: i64,
}

impl Aggregator {
    pub fn new(provider: Arc<dyn LinkProvider>) -> Self {
        Self {
            provider,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            window_days: TRANSACTION_WINDOW_DAYS,
        }
    }

    /// Bound every provider call by `timeout`
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &Arc<dyn LinkProvider> {
        &self.provider
    }

    /// Aggregate all credentials as of today
    pub async fn aggregate(&self, credentials: &[Credential]) -> Snapshot {
        self.aggregate_as_of(credentials, Utc::now().date_naive())
            .await
    }

    /// Aggregate all credentials with an explicit "today"
    pub async fn aggregate_as_of(&self, credentials: &[Credential], today: NaiveDate) -> Snapshot {
        let start = today - chrono::Duration::days(self.window_days);

        let mut accounts = Vec::new();
        let mut transactions = Vec::new();
        let mut institution_names = Vec::new();

        for credential in credentials {
            match self.fetch_connection(credential, start, today).await {
                Ok(data) => {
                    debug!(
                        credential = %credential,
                        accounts = data.accounts.len(),
                        transactions = data.transactions.len(),
                        "Fetched connection"
                    );
                    accounts.extend(data.accounts);
                    transactions.extend(data.transactions);
                    institution_names.extend(data.institution_name);
                }
                Err(e) => {
                    warn!(credential = %credential, error = %e, "Error fetching data for connection");
                }
            }
        }

        sort_transactions(&mut transactions);

        info!(
            connections = credentials.len(),
            accounts = accounts.len(),
            transactions = transactions.len(),
            "Aggregation pass complete"
        );

        Snapshot {
            accounts,
            transactions,
            institution_names,
            refreshed_at: Some(Utc::now()),
        }
    }

    /// Fetch one connection; any error aborts only this connection
    async fn fetch_connection(
        &self,
        credential: &Credential,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ConnectionData> {
        let accounts = self
            .bounded("accounts", self.provider.get_accounts(credential))
            .await?;

        let institution_id = self
            .bounded("item", self.provider.get_item_institution_id(credential))
            .await?;
        let institution_name = match institution_id {
            Some(id) => Some(
                match self
                    .bounded("institution", self.provider.get_institution_name(&id))
                    .await
                {
                    Ok(name) => name,
                    Err(e) => {
                        warn!(institution_id = %id, error = %e, "Institution lookup failed");
                        UNKNOWN_INSTITUTION.to_string()
                    }
                },
            ),
            None => None,
        };

        let transactions = self
            .bounded(
                "transactions",
                self.provider.get_transactions(credential, start, end),
            )
            .await?;

        Ok(ConnectionData {
            accounts,
            transactions,
            institution_name,
        })
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.call_timeout.as_secs(), what.to_string()))?
    }
}

/// Most recent first; equal dates keep their fetch order
pub fn sort_transactions(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
}
