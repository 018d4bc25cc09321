//! Mock linking provider
//!
//! Serves fixture data keyed by credential. Useful for unit tests and for
//! running the server without provider API keys (`LINK_PROVIDER=mock`).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};

use super::LinkProvider;
use crate::credentials::Credential;
use crate::error::{Error, Result};
use crate::models::{Account, AccountType, Balances, Transaction};

/// Fixture data for one linked connection
#[derive(Debug, Clone, Default)]
pub struct MockItem {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    /// Institution id returned by the item lookup
    pub institution_id: Option<String>,
    /// Institution display name; `None` makes the name lookup fail
    pub institution_name: Option<String>,
    /// Every call for this item fails
    pub fail: bool,
    /// Only the transactions call fails
    pub fail_transactions: bool,
}

impl MockItem {
    pub fn new(accounts: Vec<Account>, transactions: Vec<Transaction>) -> Self {
        Self {
            accounts,
            transactions,
            institution_id: Some("ins_mock".to_string()),
            institution_name: Some("Mock Bank".to_string()),
            fail: false,
            fail_transactions: false,
        }
    }

    /// An item whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_institution(mut self, id: Option<&str>, name: Option<&str>) -> Self {
        self.institution_id = id.map(str::to_string);
        self.institution_name = name.map(str::to_string);
        self
    }
}

/// Mock provider for testing
///
/// Public tokens exchange to `access-<suffix>` where `<suffix>` is the public
/// token without its `public-` prefix.
#[derive(Clone, Default)]
pub struct MockProvider {
    items: Arc<HashMap<String, MockItem>>,
    /// Served for credentials with no fixture of their own
    fallback: Option<Arc<MockItem>>,
    fail_link: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register fixture data for a credential
    pub fn with_item(mut self, credential: &str, item: MockItem) -> Self {
        Arc::make_mut(&mut self.items).insert(credential.to_string(), item);
        self
    }

    /// Make link-token creation and public-token exchange fail
    pub fn with_failing_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    /// A provider that serves a small sample household for any credential
    pub fn demo() -> Self {
        let today = Utc::now().date_naive();
        let accounts = vec![
            demo_account("demo-checking", "Everyday Checking", AccountType::Depository, "checking", 3250.75, None),
            demo_account("demo-savings", "High Yield Savings", AccountType::Depository, "savings", 12_400.0, None),
            demo_account("demo-card", "Rewards Card", AccountType::Credit, "credit card", 842.19, Some(6000.0)),
        ];
        let transactions = vec![
            demo_transaction("demo-t1", "demo-card", today - Duration::days(1), "Whole Foods", 86.42, "FOOD_AND_DRINK"),
            demo_transaction("demo-t2", "demo-checking", today - Duration::days(3), "Payroll Deposit", -2450.0, "INCOME"),
            demo_transaction("demo-t3", "demo-card", today - Duration::days(4), "Netflix", 15.49, "ENTERTAINMENT"),
            demo_transaction("demo-t4", "demo-checking", today - Duration::days(8), "City Utilities", 120.33, "RENT_AND_UTILITIES"),
            demo_transaction("demo-t5", "demo-card", today - Duration::days(12), "Shell", 48.10, "TRANSPORTATION"),
            demo_transaction("demo-t6", "demo-card", today - Duration::days(40), "Delta Air Lines", 389.00, "TRAVEL"),
        ];

        Self {
            fallback: Some(Arc::new(
                MockItem::new(accounts, transactions)
                    .with_institution(Some("ins_demo"), Some("Demo Credit Union")),
            )),
            ..Self::default()
        }
    }

    fn item(&self, credential: &Credential) -> Result<&MockItem> {
        let item = self
            .items
            .get(credential.expose())
            .or(self.fallback.as_deref())
            .ok_or_else(|| Error::NotFound(format!("No mock item for {}", credential)))?;
        if item.fail {
            return Err(Error::Provider(format!(
                "Mock failure for {}",
                credential
            )));
        }
        Ok(item)
    }
}

fn demo_account(
    id: &str,
    name: &str,
    account_type: AccountType,
    subtype: &str,
    current: f64,
    limit: Option<f64>,
) -> Account {
    Account {
        id: id.to_string(),
        name: name.to_string(),
        official_name: None,
        account_type,
        subtype: Some(subtype.to_string()),
        mask: Some("0000".to_string()),
        balances: Balances {
            current: Some(current),
            available: Some(current),
            limit,
            iso_currency_code: Some("USD".to_string()),
        },
    }
}

fn demo_transaction(
    id: &str,
    account_id: &str,
    date: NaiveDate,
    name: &str,
    amount: f64,
    category: &str,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        account_id: account_id.to_string(),
        date,
        name: name.to_string(),
        merchant_name: Some(name.to_string()),
        amount,
        category: category.to_string(),
        pending: false,
    }
}

#[async_trait]
impl LinkProvider for MockProvider {
    async fn create_link_token(&self) -> Result<String> {
        if self.fail_link {
            return Err(Error::Provider("Mock link failure".into()));
        }
        Ok(format!("link-mock-{}", Utc::now().timestamp_millis()))
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<Credential> {
        if self.fail_link {
            return Err(Error::Provider("Mock exchange failure".into()));
        }
        let suffix = public_token.trim_start_matches("public-");
        Ok(Credential::new(format!("access-{}", suffix)))
    }

    async fn get_accounts(&self, credential: &Credential) -> Result<Vec<Account>> {
        Ok(self.item(credential)?.accounts.clone())
    }

    async fn get_item_institution_id(&self, credential: &Credential) -> Result<Option<String>> {
        Ok(self.item(credential)?.institution_id.clone())
    }

    async fn get_institution_name(&self, institution_id: &str) -> Result<String> {
        self.items
            .values()
            .chain(self.fallback.as_deref())
            .find(|item| item.institution_id.as_deref() == Some(institution_id))
            .and_then(|item| item.institution_name.clone())
            .ok_or_else(|| Error::NotFound(format!("Institution {}", institution_id)))
    }

    async fn get_transactions(
        &self,
        credential: &Credential,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let item = self.item(credential)?;
        if item.fail_transactions {
            return Err(Error::Provider("Mock transactions failure".into()));
        }
        Ok(item
            .transactions
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
