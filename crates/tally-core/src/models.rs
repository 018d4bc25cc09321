//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Category label used when neither the fine-grained nor the legacy category is present
pub const FALLBACK_CATEGORY: &str = "Other";

/// Account types reported by the linking provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Depository,
    Credit,
    Investment,
    Loan,
    /// Anything the provider reports that we do not model (brokerage, etc.)
    #[default]
    #[serde(other)]
    Other,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depository => "depository",
            Self::Credit => "credit",
            Self::Investment => "investment",
            Self::Loan => "loan",
            Self::Other => "other",
        }
    }

    /// Counts toward total assets
    pub fn is_asset(&self) -> bool {
        matches!(self, Self::Depository | Self::Investment)
    }

    /// Counts toward total liabilities
    pub fn is_liability(&self) -> bool {
        matches!(self, Self::Credit | Self::Loan)
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "depository" => Ok(Self::Depository),
            "credit" => Ok(Self::Credit),
            "investment" | "brokerage" => Ok(Self::Investment),
            "loan" => Ok(Self::Loan),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Balance figures for an account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    /// Current balance; `None` when the institution does not report one
    pub current: Option<f64>,
    pub available: Option<f64>,
    /// Credit limit (credit accounts)
    pub limit: Option<f64>,
    #[serde(default, alias = "iso_currency_code")]
    pub iso_currency_code: Option<String>,
}

/// A linked account with its latest balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    pub balances: Balances,
}

impl Account {
    /// Current balance, treating a missing value as zero
    pub fn current_balance(&self) -> f64 {
        self.balances.current.unwrap_or(0.0)
    }
}

/// A transaction fetched from a linked institution
///
/// `amount` follows the provider convention: positive is money leaving the
/// account, negative is money coming in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    pub amount: f64,
    /// Resolved primary category, see [`resolve_category`]
    pub category: String,
    #[serde(default)]
    pub pending: bool,
}

impl Transaction {
    /// Money out
    pub fn is_outflow(&self) -> bool {
        self.amount > 0.0
    }
}

/// Resolve a transaction's category label
///
/// Prefers the fine-grained primary category, then the first entry of the
/// legacy category hierarchy, then [`FALLBACK_CATEGORY`].
pub fn resolve_category(fine: Option<&str>, legacy: &[String]) -> String {
    fine.map(str::trim)
        .filter(|c| !c.is_empty())
        .or_else(|| {
            legacy
                .first()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
        })
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string()
}

/// Merged view of every linked account and transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    /// Sorted by date, most recent first
    pub transactions: Vec<Transaction>,
    pub institution_names: Vec<String>,
    /// When the aggregation pass that produced this snapshot finished
    #[serde(default)]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Asset/liability totals across all accounts
    pub fn totals(&self) -> BalanceTotals {
        let total_assets: f64 = self
            .accounts
            .iter()
            .filter(|a| a.account_type.is_asset())
            .map(Account::current_balance)
            .sum();
        let total_liabilities: f64 = self
            .accounts
            .iter()
            .filter(|a| a.account_type.is_liability())
            .map(Account::current_balance)
            .sum();

        BalanceTotals {
            total_assets,
            total_liabilities,
            net_worth: total_assets - total_liabilities,
        }
    }
}

/// Aggregate balance figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceTotals {
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One turn of an advisor conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Kind of advisor insight
///
/// Serialized lowercase; decoding accepts any casing since models are loose
/// about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum InsightType {
    Warning,
    Tip,
    Positive,
    Action,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Tip => "tip",
            Self::Positive => "positive",
            Self::Action => "action",
        }
    }
}

impl std::str::FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warning" => Ok(Self::Warning),
            "tip" => Ok(Self::Tip),
            "positive" => Ok(Self::Positive),
            "action" => Ok(Self::Action),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

impl TryFrom<String> for InsightType {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A short, actionable observation generated from the user's data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
}

/// A chat model the user may pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, account_type: AccountType, current: Option<f64>) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            official_name: None,
            account_type,
            subtype: None,
            mask: None,
            balances: Balances {
                current,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_account_type_partitions_are_disjoint() {
        for t in [
            AccountType::Depository,
            AccountType::Credit,
            AccountType::Investment,
            AccountType::Loan,
            AccountType::Other,
        ] {
            assert!(!(t.is_asset() && t.is_liability()), "{} in both", t);
        }
    }

    #[test]
    fn test_unknown_account_type_deserializes_to_other() {
        let t: AccountType = serde_json::from_str("\"brokerage_plus\"").unwrap();
        assert_eq!(t, AccountType::Other);
        let t: AccountType = serde_json::from_str("\"credit\"").unwrap();
        assert_eq!(t, AccountType::Credit);
    }

    #[test]
    fn test_totals_net_worth() {
        let snapshot = Snapshot {
            accounts: vec![
                account("checking", AccountType::Depository, Some(2500.0)),
                account("brokerage", AccountType::Investment, Some(10_000.0)),
                account("card", AccountType::Credit, Some(410.5)),
                account("mortgage", AccountType::Loan, Some(1200.0)),
                account("misc", AccountType::Other, Some(999.0)),
                account("unreported", AccountType::Depository, None),
            ],
            ..Default::default()
        };

        let totals = snapshot.totals();
        assert_eq!(totals.total_assets, 12_500.0);
        assert_eq!(totals.total_liabilities, 1610.5);
        assert_eq!(
            totals.net_worth,
            totals.total_assets - totals.total_liabilities
        );
    }

    #[test]
    fn test_resolve_category_chain() {
        let legacy = vec!["Food and Drink".to_string(), "Restaurants".to_string()];
        assert_eq!(
            resolve_category(Some("FOOD_AND_DRINK"), &legacy),
            "FOOD_AND_DRINK"
        );
        assert_eq!(resolve_category(None, &legacy), "Food and Drink");
        assert_eq!(resolve_category(Some("  "), &legacy), "Food and Drink");
        assert_eq!(resolve_category(None, &[]), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_insight_wire_format() {
        let insight: Insight = serde_json::from_str(
            r#"{"title": "Dining up", "description": "You spent more.", "type": "warning"}"#,
        )
        .unwrap();
        assert_eq!(insight.insight_type, InsightType::Warning);

        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["type"], "warning");
    }

    #[test]
    fn test_insight_type_decodes_any_case() {
        for (raw, expected) in [
            ("Warning", InsightType::Warning),
            ("TIP", InsightType::Tip),
            ("Positive", InsightType::Positive),
            ("aCtIoN", InsightType::Action),
        ] {
            let json = format!(r#"{{"title": "t", "description": "d", "type": "{}"}}"#, raw);
            let insight: Insight = serde_json::from_str(&json).unwrap();
            assert_eq!(insight.insight_type, expected);
            assert_eq!(serde_json::to_value(&insight).unwrap()["type"], expected.as_str());
        }

        let unknown = r#"{"title": "t", "description": "d", "type": "Urgent"}"#;
        assert!(serde_json::from_str::<Insight>(unknown).is_err());
    }

    #[test]
    fn test_snapshot_wire_names() {
        let snapshot = Snapshot {
            institution_names: vec!["Bank".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["institutionNames"][0], "Bank");

        let balances: Balances =
            serde_json::from_str(r#"{"current": 1.0, "iso_currency_code": "USD"}"#).unwrap();
        assert_eq!(balances.iso_currency_code.as_deref(), Some("USD"));
        assert_eq!(serde_json::to_value(&balances).unwrap()["isoCurrencyCode"], "USD");
    }

    #[test]
    fn test_chat_message_roles() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role": "assistant", "content": "hi"}"#).unwrap();
        assert_eq!(msg, ChatMessage::assistant("hi"));
        assert_eq!(ChatMessage::system("x").role.as_str(), "system");
    }
}
