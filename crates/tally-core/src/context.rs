//! Financial context builder
//!
//! Reduces a [`Snapshot`] to the plain-text summary handed to the language
//! model. The output is a pure function of the snapshot and the reference
//! date. Section order and truncation limits bound the prompt size:
//!
//! 1. `ACCOUNTS`: one line per account
//! 2. `FINANCIAL OVERVIEW`: assets, liabilities, net worth
//! 3. `SPENDING BY CATEGORY`: outflows in the trailing 30 days, top 10
//! 4. `RECENT TRANSACTIONS`: the 15 most recent, with explicit direction

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{Account, BalanceTotals, Snapshot, Transaction};

/// Returned when no accounts are linked; the advisor runs ungrounded
pub const NO_ACCOUNTS_CONTEXT: &str = "The user has not connected any financial accounts yet.";

/// Trailing window for the category spending summary
pub const SPENDING_WINDOW_DAYS: i64 = 30;

/// Maximum number of categories in the spending summary
pub const MAX_SPENDING_CATEGORIES: usize = 10;

/// Maximum number of transactions listed verbatim
pub const MAX_RECENT_TRANSACTIONS: usize = 15;

/// Total outflow for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    pub category: String,
    pub amount: f64,
}

/// The computed parts of the context, before rendering
#[derive(Debug, Clone, Serialize)]
pub struct FinancialSummary<'a> {
    pub accounts: &'a [Account],
    pub totals: BalanceTotals,
    pub spending: Vec<CategorySpending>,
    pub recent: &'a [Transaction],
}

impl<'a> FinancialSummary<'a> {
    pub fn from_snapshot(snapshot: &'a Snapshot, today: NaiveDate) -> Self {
        let recent_len = snapshot.transactions.len().min(MAX_RECENT_TRANSACTIONS);
        Self {
            accounts: &snapshot.accounts,
            totals: snapshot.totals(),
            spending: spending_by_category(&snapshot.transactions, today),
            recent: &snapshot.transactions[..recent_len],
        }
    }

    /// Render the summary as prompt text
    pub fn render(&self) -> String {
        let accounts = self
            .accounts
            .iter()
            .map(account_line)
            .collect::<Vec<_>>()
            .join("\n");

        let spending = if self.spending.is_empty() {
            "No spending data available".to_string()
        } else {
            self.spending
                .iter()
                .map(|s| format!("- {}: {}", s.category, format_currency(s.amount)))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let recent = if self.recent.is_empty() {
            "No recent transactions".to_string()
        } else {
            self.recent
                .iter()
                .map(transaction_line)
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "ACCOUNTS:\n{accounts}\n\n\
             FINANCIAL OVERVIEW:\n\
             Total Assets: {assets}\n\
             Total Liabilities: {liabilities}\n\
             Net Worth: {net_worth}\n\n\
             SPENDING BY CATEGORY (Last {window} Days):\n{spending}\n\n\
             RECENT TRANSACTIONS:\n{recent}",
            assets = format_currency(self.totals.total_assets),
            liabilities = format_currency(self.totals.total_liabilities),
            net_worth = format_currency(self.totals.net_worth),
            window = SPENDING_WINDOW_DAYS,
        )
    }
}

/// Build the model context for a snapshot as of `today`
pub fn build_context(snapshot: &Snapshot, today: NaiveDate) -> String {
    if snapshot.is_empty() {
        return NO_ACCOUNTS_CONTEXT.to_string();
    }
    FinancialSummary::from_snapshot(snapshot, today).render()
}

/// Sum outflows per category over the trailing 30 days, `(today - 30 days, today]`
///
/// Sorted by amount descending, ties by category name, truncated to the top 10.
pub fn spending_by_category(transactions: &[Transaction], today: NaiveDate) -> Vec<CategorySpending> {
    let since = today - Duration::days(SPENDING_WINDOW_DAYS);

    let mut totals: HashMap<&str, f64> = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|t| t.is_outflow() && t.date > since && t.date <= today)
    {
        *totals.entry(tx.category.as_str()).or_insert(0.0) += tx.amount;
    }

    let mut spending: Vec<CategorySpending> = totals
        .into_iter()
        .map(|(category, amount)| CategorySpending {
            category: category.to_string(),
            amount,
        })
        .collect();
    spending.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    spending.truncate(MAX_SPENDING_CATEGORIES);
    spending
}

fn account_line(account: &Account) -> String {
    let kind = match account.subtype.as_deref() {
        Some(subtype) if !subtype.is_empty() => format!("{}/{}", account.account_type, subtype),
        _ => account.account_type.to_string(),
    };
    let balance = account
        .balances
        .current
        .map(format_currency)
        .unwrap_or_else(|| "N/A".to_string());
    let limit = account
        .balances
        .limit
        .map(|l| format!(", Limit: {}", format_currency(l)))
        .unwrap_or_default();

    format!("- {} ({}): Balance {}{}", account.name, kind, balance, limit)
}

fn transaction_line(tx: &Transaction) -> String {
    let direction = if tx.is_outflow() { "outflow" } else { "inflow" };
    format!(
        "- {}: {} {} {} ({})",
        tx.date,
        tx.name,
        direction,
        format_currency(tx.amount.abs()),
        tx.category
    )
}

/// Render a dollar amount with thousands separators and two decimals
///
/// `1234.5` becomes `$1,234.50`; negatives become `-$1,234.50`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = cents / 100;
    let fraction = cents % 100;

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, Balances};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(name: &str, account_type: AccountType, current: Option<f64>, limit: Option<f64>) -> Account {
        Account {
            id: name.to_lowercase(),
            name: name.to_string(),
            official_name: None,
            account_type,
            subtype: Some("checking".to_string()),
            mask: None,
            balances: Balances {
                current,
                limit,
                ..Default::default()
            },
        }
    }

    fn tx(name: &str, date: NaiveDate, amount: f64, category: &str) -> Transaction {
        Transaction {
            id: name.to_string(),
            account_id: "acc".to_string(),
            date,
            name: name.to_string(),
            merchant_name: None,
            amount,
            category: category.to_string(),
            pending: false,
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(42.5), "$42.50");
        assert_eq!(format_currency(1234.567), "$1,234.57");
        assert_eq!(format_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency(-2500.0), "-$2,500.00");
        assert_eq!(format_currency(-0.001), "$0.00");
    }

    #[test]
    fn test_empty_snapshot_returns_fixed_sentence() {
        let snapshot = Snapshot {
            transactions: vec![tx("Orphan", date(2024, 1, 5), 10.0, "Other")],
            ..Default::default()
        };
        assert_eq!(build_context(&snapshot, date(2024, 1, 10)), NO_ACCOUNTS_CONTEXT);
    }

    #[test]
    fn test_sections_in_order() {
        let snapshot = Snapshot {
            accounts: vec![
                account("Checking", AccountType::Depository, Some(2500.0), None),
                account("Card", AccountType::Credit, Some(300.0), Some(5000.0)),
            ],
            ..Default::default()
        };
        let context = build_context(&snapshot, date(2024, 1, 10));

        let accounts = context.find("ACCOUNTS:").unwrap();
        let overview = context.find("FINANCIAL OVERVIEW:").unwrap();
        let spending = context.find("SPENDING BY CATEGORY (Last 30 Days):").unwrap();
        let recent = context.find("RECENT TRANSACTIONS:").unwrap();
        assert!(accounts < overview && overview < spending && spending < recent);

        assert!(context.contains("- Card (credit/checking): Balance $300.00, Limit: $5,000.00"));
        assert!(context.contains("Net Worth: $2,200.00"));
        assert!(context.contains("No spending data available"));
        assert!(context.contains("No recent transactions"));
    }

    #[test]
    fn test_missing_balance_renders_na() {
        let snapshot = Snapshot {
            accounts: vec![account("Mystery", AccountType::Other, None, None)],
            ..Default::default()
        };
        let context = build_context(&snapshot, date(2024, 1, 10));
        assert!(context.contains("- Mystery (other/checking): Balance N/A"));
    }

    #[test]
    fn test_spending_window_and_sign() {
        let today = date(2024, 3, 31);
        let txs = vec![
            tx("Groceries", date(2024, 3, 30), 80.0, "FOOD_AND_DRINK"),
            tx("Dinner", date(2024, 3, 2), 20.0, "FOOD_AND_DRINK"),
            tx("Paycheck", date(2024, 3, 15), -3000.0, "INCOME"),
            tx("Old trip", date(2024, 2, 20), 900.0, "TRAVEL"),
            tx("Gas", date(2024, 3, 2), 40.0, "TRANSPORTATION"),
            tx("Parking", date(2024, 3, 1), 15.0, "TRANSPORTATION"),
        ];

        let spending = spending_by_category(&txs, today);
        assert_eq!(
            spending,
            vec![
                CategorySpending {
                    category: "FOOD_AND_DRINK".to_string(),
                    amount: 100.0
                },
                CategorySpending {
                    category: "TRANSPORTATION".to_string(),
                    amount: 40.0
                },
            ]
        );
    }

    #[test]
    fn test_spending_window_is_thirty_days() {
        let today = date(2024, 3, 31);
        let txs: Vec<Transaction> = (0..=30)
            .map(|i| {
                tx(
                    &format!("t{}", i),
                    today - Duration::days(i),
                    10.0,
                    "GENERAL_MERCHANDISE",
                )
            })
            .collect();

        let spending = spending_by_category(&txs, today);
        assert_eq!(spending.len(), 1);
        // today through today - 29; the day exactly 30 back is outside
        assert_eq!(spending[0].amount, 300.0);
    }

    #[test]
    fn test_spending_truncated_to_ten() {
        let today = date(2024, 3, 31);
        let txs: Vec<Transaction> = (0..14)
            .map(|i| tx(&format!("t{}", i), today, 10.0 + i as f64, &format!("CAT_{:02}", i)))
            .collect();

        let spending = spending_by_category(&txs, today);
        assert_eq!(spending.len(), MAX_SPENDING_CATEGORIES);
        assert_eq!(spending[0].category, "CAT_13");
        assert!(spending.windows(2).all(|w| w[0].amount >= w[1].amount));
    }

    #[test]
    fn test_recent_transactions_limited_and_directional() {
        let today = date(2024, 1, 31);
        let mut txs = vec![
            tx("Coffee Shop", date(2024, 1, 5), 42.5, "FOOD_AND_DRINK"),
            tx("Refund", date(2024, 1, 5), -20.0, "TRANSFER_IN"),
        ];
        for i in 0..20 {
            txs.push(tx(&format!("Filler {}", i), date(2024, 1, 1), 1.0, "Other"));
        }
        let snapshot = Snapshot {
            accounts: vec![account("Checking", AccountType::Depository, Some(10.0), None)],
            transactions: txs,
            ..Default::default()
        };

        let context = build_context(&snapshot, today);
        assert!(context.contains("- 2024-01-05: Coffee Shop outflow $42.50 (FOOD_AND_DRINK)"));
        assert!(context.contains("- 2024-01-05: Refund inflow $20.00 (TRANSFER_IN)"));

        let recent = &context[context.find("RECENT TRANSACTIONS:").unwrap()..];
        assert_eq!(recent.lines().count() - 1, MAX_RECENT_TRANSACTIONS);
    }
}
