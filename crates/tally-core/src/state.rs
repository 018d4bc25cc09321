//! Shared snapshot cell
//!
//! Owns the process-wide [`Snapshot`]. Readers get a point-in-time `Arc`
//! copy; a refresh builds a complete new snapshot off to the side and swaps
//! it in once the pass has finished. Refresh passes are serialized, so an
//! overlapping trigger waits for the in-flight pass and then runs its own.

use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::credentials::Credential;
use crate::models::Snapshot;

#[derive(Default)]
pub struct SnapshotCell {
    current: RwLock<Arc<Snapshot>>,
    refresh_lock: Mutex<()>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of the latest snapshot
    pub fn current(&self) -> Arc<Snapshot> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the snapshot wholesale
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot.clone(),
            Err(poisoned) => *poisoned.into_inner() = snapshot.clone(),
        }
        snapshot
    }

    /// Run one aggregation pass and publish its result
    pub async fn refresh(&self, aggregator: &Aggregator, credentials: &[Credential]) -> Arc<Snapshot> {
        let _pass = self.refresh_lock.lock().await;
        debug!(connections = credentials.len(), "Starting refresh pass");
        let snapshot = aggregator.aggregate(credentials).await;
        self.replace(snapshot)
    }

    /// Whether a refresh pass is currently running
    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{Account, AccountType, Balances, Transaction};
    use crate::provider::{LinkProvider, MockItem, MockProvider};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn account(id: &str) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            official_name: None,
            account_type: AccountType::Depository,
            subtype: None,
            mask: None,
            balances: Balances::default(),
        }
    }

    #[test]
    fn test_starts_empty() {
        let cell = SnapshotCell::new();
        assert!(cell.current().is_empty());
        assert!(!cell.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let provider = MockProvider::new()
            .with_item("access-a", MockItem::new(vec![account("a1")], vec![]));
        let aggregator = Aggregator::new(Arc::new(provider));
        let cell = SnapshotCell::new();

        let before = cell.current();
        let after = cell
            .refresh(&aggregator, &[Credential::new("access-a")])
            .await;

        assert!(before.is_empty());
        assert_eq!(after.accounts.len(), 1);
        assert_eq!(cell.current().accounts.len(), 1);

        // A later pass with no credentials replaces rather than merges
        cell.refresh(&aggregator, &[]).await;
        assert!(cell.current().is_empty());
    }

    /// Provider that records how many account fetches run at once
    #[derive(Default)]
    struct CountingProvider {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl LinkProvider for CountingProvider {
        async fn create_link_token(&self) -> Result<String> {
            Ok("link-test".to_string())
        }

        async fn exchange_public_token(&self, public_token: &str) -> Result<Credential> {
            Ok(Credential::new(public_token))
        }

        async fn get_accounts(&self, _credential: &Credential) -> Result<Vec<Account>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![account("a1")])
        }

        async fn get_item_institution_id(&self, _credential: &Credential) -> Result<Option<String>> {
            Ok(None)
        }

        async fn get_institution_name(&self, institution_id: &str) -> Result<String> {
            Ok(institution_id.to_string())
        }

        async fn get_transactions(
            &self,
            _credential: &Credential,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Transaction>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "concurrency"
        }
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_serialize() {
        let provider = Arc::new(CountingProvider::default());
        let aggregator = Aggregator::new(provider.clone());
        let cell = SnapshotCell::new();
        let creds = vec![Credential::new("access-a")];

        let (a, b) = tokio::join!(
            cell.refresh(&aggregator, &creds),
            cell.refresh(&aggregator, &creds)
        );

        assert_eq!(a.accounts.len(), 1);
        assert_eq!(b.accounts.len(), 1);
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!cell.is_refreshing());
    }
}
