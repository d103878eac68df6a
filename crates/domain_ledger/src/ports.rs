//! Ledger Domain Ports
//!
//! The `LedgerPort` trait is everything the journal engine, period guard and
//! vendor ledger book need from storage. Each method is a single-record
//! read or write; there are no multi-record transactions, so cross-record
//! consistency is the caller's concern.
//!
//! # Adapters
//!
//! - **PostgreSQL**: `infra_db::PostgresLedgerAdapter`
//! - **Mock**: [`mock::MockLedgerPort`], in-memory, for tests
//!
//! # Usage
//!
//! ```rust,ignore
//! let port: Arc<dyn LedgerPort> = Arc::new(PostgresLedgerAdapter::new(pool));
//! LedgerBootstrap::new(port.clone(), Currency::USD).initialize().await?;
//! let engine = JournalEngine::new(port, Currency::USD);
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, Money, PortError, VendorId};

use crate::account::{Account, AccountCode};
use crate::engine::JournalQuery;
use crate::journal::JournalEntry;
use crate::period::{AccountingPeriod, PeriodKey};
use crate::vendor_ledger::VendorLedger;

/// Storage contract for the ledger domain
#[async_trait]
pub trait LedgerPort: DomainPort + HealthCheckable {
    // ========================================================================
    // Chart of accounts
    // ========================================================================

    async fn get_account(&self, code: AccountCode) -> Result<Option<Account>, PortError>;

    /// All seeded accounts, ordered by code
    async fn list_accounts(&self) -> Result<Vec<Account>, PortError>;

    /// Inserts an account; `PortError::Conflict` if the code already exists
    async fn insert_account(&self, account: &Account) -> Result<(), PortError>;

    /// Adds `delta` to the account's balance in one atomic update
    ///
    /// Returns the account with its new balance.
    async fn apply_balance_delta(&self, code: AccountCode, delta: Money) -> Result<Account, PortError>;

    // ========================================================================
    // Journal
    // ========================================================================

    async fn insert_journal_entry(&self, entry: &JournalEntry) -> Result<(), PortError>;

    /// Entries matching the query, oldest first
    async fn list_journal_entries(&self, query: &JournalQuery) -> Result<Vec<JournalEntry>, PortError>;

    // ========================================================================
    // Periods
    // ========================================================================

    async fn get_period(&self, key: PeriodKey) -> Result<Option<AccountingPeriod>, PortError>;

    async fn upsert_period(&self, period: &AccountingPeriod) -> Result<(), PortError>;

    async fn list_periods(&self) -> Result<Vec<AccountingPeriod>, PortError>;

    // ========================================================================
    // Vendor ledgers
    // ========================================================================

    async fn get_vendor_ledger(&self, vendor_id: VendorId) -> Result<Option<VendorLedger>, PortError>;

    /// Replaces the vendor's ledger document
    async fn save_vendor_ledger(&self, ledger: &VendorLedger) -> Result<(), PortError>;
}

/// Mock implementation of LedgerPort for testing
///
/// Stores everything in memory behind `RwLock`s.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    /// In-memory mock implementation of LedgerPort
    #[derive(Debug, Default)]
    pub struct MockLedgerPort {
        accounts: Arc<RwLock<BTreeMap<AccountCode, Account>>>,
        entries: Arc<RwLock<Vec<JournalEntry>>>,
        periods: Arc<RwLock<HashMap<PeriodKey, AccountingPeriod>>>,
        vendor_ledgers: Arc<RwLock<HashMap<VendorId, VendorLedger>>>,
        fail_writes: AtomicBool,
    }

    impl MockLedgerPort {
        /// Creates a new empty mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent write fail with a connection error
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Number of journal entries stored
        pub async fn entry_count(&self) -> usize {
            self.entries.read().await.len()
        }

        fn check_writable(&self) -> Result<(), PortError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock ledger store unavailable"));
            }
            Ok(())
        }
    }

    impl DomainPort for MockLedgerPort {}

    #[async_trait]
    impl HealthCheckable for MockLedgerPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-ledger-port")
        }
    }

    #[async_trait]
    impl LedgerPort for MockLedgerPort {
        async fn get_account(&self, code: AccountCode) -> Result<Option<Account>, PortError> {
            Ok(self.accounts.read().await.get(&code).cloned())
        }

        async fn list_accounts(&self) -> Result<Vec<Account>, PortError> {
            Ok(self.accounts.read().await.values().cloned().collect())
        }

        async fn insert_account(&self, account: &Account) -> Result<(), PortError> {
            self.check_writable()?;
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&account.code) {
                return Err(PortError::conflict(format!("account {} already exists", account.code)));
            }
            accounts.insert(account.code, account.clone());
            Ok(())
        }

        async fn apply_balance_delta(&self, code: AccountCode, delta: Money) -> Result<Account, PortError> {
            self.check_writable()?;
            let mut accounts = self.accounts.write().await;
            let account = accounts
                .get_mut(&code)
                .ok_or_else(|| PortError::not_found("Account", code))?;
            account.balance = account
                .balance
                .checked_add(&delta)
                .map_err(|e| PortError::validation(e.to_string()))?;
            Ok(account.clone())
        }

        async fn insert_journal_entry(&self, entry: &JournalEntry) -> Result<(), PortError> {
            self.check_writable()?;
            self.entries.write().await.push(entry.clone());
            Ok(())
        }

        async fn list_journal_entries(&self, query: &JournalQuery) -> Result<Vec<JournalEntry>, PortError> {
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .filter(|e| query.matches(e))
                .cloned()
                .collect())
        }

        async fn get_period(&self, key: PeriodKey) -> Result<Option<AccountingPeriod>, PortError> {
            Ok(self.periods.read().await.get(&key).cloned())
        }

        async fn upsert_period(&self, period: &AccountingPeriod) -> Result<(), PortError> {
            self.check_writable()?;
            self.periods.write().await.insert(period.key(), period.clone());
            Ok(())
        }

        async fn list_periods(&self) -> Result<Vec<AccountingPeriod>, PortError> {
            Ok(self.periods.read().await.values().cloned().collect())
        }

        async fn get_vendor_ledger(&self, vendor_id: VendorId) -> Result<Option<VendorLedger>, PortError> {
            Ok(self.vendor_ledgers.read().await.get(&vendor_id).cloned())
        }

        async fn save_vendor_ledger(&self, ledger: &VendorLedger) -> Result<(), PortError> {
            self.check_writable()?;
            self.vendor_ledgers.write().await.insert(ledger.vendor_id, ledger.clone());
            Ok(())
        }
    }
}
