//! Startup seeding of the chart of accounts

use std::sync::Arc;

use tracing::info;

use core_kernel::Currency;
use crate::account::ChartOfAccounts;
use crate::error::LedgerError;
use crate::ports::LedgerPort;

/// Seeds any chart accounts missing from storage
///
/// Run once at startup, before the first posting. Safe to run repeatedly:
/// existing accounts and their balances are never touched.
pub struct LedgerBootstrap {
    port: Arc<dyn LedgerPort>,
    currency: Currency,
}

impl LedgerBootstrap {
    pub fn new(port: Arc<dyn LedgerPort>, currency: Currency) -> Self {
        Self { port, currency }
    }

    /// Returns the number of accounts created
    pub async fn initialize(&self) -> Result<usize, LedgerError> {
        let mut created = 0;
        for account in ChartOfAccounts::standard(self.currency) {
            if self.port.get_account(account.code).await?.is_some() {
                continue;
            }
            match self.port.insert_account(&account).await {
                Ok(()) => created += 1,
                // another instance seeded it first
                Err(e) if e.is_conflict() => {}
                Err(e) => return Err(e.into()),
            }
        }

        if created > 0 {
            info!(created, currency = %self.currency, "Chart of accounts seeded");
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::MockLedgerPort;

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let port = Arc::new(MockLedgerPort::new());
        let bootstrap = LedgerBootstrap::new(port.clone(), Currency::USD);

        assert_eq!(bootstrap.initialize().await.unwrap(), 8);
        assert_eq!(bootstrap.initialize().await.unwrap(), 0);
        assert_eq!(port.list_accounts().await.unwrap().len(), 8);
    }
}
