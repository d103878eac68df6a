//! PostgreSQL Ledger Adapter
//!
//! Implements `LedgerPort` over the `accounts`, `journal_entries`,
//! `accounting_periods` and `vendor_ledgers` tables. Records are stored as
//! JSONB documents; the scalar columns exist for filtering and keys.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, Money, PortError, VendorId};
use domain_ledger::{
    Account, AccountCode, AccountingPeriod, JournalEntry, JournalQuery, JournalReference,
    LedgerPort, PeriodKey, VendorLedger,
};

use crate::adapters::probe;
use crate::error::DatabaseError;

/// PostgreSQL-backed implementation of `LedgerPort`
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    pool: PgPool,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        probe(&self.pool, "postgres-ledger-adapter").await
    }
}

fn reference_uuid(reference: &JournalReference) -> Uuid {
    match reference {
        JournalReference::Invoice(id) => *id.as_uuid(),
        JournalReference::Payment(id) => *id.as_uuid(),
        JournalReference::Adjustment(id) => *id.as_uuid(),
        JournalReference::Accrual(id) => *id.as_uuid(),
        JournalReference::Batch(id) => *id.as_uuid(),
    }
}

#[async_trait]
impl LedgerPort for PostgresLedgerAdapter {
    async fn get_account(&self, code: AccountCode) -> Result<Option<Account>, PortError> {
        let row = sqlx::query_scalar::<_, Json<Account>>("SELECT doc FROM accounts WHERE code = $1")
            .bind(code.code())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(row.map(|Json(account)| account))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, PortError> {
        let rows = sqlx::query_scalar::<_, Json<Account>>("SELECT doc FROM accounts ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(rows.into_iter().map(|Json(account)| account).collect())
    }

    #[instrument(skip_all, fields(code = %account.code))]
    async fn insert_account(&self, account: &Account) -> Result<(), PortError> {
        sqlx::query("INSERT INTO accounts (code, doc) VALUES ($1, $2)")
            .bind(account.code.code())
            .bind(Json(account))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Row-locks the account for the read-modify-write so concurrent
    /// postings serialize on it
    #[instrument(skip(self), fields(code = %code, delta = %delta))]
    async fn apply_balance_delta(&self, code: AccountCode, delta: Money) -> Result<Account, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let Json(mut account) = sqlx::query_scalar::<_, Json<Account>>(
            "SELECT doc FROM accounts WHERE code = $1 FOR UPDATE",
        )
        .bind(code.code())
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| PortError::not_found("Account", code))?;

        account.balance = account
            .balance
            .checked_add(&delta)
            .map_err(|e| PortError::validation(e.to_string()))?;

        sqlx::query("UPDATE accounts SET doc = $2 WHERE code = $1")
            .bind(code.code())
            .bind(Json(&account))
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from)?;
        tx.commit().await.map_err(DatabaseError::from)?;

        debug!(balance = %account.balance, "Account balance updated");
        Ok(account)
    }

    #[instrument(skip_all, fields(entry_id = %entry.id, reference = %entry.reference))]
    async fn insert_journal_entry(&self, entry: &JournalEntry) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO journal_entries (
                id, reference_kind, reference_id, entry_date,
                period_year, period_month, created_at, doc
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*entry.id.as_uuid())
        .bind(entry.reference.kind().as_str())
        .bind(reference_uuid(&entry.reference))
        .bind(entry.entry_date)
        .bind(entry.period_year)
        .bind(entry.period_month as i32)
        .bind(entry.created_at)
        .bind(Json(entry))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn list_journal_entries(&self, query: &JournalQuery) -> Result<Vec<JournalEntry>, PortError> {
        let kind = query
            .reference
            .map(|r| r.kind())
            .or(query.kind)
            .map(|k| k.as_str());
        let rows = sqlx::query_scalar::<_, Json<JournalEntry>>(
            r#"
            SELECT doc FROM journal_entries
            WHERE ($1::text IS NULL OR reference_kind = $1)
              AND ($2::uuid IS NULL OR reference_id = $2)
              AND ($3::int IS NULL OR period_month = $3)
              AND ($4::int IS NULL OR period_year = $4)
            ORDER BY created_at, id
            "#,
        )
        .bind(kind)
        .bind(query.reference.as_ref().map(reference_uuid))
        .bind(query.month.map(|m| m as i32))
        .bind(query.year)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows
            .into_iter()
            .map(|Json(entry)| entry)
            .filter(|entry| query.matches(entry))
            .collect())
    }

    async fn get_period(&self, key: PeriodKey) -> Result<Option<AccountingPeriod>, PortError> {
        let row = sqlx::query_scalar::<_, Json<AccountingPeriod>>(
            "SELECT doc FROM accounting_periods WHERE period_year = $1 AND period_month = $2",
        )
        .bind(key.year)
        .bind(key.month as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(row.map(|Json(period)| period))
    }

    #[instrument(skip_all, fields(period = %period.key(), closed = period.is_closed))]
    async fn upsert_period(&self, period: &AccountingPeriod) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO accounting_periods (period_year, period_month, is_closed, doc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (period_year, period_month)
            DO UPDATE SET is_closed = EXCLUDED.is_closed, doc = EXCLUDED.doc
            "#,
        )
        .bind(period.year)
        .bind(period.month as i32)
        .bind(period.is_closed)
        .bind(Json(period))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn list_periods(&self) -> Result<Vec<AccountingPeriod>, PortError> {
        let rows = sqlx::query_scalar::<_, Json<AccountingPeriod>>(
            "SELECT doc FROM accounting_periods ORDER BY period_year, period_month",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(rows.into_iter().map(|Json(period)| period).collect())
    }

    async fn get_vendor_ledger(&self, vendor_id: VendorId) -> Result<Option<VendorLedger>, PortError> {
        let row = sqlx::query_scalar::<_, Json<VendorLedger>>(
            "SELECT doc FROM vendor_ledgers WHERE vendor_id = $1",
        )
        .bind(*vendor_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(row.map(|Json(ledger)| ledger))
    }

    #[instrument(skip_all, fields(vendor_id = %ledger.vendor_id, entries = ledger.entries.len()))]
    async fn save_vendor_ledger(&self, ledger: &VendorLedger) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO vendor_ledgers (vendor_id, updated_at, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (vendor_id)
            DO UPDATE SET updated_at = EXCLUDED.updated_at, doc = EXCLUDED.doc
            "#,
        )
        .bind(*ledger.vendor_id.as_uuid())
        .bind(ledger.updated_at)
        .bind(Json(ledger))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }
}
