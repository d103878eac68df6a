//! Per-vendor running ledgers
//!
//! A vendor ledger is an append-only log of what was invoiced, paid,
//! credited and debited, with running totals. It is derived state: the
//! same ledger can be rebuilt at any time by replaying the vendor's
//! invoices, payments and adjustments.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use core_kernel::{Currency, LedgerEntryId, Money, VendorId};
use crate::error::LedgerError;
use crate::journal::JournalReference;
use crate::ports::LedgerPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VendorLedgerEntryType {
    Invoice,
    Payment,
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorLedgerEntry {
    pub id: LedgerEntryId,
    pub entry_type: VendorLedgerEntryType,
    pub reference: JournalReference,
    pub amount: Money,
    pub description: String,
    /// Outstanding balance after this entry was applied
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}

/// A historical fact replayed when rebuilding a ledger
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEvent {
    pub entry_type: VendorLedgerEntryType,
    pub reference: JournalReference,
    pub amount: Money,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Running position of one vendor
///
/// # Invariants
///
/// - `total_outstanding = total_invoiced - total_paid - credit_balance + debit_balance`
/// - Entries are only ever appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorLedger {
    pub vendor_id: VendorId,
    pub currency: Currency,
    pub total_invoiced: Money,
    pub total_paid: Money,
    pub credit_balance: Money,
    pub debit_balance: Money,
    pub total_outstanding: Money,
    pub entries: Vec<VendorLedgerEntry>,
    pub updated_at: DateTime<Utc>,
}

impl VendorLedger {
    pub fn new(vendor_id: VendorId, currency: Currency) -> Self {
        Self {
            vendor_id,
            currency,
            total_invoiced: Money::zero(currency),
            total_paid: Money::zero(currency),
            credit_balance: Money::zero(currency),
            debit_balance: Money::zero(currency),
            total_outstanding: Money::zero(currency),
            entries: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Appends an entry and updates the running totals
    pub fn apply(
        &mut self,
        entry_type: VendorLedgerEntryType,
        reference: JournalReference,
        amount: Money,
        description: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<&VendorLedgerEntry, LedgerError> {
        if amount.currency() != self.currency {
            return Err(core_kernel::MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                amount.currency().to_string(),
            )
            .into());
        }
        if amount.is_negative() {
            return Err(LedgerError::InvalidLine(format!(
                "vendor ledger amount must not be negative, got {}",
                amount
            )));
        }

        let total = match entry_type {
            VendorLedgerEntryType::Invoice => &mut self.total_invoiced,
            VendorLedgerEntryType::Payment => &mut self.total_paid,
            VendorLedgerEntryType::Credit => &mut self.credit_balance,
            VendorLedgerEntryType::Debit => &mut self.debit_balance,
        };
        *total = total.checked_add(&amount)?;
        self.total_outstanding = self.expected_outstanding()?;
        self.updated_at = at;

        self.entries.push(VendorLedgerEntry {
            id: LedgerEntryId::new_v7(),
            entry_type,
            reference,
            amount,
            description: description.into(),
            balance_after: self.total_outstanding,
            created_at: at,
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Rebuilds a ledger from history, replaying events in time order
    pub fn rebuild(
        vendor_id: VendorId,
        currency: Currency,
        events: impl IntoIterator<Item = LedgerEvent>,
    ) -> Result<Self, LedgerError> {
        let mut events: Vec<LedgerEvent> = events.into_iter().collect();
        events.sort_by_key(|e| e.occurred_at);

        let mut ledger = Self::new(vendor_id, currency);
        for event in events {
            ledger.apply(
                event.entry_type,
                event.reference,
                event.amount,
                event.description,
                event.occurred_at,
            )?;
        }
        Ok(ledger)
    }

    fn expected_outstanding(&self) -> Result<Money, LedgerError> {
        Ok(self
            .total_invoiced
            .checked_sub(&self.total_paid)?
            .checked_sub(&self.credit_balance)?
            .checked_add(&self.debit_balance)?)
    }

    /// Checks the outstanding formula and that totals match the entry log
    pub fn is_consistent(&self) -> bool {
        let tolerance = dec!(0.01);
        let sum_of = |kind: VendorLedgerEntryType| {
            Money::sum(
                self.currency,
                self.entries.iter().filter(|e| e.entry_type == kind).map(|e| &e.amount),
            )
        };

        let checks = [
            (sum_of(VendorLedgerEntryType::Invoice), self.total_invoiced),
            (sum_of(VendorLedgerEntryType::Payment), self.total_paid),
            (sum_of(VendorLedgerEntryType::Credit), self.credit_balance),
            (sum_of(VendorLedgerEntryType::Debit), self.debit_balance),
        ];
        let totals_match = checks
            .iter()
            .all(|(sum, total)| matches!(sum, Ok(s) if s.approx_eq(total, tolerance)));

        totals_match
            && matches!(self.expected_outstanding(), Ok(o) if o.approx_eq(&self.total_outstanding, tolerance))
    }
}

/// Storage-backed access to vendor ledgers
#[derive(Clone)]
pub struct VendorLedgerBook {
    port: Arc<dyn LedgerPort>,
    currency: Currency,
}

impl VendorLedgerBook {
    pub fn new(port: Arc<dyn LedgerPort>, currency: Currency) -> Self {
        Self { port, currency }
    }

    /// Appends one entry, creating the ledger on first use
    pub async fn append(
        &self,
        vendor_id: VendorId,
        entry_type: VendorLedgerEntryType,
        reference: JournalReference,
        amount: Money,
        description: impl Into<String>,
    ) -> Result<VendorLedger, LedgerError> {
        let mut ledger = self
            .port
            .get_vendor_ledger(vendor_id)
            .await?
            .unwrap_or_else(|| VendorLedger::new(vendor_id, self.currency));

        ledger.apply(entry_type, reference, amount, description, Utc::now())?;
        self.port.save_vendor_ledger(&ledger).await?;

        debug!(
            vendor_id = %vendor_id,
            entry_type = ?entry_type,
            amount = %amount,
            outstanding = %ledger.total_outstanding,
            "Vendor ledger entry appended"
        );
        Ok(ledger)
    }

    pub async fn get(&self, vendor_id: VendorId) -> Result<Option<VendorLedger>, LedgerError> {
        Ok(self.port.get_vendor_ledger(vendor_id).await?)
    }

    /// Replaces the stored ledger with one rebuilt from `events`
    pub async fn rebuild(
        &self,
        vendor_id: VendorId,
        events: impl IntoIterator<Item = LedgerEvent>,
    ) -> Result<VendorLedger, LedgerError> {
        let ledger = VendorLedger::rebuild(vendor_id, self.currency, events)?;
        self.port.save_vendor_ledger(&ledger).await?;

        info!(
            vendor_id = %vendor_id,
            entries = ledger.entries.len(),
            outstanding = %ledger.total_outstanding,
            "Vendor ledger rebuilt from history"
        );
        Ok(ledger)
    }
}
