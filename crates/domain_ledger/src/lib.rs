//! Ledger Domain - Double-Entry Journal and Vendor Ledgers
//!
//! This crate keeps the books for procurement settlement. Every financial
//! event (invoice intake, payment, adjustment, accrual) is recorded as a
//! balanced journal entry against a small fixed chart of accounts, and
//! mirrored into a per-vendor running ledger.
//!
//! # Double-Entry Accounting Principles
//!
//! - Every entry carries lines whose debits equal its credits (within 0.01)
//! - An account's balance is the signed sum `debit - credit` of its postings
//! - Entries are immutable; corrections are new entries
//!
//! # Period Locking
//!
//! The [`PeriodGuard`] tracks closed calendar months. Posting into a closed
//! month is suppressed: the engine logs a warning and returns
//! [`PostOutcome::Suppressed`] instead of failing, so the business
//! transaction that triggered the posting still completes.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{JournalEngine, JournalReference, JournalTemplates};
//!
//! let lines = JournalTemplates::payment(settled, discount)?;
//! let outcome = engine
//!     .post(JournalReference::Payment(payment.id), "Payment settled", lines, &actor, today)
//!     .await?;
//! ```

pub mod account;
pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod journal;
pub mod period;
pub mod ports;
pub mod vendor_ledger;

pub use account::{Account, AccountCode, AccountType, ChartOfAccounts};
pub use bootstrap::LedgerBootstrap;
pub use engine::{JournalEngine, JournalQuery, PostOutcome, TrialBalance, TrialBalanceLine};
pub use error::LedgerError;
pub use journal::{JournalEntry, JournalLine, JournalReference, JournalTemplates, AdjustmentKind, ReferenceKind};
pub use period::{AccountingPeriod, PeriodGuard, PeriodKey};
pub use ports::LedgerPort;
pub use vendor_ledger::{LedgerEvent, VendorLedger, VendorLedgerBook, VendorLedgerEntry, VendorLedgerEntryType};
