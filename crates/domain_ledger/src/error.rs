//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{MoneyError, PortError};

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Account code is not part of the chart of accounts
    #[error("Unknown account code: {0}")]
    UnknownAccount(String),

    /// Account is in the chart but has not been seeded into storage
    #[error("Account {0} has not been initialized; run ledger bootstrap first")]
    AccountNotInitialized(String),

    /// Entry has no lines
    #[error("Journal entry must have at least one line")]
    EmptyEntry,

    /// Entry is not balanced
    #[error("Unbalanced journal entry: debits={debits}, credits={credits}")]
    UnbalancedEntry {
        debits: Decimal,
        credits: Decimal,
    },

    /// A single line is malformed
    #[error("Invalid journal line: {0}")]
    InvalidLine(String),

    /// Month outside 1..=12 or similar
    #[error("Invalid accounting period: {0}")]
    InvalidPeriod(String),

    /// Arithmetic error
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage failure
    #[error(transparent)]
    Port(#[from] PortError),
}
