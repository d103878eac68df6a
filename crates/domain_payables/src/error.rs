//! Settlement domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};
use domain_ledger::LedgerError;

/// Errors returned by the settlement services
///
/// Every variant carries a human-readable reason suitable for returning to
/// the caller as-is.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Bad input or a business rule rejected the request
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The record is not in a state that allows the operation
    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Port(PortError),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl SettlementError {
    pub fn validation(message: impl Into<String>) -> Self {
        SettlementError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        SettlementError::StateConflict(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        SettlementError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True for storage failures worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            SettlementError::Port(e) => e.is_transient(),
            SettlementError::Ledger(LedgerError::Port(e)) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<PortError> for SettlementError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => SettlementError::NotFound { entity: entity_type, id },
            PortError::Validation { message, .. } => SettlementError::Validation(message),
            other => SettlementError::Port(other),
        }
    }
}
