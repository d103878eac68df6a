//! Kernel types shared by the ledger and payables domains
//!
//! - [`Money`] and [`Currency`]: checked decimal amounts
//! - Typed identifiers, one per persisted record, plus the acting [`Actor`]
//! - [`PortError`] and the health-check contract every storage adapter meets

pub mod error;
pub mod identifiers;
pub mod money;
pub mod ports;

pub use error::CoreError;
pub use identifiers::{
    AccountId, AccrualId, Actor, AdjustmentId, AuditEventId, BatchId, InvoiceId, JournalEntryId,
    LedgerEntryId, PaymentId, PurchaseOrderId, TransactionId, VendorId,
};
pub use money::{Currency, Money, MoneyError, Rate};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
