//! Test Utilities Crate
//!
//! Shared test infrastructure for the settlement test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for vendors, orders, invoices and payments
//! - `database`: PostgreSQL test containers with the settlement schema applied
//! - `assertions`: Assertion helpers for money, journal entries and vendor ledgers
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
