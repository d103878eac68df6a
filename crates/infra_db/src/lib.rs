//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the settlement ports, built on SQLx.
//!
//! # Storage model
//!
//! Each record is one JSONB document keyed by its id. Beside the document,
//! each table carries the scalar columns the ports filter, order or
//! constrain on:
//!
//! - `invoices.version` drives the compare-and-swap in `save_invoice`
//! - `invoices (vendor_id, invoice_number)` and `payments.transaction_id`
//!   are unique, so duplicates surface as `PortError::Conflict`
//! - `accounts` rows are locked `FOR UPDATE` while a balance delta applies
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresPayablesAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/settlement")).await?;
//! run_migrations(&pool).await?;
//! let payables = PostgresPayablesAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;

pub use adapters::{PostgresAuditSink, PostgresLedgerAdapter, PostgresPayablesAdapter};
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
