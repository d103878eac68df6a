//! Port adapters
//!
//! PostgreSQL implementations of the domain ports. Each adapter owns a
//! clone of the shared pool.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::adapters::{PostgresLedgerAdapter, PostgresPayablesAdapter};
//!
//! let ledger: Arc<dyn LedgerPort> = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
//! let payables: Arc<dyn PayablesPort> = Arc::new(PostgresPayablesAdapter::new(pool));
//! ```

pub mod audit;
pub mod ledger;
pub mod payables;

pub use audit::PostgresAuditSink;
pub use ledger::PostgresLedgerAdapter;
pub use payables::PostgresPayablesAdapter;

use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;

use core_kernel::{AdapterHealth, HealthCheckResult};

/// Round-trips `SELECT 1` and reports the latency
pub(crate) async fn probe(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };
    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}
