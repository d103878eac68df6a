//! Throwaway PostgreSQL for adapter tests
//!
//! Each [`TestDatabase`] owns a container started from the official image
//! with the settlement schema loaded. Dropping it stops the container.
//! Docker must be available, so suites using it mark their tests `#[ignore]`.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

const IMAGE_TAG: &str = "16-alpine";
const DB_USER: &str = "settlement";
const DB_PASSWORD: &str = "settlement";
const DB_NAME: &str = "settlement_test";

/// The settlement schema, as shipped in the workspace migrations
pub const SETTLEMENT_SCHEMA: &str = include_str!("../../../migrations/0001_settlement.sql");

/// Every table the schema creates, dependants first
pub const SETTLEMENT_TABLES: &[&str] = &[
    "audit_events",
    "batch_payments",
    "accruals",
    "adjustments",
    "payments",
    "invoices",
    "purchase_orders",
    "vendors",
    "vendor_ledgers",
    "accounting_periods",
    "journal_entries",
    "accounts",
];

pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub fn connection_url(host: &str, port: u16) -> String {
    format!("postgres://{DB_USER}:{DB_PASSWORD}@{host}:{port}/{DB_NAME}")
}

pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    url: String,
    pool: PgPool,
}

impl TestDatabase {
    /// Starts a container and loads the schema into it
    pub async fn new() -> TestResult<Self> {
        let container = Postgres::default()
            .with_user(DB_USER)
            .with_password(DB_PASSWORD)
            .with_db_name(DB_NAME)
            .with_tag(IMAGE_TAG)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(5432).await?;
        let url = connection_url(&host, port);

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(20))
            .connect(&url)
            .await?;
        sqlx::raw_sql(SETTLEMENT_SCHEMA).execute(&pool).await?;

        Ok(Self {
            _container: container,
            url,
            pool,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Empties every settlement table, keeping the schema
    pub async fn truncate_all(&self) -> TestResult<()> {
        let statement = format!("TRUNCATE TABLE {} CASCADE", SETTLEMENT_TABLES.join(", "));
        sqlx::query(&statement).execute(&self.pool).await?;
        Ok(())
    }

    /// Rows in one settlement table; other names are refused
    pub async fn row_count(&self, table: &str) -> TestResult<i64> {
        if !SETTLEMENT_TABLES.contains(&table) {
            return Err(format!("{} is not a settlement table", table).into());
        }
        let rows = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(rows)
    }
}
