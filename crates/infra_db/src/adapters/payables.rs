//! PostgreSQL Payables Adapter
//!
//! Implements `PayablesPort` over the vendor, purchase order, invoice,
//! payment, adjustment, accrual and batch tables.
//!
//! # Invoice versioning
//!
//! `save_invoice` is a single conditional `UPDATE ... WHERE version = $n`.
//! When it touches no row the adapter looks the invoice up again to tell a
//! missing record (`NotFound`) from a lost race (`Conflict`).

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use core_kernel::{
    AccrualId, BatchId, DomainPort, HealthCheckResult, HealthCheckable, InvoiceId, PaymentId,
    PortError, PurchaseOrderId, VendorId,
};
use domain_payables::{
    Accrual, AccrualStatus, Adjustment, AdjustmentQuery, BatchPayment, Invoice, InvoiceQuery,
    PayablesPort, Payment, PaymentQuery, PurchaseOrder, Vendor,
};

use crate::adapters::probe;
use crate::error::DatabaseError;

/// PostgreSQL-backed implementation of `PayablesPort`
#[derive(Debug, Clone)]
pub struct PostgresPayablesAdapter {
    pool: PgPool,
}

impl PostgresPayablesAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresPayablesAdapter {}

#[async_trait]
impl HealthCheckable for PostgresPayablesAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        probe(&self.pool, "postgres-payables-adapter").await
    }
}

fn found<T>(row: Option<Json<T>>, entity: &str, id: impl std::fmt::Display) -> Result<T, PortError> {
    row.map(|Json(doc)| doc).ok_or_else(|| PortError::not_found(entity, id))
}

fn status_label(status: impl std::fmt::Debug) -> String {
    format!("{:?}", status)
}

#[async_trait]
impl PayablesPort for PostgresPayablesAdapter {
    async fn get_vendor(&self, id: VendorId) -> Result<Vendor, PortError> {
        let row = sqlx::query_scalar::<_, Json<Vendor>>("SELECT doc FROM vendors WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        found(row, "Vendor", id)
    }

    async fn save_vendor(&self, vendor: &Vendor) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO vendors (id, doc) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(*vendor.id.as_uuid())
        .bind(Json(vendor))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get_purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, PortError> {
        let row = sqlx::query_scalar::<_, Json<PurchaseOrder>>("SELECT doc FROM purchase_orders WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(row.map(|Json(order)| order))
    }

    async fn save_purchase_order(&self, order: &PurchaseOrder) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO purchase_orders (id, vendor_id, doc) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET vendor_id = EXCLUDED.vendor_id, doc = EXCLUDED.doc",
        )
        .bind(*order.id.as_uuid())
        .bind(*order.vendor_id.as_uuid())
        .bind(Json(order))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        let row = sqlx::query_scalar::<_, Json<Invoice>>("SELECT doc FROM invoices WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        found(row, "Invoice", id)
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
        let rows = sqlx::query_scalar::<_, Json<Invoice>>(
            "SELECT doc FROM invoices
             WHERE ($1::uuid IS NULL OR vendor_id = $1)
             ORDER BY created_at, id",
        )
        .bind(query.vendor_id.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows
            .into_iter()
            .map(|Json(invoice)| invoice)
            .filter(|invoice| query.matches(invoice))
            .collect())
    }

    #[instrument(skip_all, fields(invoice_id = %invoice.id, number = %invoice.invoice_number))]
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
        let stored = Invoice {
            version: 0,
            ..invoice.clone()
        };
        sqlx::query(
            "INSERT INTO invoices (id, invoice_number, vendor_id, version, created_at, doc)
             VALUES ($1, $2, $3, 0, $4, $5)",
        )
        .bind(*stored.id.as_uuid())
        .bind(&stored.invoice_number)
        .bind(*stored.vendor_id.as_uuid())
        .bind(stored.created_at)
        .bind(Json(&stored))
        .execute(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::DuplicateEntry(_) => {
                DatabaseError::duplicate("Invoice", "invoice_number", &stored.invoice_number)
            }
            other => other,
        })?;
        Ok(())
    }

    #[instrument(skip_all, fields(invoice_id = %invoice.id, version = invoice.version))]
    async fn save_invoice(&self, invoice: &Invoice) -> Result<Invoice, PortError> {
        let updated = Invoice {
            version: invoice.version + 1,
            ..invoice.clone()
        };
        let result = sqlx::query(
            "UPDATE invoices SET doc = $2, version = $3
             WHERE id = $1 AND version = $4",
        )
        .bind(*invoice.id.as_uuid())
        .bind(Json(&updated))
        .bind(updated.version as i64)
        .bind(invoice.version as i64)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            let current = sqlx::query_scalar::<_, i64>("SELECT version FROM invoices WHERE id = $1")
                .bind(*invoice.id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from)?
                .ok_or_else(|| PortError::not_found("Invoice", invoice.id))?;
            warn!(current, "Invoice write lost a version race");
            return Err(DatabaseError::StaleVersion(format!(
                "invoice {} was modified concurrently (version {} is stale, current {})",
                invoice.id, invoice.version, current
            ))
            .into());
        }

        debug!(version = updated.version, "Invoice saved");
        Ok(updated)
    }

    #[instrument(skip_all, fields(payment_id = %payment.id, transaction_id = %payment.transaction_id))]
    async fn insert_payment(&self, payment: &Payment) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO payments (id, invoice_id, vendor_id, transaction_id, payment_status, batch_id, created_at, doc)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(*payment.id.as_uuid())
        .bind(*payment.invoice_id.as_uuid())
        .bind(*payment.vendor_id.as_uuid())
        .bind(&payment.transaction_id)
        .bind(status_label(payment.payment_status))
        .bind(payment.batch_id.map(|id| *id.as_uuid()))
        .bind(payment.created_at)
        .bind(Json(payment))
        .execute(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::DuplicateEntry(_) => {
                DatabaseError::duplicate("Payment", "transaction id", &payment.transaction_id)
            }
            other => other,
        })?;
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError> {
        let row = sqlx::query_scalar::<_, Json<Payment>>("SELECT doc FROM payments WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        found(row, "Payment", id)
    }

    #[instrument(skip_all, fields(payment_id = %payment.id, status = ?payment.payment_status))]
    async fn save_payment(&self, payment: &Payment) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE payments SET payment_status = $2, batch_id = $3, doc = $4 WHERE id = $1",
        )
        .bind(*payment.id.as_uuid())
        .bind(status_label(payment.payment_status))
        .bind(payment.batch_id.map(|id| *id.as_uuid()))
        .bind(Json(payment))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Payment", payment.id));
        }
        Ok(())
    }

    async fn list_payments(&self, query: &PaymentQuery) -> Result<Vec<Payment>, PortError> {
        let rows = sqlx::query_scalar::<_, Json<Payment>>(
            "SELECT doc FROM payments
             WHERE ($1::uuid IS NULL OR invoice_id = $1)
               AND ($2::uuid IS NULL OR vendor_id = $2)
               AND ($3::text IS NULL OR payment_status = $3)
               AND ($4::uuid IS NULL OR batch_id = $4)
             ORDER BY created_at, id",
        )
        .bind(query.invoice_id.map(|id| *id.as_uuid()))
        .bind(query.vendor_id.map(|id| *id.as_uuid()))
        .bind(query.payment_status.map(status_label))
        .bind(query.batch_id.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows
            .into_iter()
            .map(|Json(payment)| payment)
            .filter(|payment| query.matches(payment))
            .collect())
    }

    async fn insert_adjustment(&self, adjustment: &Adjustment) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO adjustments (id, invoice_id, vendor_id, created_at, doc)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*adjustment.id.as_uuid())
        .bind(*adjustment.invoice_id.as_uuid())
        .bind(*adjustment.vendor_id.as_uuid())
        .bind(adjustment.created_at)
        .bind(Json(adjustment))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn list_adjustments(&self, query: &AdjustmentQuery) -> Result<Vec<Adjustment>, PortError> {
        let rows = sqlx::query_scalar::<_, Json<Adjustment>>(
            "SELECT doc FROM adjustments
             WHERE ($1::uuid IS NULL OR invoice_id = $1)
               AND ($2::uuid IS NULL OR vendor_id = $2)
             ORDER BY created_at, id",
        )
        .bind(query.invoice_id.map(|id| *id.as_uuid()))
        .bind(query.vendor_id.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(rows.into_iter().map(|Json(adjustment)| adjustment).collect())
    }

    async fn insert_accrual(&self, accrual: &Accrual) -> Result<(), PortError> {
        sqlx::query("INSERT INTO accruals (id, status, created_at, doc) VALUES ($1, $2, $3, $4)")
            .bind(*accrual.id.as_uuid())
            .bind(status_label(accrual.status))
            .bind(accrual.created_at)
            .bind(Json(accrual))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get_accrual(&self, id: AccrualId) -> Result<Accrual, PortError> {
        let row = sqlx::query_scalar::<_, Json<Accrual>>("SELECT doc FROM accruals WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        found(row, "Accrual", id)
    }

    async fn save_accrual(&self, accrual: &Accrual) -> Result<(), PortError> {
        let result = sqlx::query("UPDATE accruals SET status = $2, doc = $3 WHERE id = $1")
            .bind(*accrual.id.as_uuid())
            .bind(status_label(accrual.status))
            .bind(Json(accrual))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Accrual", accrual.id));
        }
        Ok(())
    }

    async fn list_accruals(&self, status: Option<AccrualStatus>) -> Result<Vec<Accrual>, PortError> {
        let rows = sqlx::query_scalar::<_, Json<Accrual>>(
            "SELECT doc FROM accruals
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at, id",
        )
        .bind(status.map(status_label))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(rows.into_iter().map(|Json(accrual)| accrual).collect())
    }

    #[instrument(skip_all, fields(batch_id = %batch.id, status = ?batch.status))]
    async fn save_batch(&self, batch: &BatchPayment) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO batch_payments (id, created_at, doc) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(*batch.id.as_uuid())
        .bind(batch.created_at)
        .bind(Json(batch))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get_batch(&self, id: BatchId) -> Result<BatchPayment, PortError> {
        let row = sqlx::query_scalar::<_, Json<BatchPayment>>("SELECT doc FROM batch_payments WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        found(row, "BatchPayment", id)
    }
}
