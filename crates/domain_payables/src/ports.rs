//! Payables Domain Ports
//!
//! `PayablesPort` is the record store shared by request handlers and the
//! background scheduler. Every write touches exactly one record; there are
//! no multi-record transactions.
//!
//! Invoices are the one contended record. `save_invoice` is a
//! compare-and-swap on `version`: it succeeds only if the stored version
//! still equals the caller's, and returns the invoice with the bumped
//! version. A stale write fails with `PortError::Conflict`.

use async_trait::async_trait;

use core_kernel::{
    AccrualId, BatchId, DomainPort, HealthCheckable, InvoiceId, PaymentId, PortError,
    PurchaseOrderId, VendorId,
};

use crate::accrual::{Accrual, AccrualStatus};
use crate::adjustment::{Adjustment, AdjustmentQuery};
use crate::batch::BatchPayment;
use crate::invoice::{Invoice, InvoiceQuery};
use crate::payment::{Payment, PaymentQuery};
use crate::purchase_order::PurchaseOrder;
use crate::vendor::Vendor;

#[async_trait]
pub trait PayablesPort: DomainPort + HealthCheckable {
    // ========================================================================
    // Collaborator records (vendor master, purchase orders)
    // ========================================================================

    async fn get_vendor(&self, id: VendorId) -> Result<Vendor, PortError>;

    async fn save_vendor(&self, vendor: &Vendor) -> Result<(), PortError>;

    async fn get_purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, PortError>;

    async fn save_purchase_order(&self, order: &PurchaseOrder) -> Result<(), PortError>;

    // ========================================================================
    // Invoices
    // ========================================================================

    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError>;

    /// Stores a new invoice at version 0; conflicts on a duplicate id or number
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    /// Version-checked update; returns the stored invoice
    async fn save_invoice(&self, invoice: &Invoice) -> Result<Invoice, PortError>;

    // ========================================================================
    // Payments
    // ========================================================================

    /// Conflicts if the transaction id is already taken
    async fn insert_payment(&self, payment: &Payment) -> Result<(), PortError>;

    async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError>;

    async fn save_payment(&self, payment: &Payment) -> Result<(), PortError>;

    /// Payments matching the query, oldest first
    async fn list_payments(&self, query: &PaymentQuery) -> Result<Vec<Payment>, PortError>;

    // ========================================================================
    // Adjustments, accruals, batches
    // ========================================================================

    async fn insert_adjustment(&self, adjustment: &Adjustment) -> Result<(), PortError>;

    async fn list_adjustments(&self, query: &AdjustmentQuery) -> Result<Vec<Adjustment>, PortError>;

    async fn insert_accrual(&self, accrual: &Accrual) -> Result<(), PortError>;

    async fn get_accrual(&self, id: AccrualId) -> Result<Accrual, PortError>;

    async fn save_accrual(&self, accrual: &Accrual) -> Result<(), PortError>;

    async fn list_accruals(&self, status: Option<AccrualStatus>) -> Result<Vec<Accrual>, PortError>;

    /// Inserts or replaces a batch record
    async fn save_batch(&self, batch: &BatchPayment) -> Result<(), PortError>;

    async fn get_batch(&self, id: BatchId) -> Result<BatchPayment, PortError>;
}

/// Mock implementation of PayablesPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    /// In-memory mock implementation of PayablesPort
    #[derive(Debug, Default)]
    pub struct MockPayablesPort {
        vendors: Arc<RwLock<HashMap<VendorId, Vendor>>>,
        orders: Arc<RwLock<HashMap<PurchaseOrderId, PurchaseOrder>>>,
        invoices: Arc<RwLock<HashMap<InvoiceId, Invoice>>>,
        payments: Arc<RwLock<Vec<Payment>>>,
        adjustments: Arc<RwLock<Vec<Adjustment>>>,
        accruals: Arc<RwLock<Vec<Accrual>>>,
        batches: Arc<RwLock<HashMap<BatchId, BatchPayment>>>,
        fail_invoice_writes: AtomicBool,
        injected_conflicts: AtomicU32,
        failing_success_saves: AtomicU32,
    }

    impl MockPayablesPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes invoice saves fail with a connection error until reset
        pub fn fail_invoice_writes(&self, fail: bool) {
            self.fail_invoice_writes.store(fail, Ordering::SeqCst);
        }

        /// The next `count` invoice saves lose an optimistic-concurrency race
        pub fn inject_invoice_conflicts(&self, count: u32) {
            self.injected_conflicts.store(count, Ordering::SeqCst);
        }

        /// The next `count` saves of a payment marked Success fail with a
        /// connection error
        pub fn fail_settled_payment_saves(&self, count: u32) {
            self.failing_success_saves.store(count, Ordering::SeqCst);
        }

        /// Overwrites an invoice without a version check, bumping its version
        pub async fn force_invoice(&self, invoice: Invoice) {
            let mut invoices = self.invoices.write().await;
            let version = invoices.get(&invoice.id).map_or(0, |i| i.version + 1);
            invoices.insert(invoice.id, Invoice { version, ..invoice });
        }

        fn take_injected_conflict(&self) -> bool {
            take_one(&self.injected_conflicts)
        }
    }

    fn take_one(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    impl DomainPort for MockPayablesPort {}

    #[async_trait]
    impl HealthCheckable for MockPayablesPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-payables-port")
        }
    }

    #[async_trait]
    impl PayablesPort for MockPayablesPort {
        async fn get_vendor(&self, id: VendorId) -> Result<Vendor, PortError> {
            self.vendors
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Vendor", id))
        }

        async fn save_vendor(&self, vendor: &Vendor) -> Result<(), PortError> {
            self.vendors.write().await.insert(vendor.id, vendor.clone());
            Ok(())
        }

        async fn get_purchase_order(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, PortError> {
            Ok(self.orders.read().await.get(&id).cloned())
        }

        async fn save_purchase_order(&self, order: &PurchaseOrder) -> Result<(), PortError> {
            self.orders.write().await.insert(order.id, order.clone());
            Ok(())
        }

        async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.invoices
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
            let mut invoices: Vec<Invoice> = self
                .invoices
                .read()
                .await
                .values()
                .filter(|i| query.matches(i))
                .cloned()
                .collect();
            invoices.sort_by_key(|i| i.created_at);
            Ok(invoices)
        }

        async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
            let mut invoices = self.invoices.write().await;
            if invoices.contains_key(&invoice.id)
                || invoices.values().any(|i| i.invoice_number == invoice.invoice_number && i.vendor_id == invoice.vendor_id)
            {
                return Err(PortError::conflict(format!("invoice {} already exists", invoice.invoice_number)));
            }
            invoices.insert(invoice.id, Invoice { version: 0, ..invoice.clone() });
            Ok(())
        }

        async fn save_invoice(&self, invoice: &Invoice) -> Result<Invoice, PortError> {
            if self.fail_invoice_writes.load(Ordering::SeqCst) {
                return Err(PortError::connection("mock invoice store unavailable"));
            }
            if self.take_injected_conflict() {
                return Err(PortError::conflict(format!(
                    "invoice {} was modified concurrently (version {} is stale)",
                    invoice.id, invoice.version
                )));
            }

            let mut invoices = self.invoices.write().await;
            let stored = invoices
                .get(&invoice.id)
                .ok_or_else(|| PortError::not_found("Invoice", invoice.id))?;
            if stored.version != invoice.version {
                return Err(PortError::conflict(format!(
                    "invoice {} was modified concurrently (version {} is stale, current {})",
                    invoice.id, invoice.version, stored.version
                )));
            }
            let updated = Invoice {
                version: invoice.version + 1,
                ..invoice.clone()
            };
            invoices.insert(invoice.id, updated.clone());
            Ok(updated)
        }

        async fn insert_payment(&self, payment: &Payment) -> Result<(), PortError> {
            let mut payments = self.payments.write().await;
            if payments.iter().any(|p| p.id == payment.id || p.transaction_id == payment.transaction_id) {
                return Err(PortError::conflict(format!(
                    "transaction id {} already exists",
                    payment.transaction_id
                )));
            }
            payments.push(payment.clone());
            Ok(())
        }

        async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError> {
            self.payments
                .read()
                .await
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Payment", id))
        }

        async fn save_payment(&self, payment: &Payment) -> Result<(), PortError> {
            if payment.payment_status == crate::payment::PaymentStatus::Success
                && take_one(&self.failing_success_saves)
            {
                return Err(PortError::connection("mock payment store unavailable"));
            }
            let mut payments = self.payments.write().await;
            let slot = payments
                .iter_mut()
                .find(|p| p.id == payment.id)
                .ok_or_else(|| PortError::not_found("Payment", payment.id))?;
            *slot = payment.clone();
            Ok(())
        }

        async fn list_payments(&self, query: &PaymentQuery) -> Result<Vec<Payment>, PortError> {
            Ok(self
                .payments
                .read()
                .await
                .iter()
                .filter(|p| query.matches(p))
                .cloned()
                .collect())
        }

        async fn insert_adjustment(&self, adjustment: &Adjustment) -> Result<(), PortError> {
            self.adjustments.write().await.push(adjustment.clone());
            Ok(())
        }

        async fn list_adjustments(&self, query: &AdjustmentQuery) -> Result<Vec<Adjustment>, PortError> {
            Ok(self
                .adjustments
                .read()
                .await
                .iter()
                .filter(|a| query.matches(a))
                .cloned()
                .collect())
        }

        async fn insert_accrual(&self, accrual: &Accrual) -> Result<(), PortError> {
            self.accruals.write().await.push(accrual.clone());
            Ok(())
        }

        async fn get_accrual(&self, id: AccrualId) -> Result<Accrual, PortError> {
            self.accruals
                .read()
                .await
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Accrual", id))
        }

        async fn save_accrual(&self, accrual: &Accrual) -> Result<(), PortError> {
            let mut accruals = self.accruals.write().await;
            let slot = accruals
                .iter_mut()
                .find(|a| a.id == accrual.id)
                .ok_or_else(|| PortError::not_found("Accrual", accrual.id))?;
            *slot = accrual.clone();
            Ok(())
        }

        async fn list_accruals(&self, status: Option<AccrualStatus>) -> Result<Vec<Accrual>, PortError> {
            Ok(self
                .accruals
                .read()
                .await
                .iter()
                .filter(|a| status.map_or(true, |s| a.status == s))
                .cloned()
                .collect())
        }

        async fn save_batch(&self, batch: &BatchPayment) -> Result<(), PortError> {
            self.batches.write().await.insert(batch.id, batch.clone());
            Ok(())
        }

        async fn get_batch(&self, id: BatchId) -> Result<BatchPayment, PortError> {
            self.batches
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("BatchPayment", id))
        }
    }
}
