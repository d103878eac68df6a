//! Batch payment runs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use core_kernel::{Actor, BatchId, InvoiceId, Money, PaymentId};

use crate::audit::AuditEntity;
use crate::context::SettlementContext;
use crate::error::SettlementError;
use crate::invoice::Invoice;
use crate::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::settlement::{ensure_goods_received, PaymentService};
use crate::webhook::BATCH_COMPLETED;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Why one invoice in a batch was not settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    pub invoice_id: InvoiceId,
    pub reason: String,
}

/// One batch run over several invoices
///
/// `invoice_ids` holds only the invoices that qualified; already-paid
/// invoices are filtered out before the run and never counted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPayment {
    pub id: BatchId,
    pub invoice_ids: Vec<InvoiceId>,
    pub payment_ids: Vec<PaymentId>,
    pub method: PaymentMethod,
    pub total_amount: Money,
    pub status: BatchStatus,
    pub processed_count: u32,
    pub failed_count: u32,
    /// Interrupted after the invoice absorbed the payment; the scheduler completes them
    #[serde(default)]
    pub pending_count: u32,
    pub failures: Vec<BatchItemFailure>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Pays a set of invoices in full in one run
///
/// Each invoice is paid for its whole outstanding amount with no discount
/// and no approval step. One invoice failing does not stop the others.
#[derive(Clone)]
pub struct BatchService {
    ctx: SettlementContext,
    payments: PaymentService,
}

impl BatchService {
    pub fn new(ctx: SettlementContext) -> Self {
        let payments = PaymentService::new(ctx.clone());
        Self { ctx, payments }
    }

    #[instrument(skip_all, fields(requested = invoice_ids.len(), actor = %actor))]
    pub async fn run_batch(
        &self,
        invoice_ids: Vec<InvoiceId>,
        method: PaymentMethod,
        actor: &Actor,
    ) -> Result<BatchPayment, SettlementError> {
        if invoice_ids.is_empty() {
            return Err(SettlementError::validation("A batch needs at least one invoice"));
        }

        let mut seen = HashSet::new();
        let mut eligible: Vec<Invoice> = Vec::new();
        for id in invoice_ids {
            if !seen.insert(id) {
                continue;
            }
            match self.ctx.payables.get_invoice(id).await {
                Ok(invoice) if invoice.is_paid()? => {
                    debug!(invoice_id = %id, "Skipping paid invoice");
                }
                Ok(invoice) => eligible.push(invoice),
                Err(e) if e.is_not_found() => {
                    warn!(invoice_id = %id, "Skipping unknown invoice");
                }
                Err(e) => return Err(e.into()),
            }
        }
        if eligible.is_empty() {
            return Err(SettlementError::validation(
                "None of the selected invoices are eligible for payment",
            ));
        }

        let outstanding = eligible
            .iter()
            .map(Invoice::outstanding)
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = Money::sum(self.ctx.config.currency, &outstanding)?;

        let mut batch = BatchPayment {
            id: BatchId::new_v7(),
            invoice_ids: eligible.iter().map(|i| i.id).collect(),
            payment_ids: Vec::new(),
            method,
            total_amount,
            status: BatchStatus::Processing,
            processed_count: 0,
            failed_count: 0,
            pending_count: 0,
            failures: Vec::new(),
            created_by: actor.clone(),
            created_at: Utc::now(),
            completed_at: None,
        };
        self.ctx.payables.save_batch(&batch).await?;

        for (invoice, amount) in eligible.iter().zip(outstanding) {
            match self.pay_in_full(invoice, amount, &batch, actor).await {
                Ok(payment) if payment.payment_status == PaymentStatus::Success => {
                    batch.processed_count += 1;
                    batch.payment_ids.push(payment.id);
                }
                Ok(payment) if payment.payment_status == PaymentStatus::Pending => {
                    batch.pending_count += 1;
                    batch.payment_ids.push(payment.id);
                }
                Ok(payment) => {
                    batch.failed_count += 1;
                    batch.payment_ids.push(payment.id);
                    batch.failures.push(BatchItemFailure {
                        invoice_id: invoice.id,
                        reason: payment.failure_reason.unwrap_or_else(|| "Settlement failed".to_string()),
                    });
                }
                Err(e) => {
                    batch.failed_count += 1;
                    batch.failures.push(BatchItemFailure {
                        invoice_id: invoice.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        batch.status = if batch.processed_count + batch.pending_count > 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };
        batch.completed_at = Some(Utc::now());
        self.ctx.payables.save_batch(&batch).await?;

        info!(
            batch_id = %batch.id,
            processed = batch.processed_count,
            failed = batch.failed_count,
            pending = batch.pending_count,
            total = %batch.total_amount,
            "Batch payment run finished"
        );
        let summary = json!({
            "batch_id": batch.id,
            "status": batch.status,
            "processed_count": batch.processed_count,
            "failed_count": batch.failed_count,
            "pending_count": batch.pending_count,
            "total_amount": batch.total_amount.amount(),
            "payment_ids": batch.payment_ids,
        });
        self.ctx
            .audit(actor, "batch.completed", AuditEntity::Batch(batch.id), summary.clone())
            .await;
        self.ctx.notify(BATCH_COMPLETED, summary).await;
        Ok(batch)
    }

    pub async fn get_batch(&self, id: BatchId) -> Result<BatchPayment, SettlementError> {
        Ok(self.ctx.payables.get_batch(id).await?)
    }

    async fn pay_in_full(
        &self,
        invoice: &Invoice,
        amount: Money,
        batch: &BatchPayment,
        actor: &Actor,
    ) -> Result<Payment, SettlementError> {
        ensure_goods_received(self.ctx.payables.as_ref(), invoice).await?;

        let mut payment = Payment::new(
            invoice.id,
            invoice.vendor_id,
            amount,
            batch.method,
            self.ctx.today(),
            actor.clone(),
        );
        payment.batch_id = Some(batch.id);
        payment.notes = Some(format!("Batch {}", batch.id));
        self.ctx.payables.insert_payment(&payment).await?;

        match self.payments.settle_or_fail(payment.clone(), actor, self.ctx.today()).await {
            Ok(settled) => Ok(settled),
            Err(e) => {
                if !self.payments.definitely_unapplied(&payment).await {
                    warn!(payment_id = %payment.id, error = %e, "Batch payment left pending for the scheduler");
                    return Ok(payment);
                }
                payment.mark_failed(e.to_string());
                if let Err(save_error) = self.ctx.payables.save_payment(&payment).await {
                    warn!(payment_id = %payment.id, error = %save_error, "Could not mark batch payment failed");
                }
                Ok(payment)
            }
        }
    }
}
