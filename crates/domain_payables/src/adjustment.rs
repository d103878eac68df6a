//! Credit and debit notes against invoices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use core_kernel::{Actor, AdjustmentId, InvoiceId, Money, VendorId};
use domain_ledger::{JournalReference, JournalTemplates, VendorLedgerEntryType};
pub use domain_ledger::AdjustmentKind;

use crate::audit::AuditEntity;
use crate::context::SettlementContext;
use crate::error::SettlementError;
use crate::recorder::Posting;

/// An immutable credit or debit note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: AdjustmentId,
    pub kind: AdjustmentKind,
    pub invoice_id: InvoiceId,
    pub vendor_id: VendorId,
    pub amount: Money,
    pub reason: String,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAdjustmentRequest {
    pub kind: AdjustmentKind,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct AdjustmentQuery {
    pub invoice_id: Option<InvoiceId>,
    pub vendor_id: Option<VendorId>,
}

impl AdjustmentQuery {
    pub fn matches(&self, adjustment: &Adjustment) -> bool {
        self.invoice_id.map_or(true, |id| adjustment.invoice_id == id)
            && self.vendor_id.map_or(true, |id| adjustment.vendor_id == id)
    }
}

/// Issues credit and debit notes
///
/// A credit note reduces what is owed on the invoice and may not exceed
/// its outstanding amount. A debit note adds to what is owed; it reopens
/// settled value on the invoice (floored at zero paid) while the books
/// carry the full note.
#[derive(Clone)]
pub struct AdjustmentService {
    ctx: SettlementContext,
}

impl AdjustmentService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip_all, fields(invoice_id = %request.invoice_id, kind = ?request.kind, actor = %actor))]
    pub async fn create_adjustment(
        &self,
        request: CreateAdjustmentRequest,
        actor: &Actor,
    ) -> Result<Adjustment, SettlementError> {
        self.ctx.ensure_amount(&request.amount, "Adjustment amount")?;
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(SettlementError::validation("Adjustment reason is required"));
        }

        let mut invoice = self.ctx.payables.get_invoice(request.invoice_id).await?;
        match request.kind {
            AdjustmentKind::Credit => {
                let outstanding = invoice.outstanding()?;
                if request.amount > outstanding {
                    return Err(SettlementError::validation(format!(
                        "Credit note {} exceeds outstanding amount {} on invoice {}",
                        request.amount, outstanding, invoice.invoice_number
                    )));
                }
                invoice.record_settlement(request.amount)?;
            }
            AdjustmentKind::Debit => invoice.reverse_settlement(request.amount)?,
        }
        let invoice = self.ctx.payables.save_invoice(&invoice).await?;

        let adjustment = Adjustment {
            id: AdjustmentId::new_v7(),
            kind: request.kind,
            invoice_id: invoice.id,
            vendor_id: invoice.vendor_id,
            amount: request.amount,
            reason: reason.to_string(),
            created_by: actor.clone(),
            created_at: Utc::now(),
        };
        self.ctx.payables.insert_adjustment(&adjustment).await?;

        let entry_type = match adjustment.kind {
            AdjustmentKind::Credit => VendorLedgerEntryType::Credit,
            AdjustmentKind::Debit => VendorLedgerEntryType::Debit,
        };
        let posting = Posting::new(
            JournalReference::Adjustment(adjustment.id),
            format!("{:?} note on invoice {}: {}", adjustment.kind, invoice.invoice_number, adjustment.reason),
            JournalTemplates::adjustment(adjustment.kind, adjustment.amount),
            self.ctx.today(),
        )
        .with_vendor_entry(adjustment.vendor_id, entry_type, adjustment.amount, adjustment.reason.clone());
        self.ctx.echo(posting, actor).await;

        info!(adjustment_id = %adjustment.id, amount = %adjustment.amount, "Adjustment recorded");
        self.ctx
            .audit(
                actor,
                "adjustment.created",
                AuditEntity::Adjustment(adjustment.id),
                json!({
                    "kind": adjustment.kind,
                    "invoice_id": adjustment.invoice_id,
                    "amount": adjustment.amount.amount(),
                    "reason": adjustment.reason,
                }),
            )
            .await;
        Ok(adjustment)
    }

    pub async fn list_adjustments(&self, query: &AdjustmentQuery) -> Result<Vec<Adjustment>, SettlementError> {
        Ok(self.ctx.payables.list_adjustments(query).await?)
    }
}
