//! Accruals: expense recognised before the invoice arrives

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use core_kernel::{AccrualId, Actor, InvoiceId, Money, PurchaseOrderId, VendorId};
use domain_ledger::{JournalReference, JournalTemplates, PostOutcome};

use crate::audit::AuditEntity;
use crate::context::SettlementContext;
use crate::error::SettlementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccrualStatus {
    Active,
    Reversed,
    /// Reserved for matching against a later invoice; never set today
    Matched,
}

/// What the accrued expense relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum AccrualReference {
    PurchaseOrder(PurchaseOrderId),
    Vendor(VendorId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accrual {
    pub id: AccrualId,
    pub reference: AccrualReference,
    pub estimated_amount: Money,
    pub description: String,
    pub status: AccrualStatus,
    pub accrual_date: NaiveDate,
    pub reversal_date: Option<NaiveDate>,
    pub matched_invoice: Option<InvoiceId>,
    pub created_by: Actor,
    pub reversed_by: Option<Actor>,
    pub created_at: DateTime<Utc>,
    pub reversed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateAccrualRequest {
    pub reference: AccrualReference,
    pub estimated_amount: Money,
    pub accrual_date: NaiveDate,
    pub description: String,
}

/// Records and reverses accrued expenses
///
/// Unlike payments, accruals exist only for their journal effect, so the
/// entry is posted before the accrual is stored and a ledger failure fails
/// the request.
#[derive(Clone)]
pub struct AccrualService {
    ctx: SettlementContext,
}

impl AccrualService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip_all, fields(reference = ?request.reference, actor = %actor))]
    pub async fn create_accrual(
        &self,
        request: CreateAccrualRequest,
        actor: &Actor,
    ) -> Result<Accrual, SettlementError> {
        self.ctx.ensure_amount(&request.estimated_amount, "Estimated amount")?;
        let label = match request.reference {
            AccrualReference::PurchaseOrder(id) => {
                let order = self
                    .ctx
                    .payables
                    .get_purchase_order(id)
                    .await?
                    .ok_or_else(|| SettlementError::not_found("PurchaseOrder", id))?;
                format!("PO {}", order.po_number)
            }
            AccrualReference::Vendor(id) => {
                let vendor = self.ctx.payables.get_vendor(id).await?;
                format!("vendor {}", vendor.name)
            }
        };
        let description = if request.description.trim().is_empty() {
            format!("Accrued expense for {}", label)
        } else {
            request.description.trim().to_string()
        };

        let accrual = Accrual {
            id: AccrualId::new_v7(),
            reference: request.reference,
            estimated_amount: request.estimated_amount,
            description,
            status: AccrualStatus::Active,
            accrual_date: request.accrual_date,
            reversal_date: None,
            matched_invoice: None,
            created_by: actor.clone(),
            reversed_by: None,
            created_at: Utc::now(),
            reversed_at: None,
        };

        let outcome = self
            .ctx
            .journal()
            .post(
                JournalReference::Accrual(accrual.id),
                accrual.description.clone(),
                JournalTemplates::accrual(accrual.estimated_amount),
                actor,
                accrual.accrual_date,
            )
            .await?;
        self.ctx.payables.insert_accrual(&accrual).await?;

        info!(accrual_id = %accrual.id, amount = %accrual.estimated_amount, posted = outcome.is_posted(), "Accrual recorded");
        self.audit(actor, "accrual.created", &accrual, &outcome).await;
        Ok(accrual)
    }

    /// Reverses an active accrual with the exact inverse entry, dated today
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn reverse_accrual(&self, id: AccrualId, actor: &Actor) -> Result<Accrual, SettlementError> {
        let mut accrual = self.ctx.payables.get_accrual(id).await?;
        if accrual.status != AccrualStatus::Active {
            return Err(SettlementError::conflict(format!(
                "Accrual {} is {:?} and cannot be reversed",
                id, accrual.status
            )));
        }

        let today = self.ctx.today();
        let outcome = self
            .ctx
            .journal()
            .post(
                JournalReference::Accrual(accrual.id),
                format!("Reversal: {}", accrual.description),
                JournalTemplates::accrual_reversal(accrual.estimated_amount),
                actor,
                today,
            )
            .await?;

        accrual.status = AccrualStatus::Reversed;
        accrual.reversal_date = Some(today);
        accrual.reversed_by = Some(actor.clone());
        accrual.reversed_at = Some(Utc::now());
        self.ctx.payables.save_accrual(&accrual).await?;

        info!(accrual_id = %accrual.id, "Accrual reversed");
        self.audit(actor, "accrual.reversed", &accrual, &outcome).await;
        Ok(accrual)
    }

    pub async fn list_accruals(&self, status: Option<AccrualStatus>) -> Result<Vec<Accrual>, SettlementError> {
        Ok(self.ctx.payables.list_accruals(status).await?)
    }

    async fn audit(&self, actor: &Actor, action: &str, accrual: &Accrual, outcome: &PostOutcome) {
        self.ctx
            .audit(
                actor,
                action,
                AuditEntity::Accrual(accrual.id),
                json!({
                    "reference": accrual.reference,
                    "amount": accrual.estimated_amount.amount(),
                    "status": accrual.status,
                    "journal_posted": outcome.is_posted(),
                }),
            )
            .await;
    }
}
