//! Invoice intake
//!
//! Registers invoices handed over by procurement and books the liability.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{info, instrument};

use core_kernel::{Actor, InvoiceId, Money, PurchaseOrderId, VendorId};
use domain_ledger::{JournalReference, JournalTemplates, VendorLedgerEntryType};

use crate::audit::AuditEntity;
use crate::context::SettlementContext;
use crate::error::SettlementError;
use crate::invoice::{Invoice, InvoiceQuery};
use crate::recorder::Posting;

#[derive(Debug, Clone)]
pub struct RegisterInvoiceRequest {
    pub invoice_number: String,
    pub vendor_id: VendorId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub tax_amount: Money,
    pub withholding_amount: Money,
}

#[derive(Clone)]
pub struct InvoiceService {
    ctx: SettlementContext,
}

impl InvoiceService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    /// Stores a new invoice and posts expense, tax and payable to the books
    ///
    /// # Errors
    ///
    /// - `Validation` for non-positive amounts, negative tax or withholding,
    ///   withholding above the gross, or a due date before the invoice date
    /// - `NotFound` for an unknown vendor
    /// - `Port(Conflict)` when the vendor already has an invoice with this number
    #[instrument(skip_all, fields(invoice_number = %request.invoice_number, actor = %actor))]
    pub async fn register_invoice(
        &self,
        request: RegisterInvoiceRequest,
        actor: &Actor,
    ) -> Result<Invoice, SettlementError> {
        let number = request.invoice_number.trim();
        if number.is_empty() {
            return Err(SettlementError::validation("Invoice number is required"));
        }
        self.ctx.ensure_amount(&request.amount, "Invoice amount")?;
        for (label, value) in [("Tax amount", &request.tax_amount), ("Withholding amount", &request.withholding_amount)] {
            if value.currency() != self.ctx.config.currency || value.is_negative() {
                return Err(SettlementError::validation(format!(
                    "{} must be a non-negative {} amount, got {}",
                    label, self.ctx.config.currency, value
                )));
            }
        }
        let gross = request.amount.checked_add(&request.tax_amount)?;
        if request.withholding_amount > gross {
            return Err(SettlementError::validation(format!(
                "Withholding {} exceeds invoice gross {}",
                request.withholding_amount, gross
            )));
        }
        if request.due_date < request.invoice_date {
            return Err(SettlementError::validation(format!(
                "Due date {} is before invoice date {}",
                request.due_date, request.invoice_date
            )));
        }
        let vendor = self.ctx.payables.get_vendor(request.vendor_id).await?;

        let now = Utc::now();
        let invoice = Invoice {
            id: InvoiceId::new_v7(),
            invoice_number: number.to_string(),
            vendor_id: vendor.id,
            purchase_order_id: request.purchase_order_id,
            invoice_date: request.invoice_date,
            due_date: request.due_date,
            amount: request.amount,
            tax_amount: request.tax_amount,
            withholding_amount: request.withholding_amount,
            paid_amount: Money::zero(self.ctx.config.currency),
            applied_payments: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.ctx.payables.insert_invoice(&invoice).await?;

        let net = invoice.net_payable()?;
        let posting = Posting::new(
            JournalReference::Invoice(invoice.id),
            format!("Invoice {} from {}", invoice.invoice_number, vendor.name),
            JournalTemplates::invoice(invoice.amount, invoice.tax_amount, invoice.withholding_amount)?,
            invoice.invoice_date,
        )
        .with_vendor_entry(
            invoice.vendor_id,
            VendorLedgerEntryType::Invoice,
            net,
            format!("Invoice {}", invoice.invoice_number),
        );
        self.ctx.echo(posting, actor).await;

        info!(invoice_id = %invoice.id, net_payable = %net, "Invoice registered");
        self.ctx
            .audit(
                actor,
                "invoice.registered",
                AuditEntity::Invoice(invoice.id),
                json!({
                    "invoice_number": invoice.invoice_number,
                    "vendor_id": invoice.vendor_id,
                    "net_payable": net.amount(),
                }),
            )
            .await;
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, SettlementError> {
        Ok(self.ctx.payables.get_invoice(id).await?)
    }

    pub async fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<Invoice>, SettlementError> {
        Ok(self.ctx.payables.list_invoices(query).await?)
    }
}
