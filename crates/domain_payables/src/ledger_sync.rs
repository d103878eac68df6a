//! Vendor ledger queries and repair
//!
//! The vendor ledger is appended to as a side effect of settlement. When it
//! is missing or suspected stale it can be replayed from the business
//! records, which remain the source of truth.

use tracing::instrument;

use core_kernel::VendorId;
use domain_ledger::{JournalReference, LedgerEvent, VendorLedger, VendorLedgerEntryType};

use crate::adjustment::{AdjustmentKind, AdjustmentQuery};
use crate::context::SettlementContext;
use crate::error::SettlementError;
use crate::invoice::InvoiceQuery;
use crate::payment::{PaymentQuery, PaymentStatus};

#[derive(Clone)]
pub struct VendorLedgerService {
    ctx: SettlementContext,
}

impl VendorLedgerService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    /// The stored ledger, rebuilt from history on first access
    pub async fn ledger_for(&self, vendor_id: VendorId) -> Result<VendorLedger, SettlementError> {
        match self.ctx.vendor_ledgers().get(vendor_id).await? {
            Some(ledger) => Ok(ledger),
            None => self.rebuild(vendor_id).await,
        }
    }

    /// Replays invoices, settled payments and adjustments into a fresh ledger
    ///
    /// Only used when no ledger is stored yet. Existing ledgers are never
    /// replaced, so entries suppressed by a closed period stay missing.
    #[instrument(skip(self))]
    async fn rebuild(&self, vendor_id: VendorId) -> Result<VendorLedger, SettlementError> {
        self.ctx.payables.get_vendor(vendor_id).await?;
        let mut events = Vec::new();

        for invoice in self.ctx.payables.list_invoices(&InvoiceQuery::for_vendor(vendor_id)).await? {
            events.push(LedgerEvent {
                entry_type: VendorLedgerEntryType::Invoice,
                reference: JournalReference::Invoice(invoice.id),
                amount: invoice.net_payable()?,
                description: format!("Invoice {}", invoice.invoice_number),
                occurred_at: invoice.created_at,
            });
        }

        let settled = PaymentQuery {
            vendor_id: Some(vendor_id),
            payment_status: Some(PaymentStatus::Success),
            ..Default::default()
        };
        for payment in self.ctx.payables.list_payments(&settled).await? {
            let at = payment.paid_at.unwrap_or(payment.updated_at);
            events.push(LedgerEvent {
                entry_type: VendorLedgerEntryType::Payment,
                reference: JournalReference::Payment(payment.id),
                amount: payment.amount,
                description: format!("Payment {}", payment.transaction_id),
                occurred_at: at,
            });
            if payment.has_discount() {
                events.push(LedgerEvent {
                    entry_type: VendorLedgerEntryType::Credit,
                    reference: JournalReference::Payment(payment.id),
                    amount: payment.discount_applied,
                    description: format!("Early payment discount {}%", payment.discount_percentage),
                    occurred_at: at,
                });
            }
        }

        let adjustments = AdjustmentQuery {
            vendor_id: Some(vendor_id),
            ..Default::default()
        };
        for adjustment in self.ctx.payables.list_adjustments(&adjustments).await? {
            events.push(LedgerEvent {
                entry_type: match adjustment.kind {
                    AdjustmentKind::Credit => VendorLedgerEntryType::Credit,
                    AdjustmentKind::Debit => VendorLedgerEntryType::Debit,
                },
                reference: JournalReference::Adjustment(adjustment.id),
                amount: adjustment.amount,
                description: adjustment.reason,
                occurred_at: adjustment.created_at,
            });
        }

        Ok(self.ctx.vendor_ledgers().rebuild(vendor_id, events).await?)
    }
}
