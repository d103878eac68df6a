//! Three-way match exceptions
//!
//! Flags unpaid invoices whose purchase order, goods receipt or price do
//! not line up. Flags are advisory; payment creation enforces only the
//! receipt check on its own.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{InvoiceId, Money, VendorId};

use crate::context::SettlementContext;
use crate::error::SettlementError;
use crate::invoice::{Invoice, InvoiceQuery};
use crate::purchase_order::{PoApprovalStatus, PurchaseOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    MissingPurchaseOrder,
    VendorMismatch,
    PurchaseOrderNotApproved,
    GoodsNotReceived,
    PriceVariance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionFlag {
    pub kind: ExceptionKind,
    pub detail: String,
}

/// All flags raised for one invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceException {
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub vendor_id: VendorId,
    pub outstanding: Money,
    pub flags: Vec<ExceptionFlag>,
}

fn flag(kind: ExceptionKind, detail: String) -> ExceptionFlag {
    ExceptionFlag { kind, detail }
}

/// Percentage by which `actual` deviates from `expected`
fn variance_pct(expected: &Money, actual: &Money) -> Option<Decimal> {
    if expected.is_zero() {
        return None;
    }
    Some(((actual.amount() - expected.amount()) / expected.amount() * dec!(100)).abs())
}

/// Checks an invoice against its purchase order
///
/// `order` is the purchase order the invoice references, if it exists.
/// Price variance compares the pre-tax invoice amount with the order total
/// and is flagged when it exceeds `tolerance_pct` percent.
pub fn detect_invoice_exceptions(
    invoice: &Invoice,
    order: Option<&PurchaseOrder>,
    tolerance_pct: Decimal,
) -> Vec<ExceptionFlag> {
    let Some(order) = order else {
        let detail = match invoice.purchase_order_id {
            Some(id) => format!("Purchase order {} not found", id),
            None => "Invoice does not reference a purchase order".to_string(),
        };
        return vec![flag(ExceptionKind::MissingPurchaseOrder, detail)];
    };

    let mut flags = Vec::new();
    if order.vendor_id != invoice.vendor_id {
        flags.push(flag(
            ExceptionKind::VendorMismatch,
            format!("Invoice vendor {} differs from order vendor {}", invoice.vendor_id, order.vendor_id),
        ));
    }
    if order.approval_status != PoApprovalStatus::Approved {
        flags.push(flag(
            ExceptionKind::PurchaseOrderNotApproved,
            format!("Purchase order {} approval is {:?}", order.po_number, order.approval_status),
        ));
    }
    if !order.is_received() {
        flags.push(flag(
            ExceptionKind::GoodsNotReceived,
            format!("Purchase order {} is {:?}", order.po_number, order.status),
        ));
    }

    let exceeds = match variance_pct(&order.total_amount, &invoice.amount) {
        Some(pct) => pct > tolerance_pct,
        None => !invoice.amount.is_zero(),
    };
    if exceeds {
        flags.push(flag(
            ExceptionKind::PriceVariance,
            format!(
                "Invoice amount {} differs from order total {} beyond {}%",
                invoice.amount, order.total_amount, tolerance_pct
            ),
        ));
    }
    flags
}

#[derive(Clone)]
pub struct ExceptionService {
    ctx: SettlementContext,
}

impl ExceptionService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    /// Checks every unpaid invoice; invoices without flags are left out
    pub async fn scan(&self) -> Result<Vec<InvoiceException>, SettlementError> {
        let invoices = self.ctx.payables.list_invoices(&InvoiceQuery::unpaid()).await?;
        let tolerance = self.ctx.config.price_tolerance_pct;
        let mut exceptions = Vec::new();

        for invoice in invoices {
            let order = match invoice.purchase_order_id {
                Some(id) => self.ctx.payables.get_purchase_order(id).await?,
                None => None,
            };
            let flags = detect_invoice_exceptions(&invoice, order.as_ref(), tolerance);
            if flags.is_empty() {
                continue;
            }
            exceptions.push(InvoiceException {
                invoice_id: invoice.id,
                invoice_number: invoice.invoice_number.clone(),
                vendor_id: invoice.vendor_id,
                outstanding: invoice.outstanding()?,
                flags,
            });
        }

        info!(flagged = exceptions.len(), "Invoice exception scan finished");
        Ok(exceptions)
    }
}
