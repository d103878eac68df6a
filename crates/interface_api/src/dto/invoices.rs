//! Invoice intake DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use core_kernel::{Currency, Money, PurchaseOrderId, VendorId};
use domain_payables::RegisterInvoiceRequest;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInvoiceBody {
    #[validate(length(min = 1, max = 64))]
    pub invoice_number: String,
    pub vendor_id: VendorId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub withholding_amount: Decimal,
}

impl RegisterInvoiceBody {
    pub fn into_request(self, currency: Currency) -> RegisterInvoiceRequest {
        RegisterInvoiceRequest {
            invoice_number: self.invoice_number,
            vendor_id: self.vendor_id,
            purchase_order_id: self.purchase_order_id,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            amount: Money::new(self.amount, currency),
            tax_amount: Money::new(self.tax_amount, currency),
            withholding_amount: Money::new(self.withholding_amount, currency),
        }
    }
}
