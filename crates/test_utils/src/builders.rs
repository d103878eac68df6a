//! Test Data Builders
//!
//! Builder patterns for settlement test data. Tests set only the fields
//! they care about and take defaults for everything else.

use chrono::NaiveDate;
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{InvoiceId, Money, PurchaseOrderId, VendorId};
use domain_payables::{
    CreatePaymentRequest, PaymentMethod, PoApprovalStatus, PurchaseOrder,
    PurchaseOrderStatus, RegisterInvoiceRequest, Vendor,
};

use crate::fixtures::{DateFixtures, MoneyFixtures, StringFixtures};

/// Builder for vendors
#[derive(Debug, Clone, Default)]
pub struct VendorBuilder {
    name: Option<String>,
    discount: Option<(Decimal, u32)>,
    inactive: bool,
}

impl VendorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Offers `percentage` off when paid within `window_days` of the invoice date
    pub fn with_discount(mut self, percentage: Decimal, window_days: u32) -> Self {
        self.discount = Some((percentage, window_days));
        self
    }

    pub fn inactive(mut self) -> Self {
        self.inactive = true;
        self
    }

    pub fn build(self) -> Vendor {
        let name = self.name.unwrap_or_else(|| CompanyName().fake());
        let mut vendor = Vendor::new(name);
        if let Some((percentage, window_days)) = self.discount {
            vendor = vendor.with_discount(percentage, window_days);
        }
        vendor.is_active = !self.inactive;
        vendor
    }
}

/// Builder for purchase orders; defaults to delivered and approved
#[derive(Debug, Clone)]
pub struct PurchaseOrderBuilder {
    po_number: String,
    vendor_id: VendorId,
    total: Money,
    status: PurchaseOrderStatus,
    approval: PoApprovalStatus,
}

impl PurchaseOrderBuilder {
    pub fn new(vendor_id: VendorId) -> Self {
        Self {
            po_number: StringFixtures::po_number(),
            vendor_id,
            total: MoneyFixtures::usd_invoice(),
            status: PurchaseOrderStatus::Delivered,
            approval: PoApprovalStatus::Approved,
        }
    }

    pub fn with_total(mut self, total: Money) -> Self {
        self.total = total;
        self
    }

    pub fn with_status(mut self, status: PurchaseOrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> PurchaseOrder {
        PurchaseOrder::new(self.po_number, self.vendor_id, self.total)
            .with_status(self.status, self.approval)
    }
}

/// Builder for invoice intake requests
#[derive(Debug, Clone)]
pub struct InvoiceRequestBuilder {
    request: RegisterInvoiceRequest,
}

impl InvoiceRequestBuilder {
    pub fn new(vendor_id: VendorId) -> Self {
        let amount = MoneyFixtures::usd_invoice();
        let zero = Money::zero(amount.currency());
        Self {
            request: RegisterInvoiceRequest {
                invoice_number: StringFixtures::invoice_number(),
                vendor_id,
                purchase_order_id: None,
                invoice_date: DateFixtures::invoice_date(),
                due_date: DateFixtures::due_date(),
                amount,
                tax_amount: zero,
                withholding_amount: zero,
            },
        }
    }

    /// Links the invoice to an order and bills the order's full total
    pub fn for_order(mut self, order: &PurchaseOrder) -> Self {
        self.request.purchase_order_id = Some(order.id);
        self.request.amount = order.total_amount;
        self
    }

    pub fn with_order_id(mut self, id: PurchaseOrderId) -> Self {
        self.request.purchase_order_id = Some(id);
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.request.amount = amount;
        self
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.request.tax_amount = tax;
        self
    }

    pub fn with_withholding(mut self, withholding: Money) -> Self {
        self.request.withholding_amount = withholding;
        self
    }

    pub fn dated(mut self, invoice_date: NaiveDate, due_date: NaiveDate) -> Self {
        self.request.invoice_date = invoice_date;
        self.request.due_date = due_date;
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.request.invoice_number = number.into();
        self
    }

    pub fn build(self) -> RegisterInvoiceRequest {
        self.request
    }
}

/// Builder for payment requests
#[derive(Debug, Clone)]
pub struct PaymentRequestBuilder {
    request: CreatePaymentRequest,
}

impl PaymentRequestBuilder {
    pub fn new(invoice_id: InvoiceId, amount: Money) -> Self {
        Self {
            request: CreatePaymentRequest::new(invoice_id, amount, PaymentMethod::BankTransfer),
        }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.request.method = method;
        self
    }

    pub fn build(self) -> CreatePaymentRequest {
        self.request
    }
}

/// Builder for CSV bank statements
///
/// Columns are `Date,Reference,Amount,Description`, the layout most test
/// statements use.
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    rows: Vec<String>,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, date: NaiveDate, reference: &str, amount: Decimal, description: &str) -> Self {
        self.rows
            .push(format!("{},{},{},{}", date, reference, amount, description));
        self
    }

    /// A line with no reference, matchable only by amount
    pub fn unreferenced(self, date: NaiveDate, amount: Decimal) -> Self {
        self.line(date, "", amount, "Unreferenced transfer")
    }

    pub fn build(self) -> String {
        let mut csv = String::from("Date,Reference,Amount,Description\n");
        for row in self.rows {
            csv.push_str(&row);
            csv.push('\n');
        }
        csv
    }
}
