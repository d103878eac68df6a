//! Payment DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use core_kernel::{BatchId, Currency, InvoiceId, Money, VendorId};
use domain_payables::{
    ApprovalDecision, ApprovalStatus, CreatePaymentRequest, PaymentMethod, PaymentQuery,
    PaymentStatus, UpdatePaymentRequest,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentBody {
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub draft: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreatePaymentBody {
    pub fn into_request(self, currency: Currency) -> CreatePaymentRequest {
        CreatePaymentRequest {
            invoice_id: self.invoice_id,
            amount: Money::new(self.amount, currency),
            method: self.method,
            payment_date: self.payment_date,
            scheduled_date: self.scheduled_date,
            draft: self.draft,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentBody {
    pub method: Option<PaymentMethod>,
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub clear_schedule: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<UpdatePaymentBody> for UpdatePaymentRequest {
    fn from(body: UpdatePaymentBody) -> Self {
        UpdatePaymentRequest {
            method: body.method,
            scheduled_date: body.scheduled_date,
            clear_schedule: body.clear_schedule,
            notes: body.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApprovalBody {
    pub decision: ApprovalDecision,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelBody {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListParams {
    pub invoice_id: Option<InvoiceId>,
    pub vendor_id: Option<VendorId>,
    pub status: Option<PaymentStatus>,
    pub approval_status: Option<ApprovalStatus>,
    pub batch_id: Option<BatchId>,
}

impl From<PaymentListParams> for PaymentQuery {
    fn from(params: PaymentListParams) -> Self {
        PaymentQuery {
            invoice_id: params.invoice_id,
            vendor_id: params.vendor_id,
            payment_status: params.status,
            approval_status: params.approval_status,
            batch_id: params.batch_id,
        }
    }
}
