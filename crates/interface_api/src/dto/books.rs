//! Adjustment, accrual, batch and period DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use core_kernel::{Currency, InvoiceId, Money, PurchaseOrderId, VendorId};
use domain_ledger::{JournalQuery, ReferenceKind};
use domain_payables::{
    AccrualReference, AccrualStatus, AdjustmentKind, AdjustmentQuery, CreateAccrualRequest,
    CreateAdjustmentRequest, PaymentMethod,
};

use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdjustmentBody {
    pub kind: AdjustmentKind,
    pub invoice_id: InvoiceId,
    pub amount: Decimal,
    #[validate(length(min = 1, max = 1000, message = "A reason is required"))]
    pub reason: String,
}

impl CreateAdjustmentBody {
    pub fn into_request(self, currency: Currency) -> CreateAdjustmentRequest {
        CreateAdjustmentRequest {
            kind: self.kind,
            invoice_id: self.invoice_id,
            amount: Money::new(self.amount, currency),
            reason: self.reason,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdjustmentListParams {
    pub invoice_id: Option<InvoiceId>,
    pub vendor_id: Option<VendorId>,
}

impl From<AdjustmentListParams> for AdjustmentQuery {
    fn from(params: AdjustmentListParams) -> Self {
        AdjustmentQuery {
            invoice_id: params.invoice_id,
            vendor_id: params.vendor_id,
        }
    }
}

/// Exactly one of `purchase_order_id` / `vendor_id` names what is accrued
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccrualBody {
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub vendor_id: Option<VendorId>,
    pub estimated_amount: Decimal,
    pub accrual_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: String,
}

impl CreateAccrualBody {
    pub fn into_request(self, currency: Currency, today: NaiveDate) -> Result<CreateAccrualRequest, ApiError> {
        let reference = match (self.purchase_order_id, self.vendor_id) {
            (Some(po), None) => AccrualReference::PurchaseOrder(po),
            (None, Some(vendor)) => AccrualReference::Vendor(vendor),
            _ => {
                return Err(ApiError::Validation(
                    "Exactly one of purchase_order_id or vendor_id is required".to_string(),
                ))
            }
        };
        Ok(CreateAccrualRequest {
            reference,
            estimated_amount: Money::new(self.estimated_amount, currency),
            accrual_date: self.accrual_date.unwrap_or(today),
            description: self.description,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AccrualListParams {
    pub status: Option<AccrualStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchBody {
    #[validate(length(min = 1, message = "At least one invoice is required"))]
    pub invoice_ids: Vec<InvoiceId>,
    pub method: PaymentMethod,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PeriodBody {
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
    #[validate(range(min = 1900, max = 9999))]
    pub year: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct JournalListParams {
    pub reference_type: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl JournalListParams {
    pub fn into_query(self) -> Result<JournalQuery, ApiError> {
        let kind = self
            .reference_type
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<ReferenceKind>())
            .transpose()?;
        Ok(JournalQuery {
            kind,
            reference: None,
            month: self.month,
            year: self.year,
        })
    }
}
