//! Vendor payments
//!
//! A payment's lifecycle is the pair `(payment_status, approval_status)`:
//!
//! ```text
//!   create ──► Pending/Draft ──submit──┐
//!      │                               ▼
//!      ├──── settled < threshold ──► Pending/N/A ──(due)──► Success/N/A
//!      │
//!      └──── settled ≥ threshold ──► Pending/Submitted
//!                                      │approve          │reject
//!                                      ▼                 ▼
//!                               Pending/Approved    Failed/Rejected
//!                                      │(due)
//!                                      ▼
//!                               Success/Approved
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Actor, BatchId, InvoiceId, Money, MoneyError, PaymentId, TransactionId, VendorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    BankTransfer,
    Wire,
    Ach,
    Check,
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Saved but not yet submitted to the approval gate
    Draft,
    /// Waiting for an explicit approve/reject
    Submitted,
    Approved,
    Rejected,
    /// Below the threshold; no approval needed
    #[serde(rename = "N/A")]
    NotRequired,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Draft => "Draft",
            ApprovalStatus::Submitted => "Submitted",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
            ApprovalStatus::NotRequired => "N/A",
        };
        f.write_str(s)
    }
}

/// An approve/reject verdict on a submitted payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// One step in a payment's approval trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub status: ApprovalStatus,
    pub actor: Actor,
    pub comment: Option<String>,
    pub at: DateTime<Utc>,
}

/// A payment against one invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub vendor_id: VendorId,
    /// Cash actually paid, after any early-payment discount
    pub amount: Money,
    pub method: PaymentMethod,
    /// Generated reference quoted on the bank transfer; unique
    pub transaction_id: String,
    pub payment_status: PaymentStatus,
    pub approval_status: ApprovalStatus,
    /// Day the discount was quoted for; the settlement day once settled
    pub payment_date: NaiveDate,
    pub scheduled_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub discount_applied: Money,
    pub discount_percentage: Decimal,
    pub approval_history: Vec<ApprovalRecord>,
    pub retry_count: u32,
    pub failure_reason: Option<String>,
    pub batch_id: Option<BatchId>,
    pub notes: Option<String>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        invoice_id: InvoiceId,
        vendor_id: VendorId,
        amount: Money,
        method: PaymentMethod,
        payment_date: NaiveDate,
        created_by: Actor,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new_v7(),
            invoice_id,
            vendor_id,
            amount,
            method,
            transaction_id: TransactionId::new_v7().to_string(),
            payment_status: PaymentStatus::Pending,
            approval_status: ApprovalStatus::NotRequired,
            payment_date,
            scheduled_date: None,
            paid_at: None,
            discount_applied: Money::zero(amount.currency()),
            discount_percentage: Decimal::ZERO,
            approval_history: Vec::new(),
            retry_count: 0,
            failure_reason: None,
            batch_id: None,
            notes: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Amount relieved from the invoice: cash plus discount
    pub fn gross_amount(&self) -> Result<Money, MoneyError> {
        self.amount.checked_add(&self.discount_applied)
    }

    pub fn has_discount(&self) -> bool {
        self.discount_applied.is_positive()
    }

    /// Deferred to a date after `today`
    pub fn is_scheduled_after(&self, today: NaiveDate) -> bool {
        self.scheduled_date.map_or(false, |d| d > today)
    }

    /// Pending, cleared for settlement, and its scheduled date (if any) has arrived
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.payment_status == PaymentStatus::Pending
            && matches!(self.approval_status, ApprovalStatus::Approved | ApprovalStatus::NotRequired)
            && !self.is_scheduled_after(today)
    }

    pub fn record_approval(&mut self, status: ApprovalStatus, actor: &Actor, comment: Option<String>) {
        let now = Utc::now();
        self.approval_status = status;
        self.approval_history.push(ApprovalRecord {
            status,
            actor: actor.clone(),
            comment,
            at: now,
        });
        self.updated_at = now;
    }

    pub fn mark_success(&mut self) {
        let now = Utc::now();
        self.payment_status = PaymentStatus::Success;
        self.paid_at = Some(now);
        self.failure_reason = None;
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.payment_status = PaymentStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }
}

/// Filter for listing payments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentQuery {
    pub invoice_id: Option<InvoiceId>,
    pub vendor_id: Option<VendorId>,
    pub payment_status: Option<PaymentStatus>,
    pub approval_status: Option<ApprovalStatus>,
    pub batch_id: Option<BatchId>,
}

impl PaymentQuery {
    pub fn with_status(status: PaymentStatus) -> Self {
        Self {
            payment_status: Some(status),
            ..Default::default()
        }
    }

    pub fn for_vendor(vendor_id: VendorId) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.invoice_id.map_or(true, |id| payment.invoice_id == id)
            && self.vendor_id.map_or(true, |id| payment.vendor_id == id)
            && self.payment_status.map_or(true, |s| payment.payment_status == s)
            && self.approval_status.map_or(true, |s| payment.approval_status == s)
            && self.batch_id.map_or(true, |id| payment.batch_id == Some(id))
    }
}

/// Input to `PaymentService::create_payment`
#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    pub invoice_id: InvoiceId,
    /// Amount to relieve from the invoice, before any discount
    pub amount: Money,
    pub method: PaymentMethod,
    /// Intended payment date, today or later; defaults to today
    ///
    /// Only a preview: the discount is quoted again on the day the payment
    /// settles.
    pub payment_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    /// Save without entering the approval gate
    pub draft: bool,
    pub notes: Option<String>,
}

impl CreatePaymentRequest {
    pub fn new(invoice_id: InvoiceId, amount: Money, method: PaymentMethod) -> Self {
        Self {
            invoice_id,
            amount,
            method,
            payment_date: None,
            scheduled_date: None,
            draft: false,
            notes: None,
        }
    }

    pub fn on(mut self, payment_date: NaiveDate) -> Self {
        self.payment_date = Some(payment_date);
        self
    }

    pub fn scheduled_for(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    pub fn as_draft(mut self) -> Self {
        self.draft = true;
        self
    }
}

/// Editable fields of a payment that has not settled
#[derive(Debug, Clone, Default)]
pub struct UpdatePaymentRequest {
    pub method: Option<PaymentMethod>,
    pub scheduled_date: Option<NaiveDate>,
    pub clear_schedule: bool,
    pub notes: Option<String>,
}
