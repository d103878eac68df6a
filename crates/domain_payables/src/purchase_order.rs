//! Purchase orders as seen by settlement

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Money, PurchaseOrderId, VendorId};

/// Fulfilment state of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderStatus {
    Draft,
    PendingApproval,
    Approved,
    Ordered,
    Delivered,
    ReceiptConfirmed,
    Cancelled,
}

/// Approval state of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub vendor_id: VendorId,
    pub status: PurchaseOrderStatus,
    pub approval_status: PoApprovalStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn new(po_number: impl Into<String>, vendor_id: VendorId, total_amount: Money) -> Self {
        Self {
            id: PurchaseOrderId::new_v7(),
            po_number: po_number.into(),
            vendor_id,
            status: PurchaseOrderStatus::Draft,
            approval_status: PoApprovalStatus::Pending,
            total_amount,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: PurchaseOrderStatus, approval_status: PoApprovalStatus) -> Self {
        self.status = status;
        self.approval_status = approval_status;
        self
    }

    /// Goods have arrived, so invoices against this order may be paid
    pub fn is_received(&self) -> bool {
        matches!(
            self.status,
            PurchaseOrderStatus::Delivered | PurchaseOrderStatus::ReceiptConfirmed
        )
    }
}
