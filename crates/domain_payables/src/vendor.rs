//! Vendors as seen by settlement
//!
//! Vendor master data is owned by the procurement back office; settlement
//! only reads the name and the early-payment discount offer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::VendorId;

/// Vendor-offered percentage reduction for paying within a day window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyPaymentDiscount {
    /// Percentage off, e.g. 2 for 2%
    pub percentage: Decimal,
    /// Days after the invoice date during which the offer holds
    pub window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub early_payment_discount: Option<EarlyPaymentDiscount>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Vendor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: VendorId::new_v7(),
            name: name.into(),
            early_payment_discount: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_discount(mut self, percentage: Decimal, window_days: u32) -> Self {
        self.early_payment_discount = Some(EarlyPaymentDiscount { percentage, window_days });
        self
    }
}
