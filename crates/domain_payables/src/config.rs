//! Settlement configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};

/// Domain-level knobs handed to the settlement services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Settled amounts at or above this need an explicit approval
    pub approval_threshold: Decimal,
    /// Base currency of the books
    pub currency: Currency,
    /// Allowed invoice-vs-PO price difference, in percent
    pub price_tolerance_pct: Decimal,
    /// Scheduled settlements failing transiently this many times are marked Failed
    pub max_settlement_retries: u32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            approval_threshold: dec!(150000),
            currency: Currency::USD,
            price_tolerance_pct: Decimal::ZERO,
            max_settlement_retries: 3,
        }
    }
}

impl SettlementConfig {
    pub fn approval_threshold(&self) -> Money {
        Money::new(self.approval_threshold, self.currency)
    }

    pub fn with_approval_threshold(mut self, threshold: Decimal) -> Self {
        self.approval_threshold = threshold;
        self
    }

    pub fn with_price_tolerance(mut self, pct: Decimal) -> Self {
        self.price_tolerance_pct = pct;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_settlement_retries = retries;
        self
    }
}
