//! Early-payment discount computation

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use core_kernel::{Money, MoneyError, Rate};
use crate::vendor::Vendor;

/// How much of a requested amount is actually paid in cash
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiscountQuote {
    /// Percentage applied, zero when no discount
    pub percentage: Decimal,
    pub discount: Money,
    /// `amount - discount`
    pub settled: Money,
}

impl DiscountQuote {
    pub fn none(amount: Money) -> Self {
        Self {
            percentage: Decimal::ZERO,
            discount: Money::zero(amount.currency()),
            settled: amount,
        }
    }

    pub fn applies(&self) -> bool {
        self.discount.is_positive()
    }
}

/// Quotes the vendor's early-payment discount for paying `amount` on `payment_date`
///
/// The offer holds from the invoice date through `window_days` after it,
/// inclusive. Outside the window, or when the vendor offers nothing, the
/// full amount is settled.
pub fn early_payment_discount(
    vendor: &Vendor,
    invoice_date: NaiveDate,
    payment_date: NaiveDate,
    amount: Money,
) -> Result<DiscountQuote, MoneyError> {
    let offer = match vendor.early_payment_discount {
        Some(offer) if offer.percentage > Decimal::ZERO => offer,
        _ => return Ok(DiscountQuote::none(amount)),
    };

    let days = (payment_date - invoice_date).num_days();
    if days < 0 || days > i64::from(offer.window_days) {
        return Ok(DiscountQuote::none(amount));
    }

    let discount = Rate::from_percentage(offer.percentage).apply(&amount);
    Ok(DiscountQuote {
        percentage: offer.percentage,
        discount,
        settled: amount.checked_sub(&discount)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn invoice_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    fn amount() -> Money {
        Money::new(dec!(100000), Currency::USD)
    }

    #[test]
    fn test_discount_within_window() {
        let vendor = Vendor::new("Acme Supplies").with_discount(dec!(2), 10);
        let quote = early_payment_discount(&vendor, invoice_date(), invoice_date() + Duration::days(5), amount()).unwrap();
        assert!(quote.applies());
        assert_eq!(quote.discount.amount(), dec!(2000));
        assert_eq!(quote.settled.amount(), dec!(98000));
        assert_eq!(quote.percentage, dec!(2));
    }

    #[test]
    fn test_last_day_of_window_still_applies() {
        let vendor = Vendor::new("Acme Supplies").with_discount(dec!(2), 10);
        let quote = early_payment_discount(&vendor, invoice_date(), invoice_date() + Duration::days(10), amount()).unwrap();
        assert!(quote.applies());
    }

    #[test]
    fn test_no_discount_after_window() {
        let vendor = Vendor::new("Acme Supplies").with_discount(dec!(2), 10);
        let quote = early_payment_discount(&vendor, invoice_date(), invoice_date() + Duration::days(11), amount()).unwrap();
        assert!(!quote.applies());
        assert_eq!(quote.settled, amount());
    }

    #[test]
    fn test_no_offer() {
        let vendor = Vendor::new("Plain Vendor");
        let quote = early_payment_discount(&vendor, invoice_date(), invoice_date(), amount()).unwrap();
        assert_eq!(quote, DiscountQuote::none(amount()));
    }

    #[test]
    fn test_payment_dated_before_invoice_gets_no_discount() {
        let vendor = Vendor::new("Acme Supplies").with_discount(dec!(2), 10);
        let quote = early_payment_discount(&vendor, invoice_date(), invoice_date() - Duration::days(1), amount()).unwrap();
        assert!(!quote.applies());
    }
}
