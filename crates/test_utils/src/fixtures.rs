//! Pre-built Test Fixtures
//!
//! Ready-to-use, predictable test data for settlement tests.

use chrono::{Duration, NaiveDate, Utc};
use core_kernel::{Actor, Currency, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    /// A routine invoice amount, well under the approval threshold
    pub fn usd_invoice() -> Money {
        Money::new(dec!(1200.00), Currency::USD)
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }
}

/// Fixture for business dates
pub struct DateFixtures;

impl DateFixtures {
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub fn days_from_today(days: i64) -> NaiveDate {
        Self::today() + Duration::days(days)
    }

    /// A fixed invoice date inside January 2024
    pub fn invoice_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    /// Net-30 due date for [`DateFixtures::invoice_date`]
    pub fn due_date() -> NaiveDate {
        Self::invoice_date() + Duration::days(30)
    }
}

/// Fixture for acting users
pub struct ActorFixtures;

impl ActorFixtures {
    pub fn clerk() -> Actor {
        Actor::new("ap.clerk")
    }

    pub fn controller() -> Actor {
        Actor::new("finance.controller")
    }
}

/// Fixture for document numbers
pub struct StringFixtures;

impl StringFixtures {
    pub fn vendor_name() -> &'static str {
        "Northwind Components"
    }

    /// A short random suffix, so document numbers never collide across tests
    pub fn unique_suffix() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    }

    pub fn invoice_number() -> String {
        format!("INV-{}", Self::unique_suffix())
    }

    pub fn po_number() -> String {
        format!("PO-{}", Self::unique_suffix())
    }
}
