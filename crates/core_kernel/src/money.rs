//! Currency amounts for settlement and ledger postings
//!
//! Every invoice total, payment, discount and journal line is a `Money`: a
//! `rust_decimal` amount tagged with its currency. Arithmetic is checked,
//! so mixing currencies surfaces as a `MoneyError` instead of a wrong
//! balance.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Internal precision; discounts and rates are computed at this scale
/// before being rounded to the currency's minor unit.
const WORKING_SCALE: u32 = 4;

/// ISO 4217 currencies accepted as book or document currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    INR,
    SGD,
}

impl Currency {
    pub const ALL: [Currency; 6] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::INR,
        Currency::SGD,
    ];

    /// Digits after the decimal point in the minor unit
    pub fn decimal_places(&self) -> u32 {
        if matches!(self, Currency::JPY) {
            0
        } else {
            2
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::INR => "₹",
            Currency::SGD => "S$",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::INR => "INR",
            Currency::SGD => "SGD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| MoneyError::UnknownCurrency(code.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot combine {0} with {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}

/// An amount in a single currency, held at four decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(WORKING_SCALE),
            currency,
        }
    }

    /// Builds an amount from minor units, e.g. cents for USD or yen for JPY
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self::new(Decimal::new(minor_units, currency.decimal_places()), currency)
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(dec!(0), currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self::new(self.amount.abs(), self.currency)
    }

    /// Same magnitude, opposite sign
    pub fn negated(&self) -> Self {
        Self::new(-self.amount, self.currency)
    }

    /// Negative amounts become zero; used where a balance may not go below nil
    pub fn floor_at_zero(&self) -> Self {
        Self::new(self.amount.max(Decimal::ZERO), self.currency)
    }

    /// Rounds half away from zero to the currency's minor unit
    pub fn round_to_currency(&self) -> Self {
        Self::new(self.amount.round_dp(self.currency.decimal_places()), self.currency)
    }

    /// # Errors
    ///
    /// `CurrencyMismatch` when `other` is in a different currency.
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    /// # Errors
    ///
    /// `CurrencyMismatch` when `other` is in a different currency.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Scales the amount, keeping working precision
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }

    /// Same currency and within `tolerance` of each other
    pub fn approx_eq(&self, other: &Money, tolerance: Decimal) -> bool {
        self.currency == other.currency && (self.amount - other.amount).abs() <= tolerance
    }

    /// Totals `items`, stopping at the first amount not in `currency`
    pub fn sum<'a>(
        currency: Currency,
        items: impl IntoIterator<Item = &'a Money>,
    ) -> Result<Money, MoneyError> {
        let mut total = Money::zero(currency);
        for item in items {
            total = total.checked_add(item)?;
        }
        Ok(total)
    }

    fn same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch(
                self.currency.code().to_string(),
                other.currency.code().to_string(),
            ))
        }
    }
}

/// Amounts in different currencies are unordered
impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.currency == other.currency).then(|| self.amount.cmp(&other.amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.currency.decimal_places() as usize;
        write!(f, "{} {:.*}", self.currency.symbol(), places, self.amount)
    }
}

/// A fractional rate such as an early-payment discount percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    value: Decimal,
}

impl Rate {
    /// From a fraction, so `0.02` is two percent
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// From a percentage, so `2` is two percent
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self::new(percentage / dec!(100))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    /// The rate's share of `money`, rounded to the minor unit
    pub fn apply(&self, money: &Money) -> Money {
        money.multiply(self.value).round_to_currency()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().round_dp(WORKING_SCALE).normalize())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn checked_add_is_associative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64,
            c in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a, Currency::USD);
            let mb = Money::from_minor(b, Currency::USD);
            let mc = Money::from_minor(c, Currency::USD);

            let left = ma.checked_add(&mb).unwrap().checked_add(&mc).unwrap();
            let right = ma.checked_add(&mb.checked_add(&mc).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }

        #[test]
        fn sum_matches_minor_unit_total(values in proptest::collection::vec(0i64..10_000_000i64, 0..20)) {
            let amounts: Vec<Money> = values.iter().map(|v| Money::from_minor(*v, Currency::USD)).collect();
            let total = Money::sum(Currency::USD, &amounts).unwrap();
            prop_assert_eq!(total, Money::from_minor(values.iter().sum(), Currency::USD));
        }
    }
}
