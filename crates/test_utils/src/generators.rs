//! Property-Based Test Generators
//!
//! Proptest strategies producing settlement data that respects domain
//! invariants: positive USD installments that sum to an invoice total,
//! real payment methods and plausible discount terms.

use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_payables::PaymentMethod;

/// Splits a total into `1..=max_parts` positive installments of at most $10,000
pub fn installments_strategy(max_parts: usize) -> impl Strategy<Value = (Money, Vec<Money>)> {
    proptest::collection::vec(1i64..1_000_000i64, 1..=max_parts.max(1)).prop_map(|parts| {
        let total: i64 = parts.iter().sum();
        (
            Money::from_minor(total, Currency::USD),
            parts
                .into_iter()
                .map(|p| Money::from_minor(p, Currency::USD))
                .collect(),
        )
    })
}

/// Strategy for early-payment discount percentages (0.25% to 10%)
pub fn discount_percentage_strategy() -> impl Strategy<Value = Decimal> {
    (25u32..=1000u32).prop_map(|n| Decimal::new(n as i64, 2))
}

/// Strategy for discount windows, in days
pub fn discount_window_strategy() -> impl Strategy<Value = u32> {
    1u32..=60u32
}

pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::BankTransfer),
        Just(PaymentMethod::Wire),
        Just(PaymentMethod::Ach),
        Just(PaymentMethod::Check),
        Just(PaymentMethod::Card),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_installments_sum_to_total((total, parts) in installments_strategy(6)) {
            let sum = Money::sum(Currency::USD, parts.iter()).unwrap();
            prop_assert_eq!(sum, total);
            prop_assert!(parts.iter().all(Money::is_positive));
        }

        #[test]
        fn test_discount_percentage_bounds(pct in discount_percentage_strategy()) {
            prop_assert!(pct > Decimal::ZERO && pct <= Decimal::from(10));
        }
    }
}
