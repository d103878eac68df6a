//! Custom Test Assertions
//!
//! Assertion helpers for settlement types that give more meaningful
//! failure messages than a bare `assert_eq!`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::Money;
use domain_ledger::{JournalEntry, TrialBalance, VendorLedger};
use domain_payables::{Payment, PaymentStatus};

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts equality to the cent
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_money_approx_eq(actual, expected, dec!(0.001));
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that a journal entry is balanced and its totals match its lines
pub fn assert_entry_balanced(entry: &JournalEntry) {
    assert!(entry.is_balanced, "Journal entry {} is flagged unbalanced", entry.id);
    assert_money_eq(&entry.total_debit, &entry.total_credit);

    let currency = entry.total_debit.currency();
    let debits = Money::sum(currency, entry.lines.iter().map(|l| &l.debit))
        .unwrap_or_else(|e| panic!("Journal entry {} mixes currencies: {}", entry.id, e));
    let credits = Money::sum(currency, entry.lines.iter().map(|l| &l.credit))
        .unwrap_or_else(|e| panic!("Journal entry {} mixes currencies: {}", entry.id, e));
    assert_money_eq(&debits, &entry.total_debit);
    assert_money_eq(&credits, &entry.total_credit);
}

pub fn assert_trial_balance_balanced(trial: &TrialBalance) {
    assert!(
        trial.is_balanced,
        "Trial balance is off: debit={}, credit={}",
        trial.total_debit,
        trial.total_credit
    );
}

/// Asserts the vendor ledger's totals match its entry log and outstanding formula
pub fn assert_vendor_ledger_consistent(ledger: &VendorLedger) {
    assert!(
        ledger.is_consistent(),
        "Vendor ledger {} is inconsistent: invoiced={}, paid={}, credit={}, debit={}, outstanding={}",
        ledger.vendor_id,
        ledger.total_invoiced,
        ledger.total_paid,
        ledger.credit_balance,
        ledger.debit_balance,
        ledger.total_outstanding
    );
}

/// Asserts a payment's status, showing the failure reason when it differs
pub fn assert_payment_status(payment: &Payment, expected: PaymentStatus) {
    assert_eq!(
        payment.payment_status, expected,
        "Payment {} is {:?} (failure reason: {:?})",
        payment.id, payment.payment_status, payment.failure_reason
    );
}
