//! Vendor invoices
//!
//! Invoices arrive from the procurement intake. Settlement owns `paid_amount`
//! and the list of payments already applied to it; everything else about
//! the payable position is derived from those.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, Money, MoneyError, PaymentId, PurchaseOrderId, VendorId};

/// Payment position of an invoice, derived from `paid_amount`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoicePaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

/// A vendor invoice
///
/// # Invariants
///
/// - `net_payable = amount + tax_amount - withholding_amount`
/// - `outstanding = max(0, net_payable - paid_amount)`
/// - `version` increases by one on every stored write
/// - a payment id appears in `applied_payments` at most once, and only
///   together with its gross amount in `paid_amount`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub vendor_id: VendorId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Pre-tax amount
    pub amount: Money,
    pub tax_amount: Money,
    pub withholding_amount: Money,
    pub paid_amount: Money,
    /// Payments whose gross amount is already in `paid_amount`
    #[serde(default)]
    pub applied_payments: Vec<PaymentId>,
    /// Optimistic concurrency token
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn net_payable(&self) -> Result<Money, MoneyError> {
        self.amount
            .checked_add(&self.tax_amount)?
            .checked_sub(&self.withholding_amount)
    }

    /// What is still owed, never negative
    pub fn outstanding(&self) -> Result<Money, MoneyError> {
        Ok(self.net_payable()?.checked_sub(&self.paid_amount)?.floor_at_zero())
    }

    pub fn payment_status(&self) -> Result<InvoicePaymentStatus, MoneyError> {
        let outstanding = self.outstanding()?;
        Ok(if outstanding.is_zero() {
            InvoicePaymentStatus::Paid
        } else if self.paid_amount.is_positive() {
            InvoicePaymentStatus::PartiallyPaid
        } else {
            InvoicePaymentStatus::Unpaid
        })
    }

    pub fn is_paid(&self) -> Result<bool, MoneyError> {
        Ok(self.payment_status()? == InvoicePaymentStatus::Paid)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> Result<bool, MoneyError> {
        Ok(today > self.due_date && !self.is_paid()?)
    }

    /// Increases `paid_amount` by a settlement or credit note
    pub fn record_settlement(&mut self, amount: Money) -> Result<(), MoneyError> {
        self.paid_amount = self.paid_amount.checked_add(&amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies a payment's gross amount once
    ///
    /// Returns false, changing nothing, when the payment was already applied.
    pub fn apply_payment(&mut self, payment_id: PaymentId, gross: Money) -> Result<bool, MoneyError> {
        if self.has_applied(payment_id) {
            return Ok(false);
        }
        self.record_settlement(gross)?;
        self.applied_payments.push(payment_id);
        Ok(true)
    }

    pub fn has_applied(&self, payment_id: PaymentId) -> bool {
        self.applied_payments.contains(&payment_id)
    }

    /// Decreases `paid_amount` for a debit note, floored at zero
    pub fn reverse_settlement(&mut self, amount: Money) -> Result<(), MoneyError> {
        self.paid_amount = self.paid_amount.checked_sub(&amount)?.floor_at_zero();
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Filter for listing invoices
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    pub vendor_id: Option<VendorId>,
    /// Only invoices with something still outstanding
    pub unpaid_only: bool,
}

impl InvoiceQuery {
    pub fn for_vendor(vendor_id: VendorId) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            unpaid_only: false,
        }
    }

    pub fn unpaid() -> Self {
        Self {
            vendor_id: None,
            unpaid_only: true,
        }
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.vendor_id.map_or(true, |v| invoice.vendor_id == v)
            && (!self.unpaid_only || matches!(invoice.is_paid(), Ok(false)))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use core_kernel::Currency;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn outstanding_tracks_paid_amount(
            net_cents in 1i64..10_000_000,
            events in proptest::collection::vec((any::<bool>(), 1i64..5_000_000), 0..20),
        ) {
            let now = Utc::now();
            let zero = Money::zero(Currency::USD);
            let mut invoice = Invoice {
                id: InvoiceId::new(),
                invoice_number: "INV-P".into(),
                vendor_id: VendorId::new(),
                purchase_order_id: None,
                invoice_date: now.date_naive(),
                due_date: now.date_naive(),
                amount: Money::from_minor(net_cents, Currency::USD),
                tax_amount: zero,
                withholding_amount: zero,
                paid_amount: zero,
                applied_payments: Vec::new(),
                version: 0,
                created_at: now,
                updated_at: now,
            };

            for (settle, cents) in events {
                let amount = Money::from_minor(cents, Currency::USD);
                if settle {
                    let cap = invoice.outstanding().unwrap();
                    let capped = if amount > cap { cap } else { amount };
                    invoice.record_settlement(capped).unwrap();
                } else {
                    invoice.reverse_settlement(amount).unwrap();
                }

                let outstanding = invoice.outstanding().unwrap();
                prop_assert!(!outstanding.is_negative());
                prop_assert!(!invoice.paid_amount.is_negative());
                prop_assert_eq!(
                    outstanding,
                    invoice.net_payable().unwrap().checked_sub(&invoice.paid_amount).unwrap()
                );
            }
        }
    }
}
