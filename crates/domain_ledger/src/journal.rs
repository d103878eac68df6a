//! Journal entries, references and posting templates
//!
//! A journal entry is immutable once created. Corrections are posted as new
//! entries (see [`JournalTemplates::inverse`]).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{
    AccountId, AccrualId, Actor, AdjustmentId, BatchId, Currency, InvoiceId, JournalEntryId,
    Money, PaymentId,
};
use crate::account::AccountCode;
use crate::error::LedgerError;

/// Maximum difference between debits and credits still treated as balanced
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// The business record a journal entry (or vendor ledger entry) echoes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum JournalReference {
    Invoice(InvoiceId),
    Payment(PaymentId),
    Adjustment(AdjustmentId),
    Accrual(AccrualId),
    Batch(BatchId),
}

impl JournalReference {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            JournalReference::Invoice(_) => ReferenceKind::Invoice,
            JournalReference::Payment(_) => ReferenceKind::Payment,
            JournalReference::Adjustment(_) => ReferenceKind::Adjustment,
            JournalReference::Accrual(_) => ReferenceKind::Accrual,
            JournalReference::Batch(_) => ReferenceKind::Batch,
        }
    }

    /// The referenced record's id, rendered with its prefix
    pub fn id_string(&self) -> String {
        match self {
            JournalReference::Invoice(id) => id.to_string(),
            JournalReference::Payment(id) => id.to_string(),
            JournalReference::Adjustment(id) => id.to_string(),
            JournalReference::Accrual(id) => id.to_string(),
            JournalReference::Batch(id) => id.to_string(),
        }
    }
}

impl fmt::Display for JournalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_string())
    }
}

/// Discriminant of [`JournalReference`], used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Invoice,
    Payment,
    Adjustment,
    Accrual,
    Batch,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Invoice => "Invoice",
            ReferenceKind::Payment => "Payment",
            ReferenceKind::Adjustment => "Adjustment",
            ReferenceKind::Accrual => "Accrual",
            ReferenceKind::Batch => "Batch",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(ReferenceKind::Invoice),
            "payment" => Ok(ReferenceKind::Payment),
            "adjustment" => Ok(ReferenceKind::Adjustment),
            "accrual" => Ok(ReferenceKind::Accrual),
            "batch" => Ok(ReferenceKind::Batch),
            other => Err(LedgerError::InvalidLine(format!("unknown reference type '{}'", other))),
        }
    }
}

/// One side of a journal entry
///
/// Exactly one of `debit` / `credit` is non-zero. `account_id` is filled in
/// by the engine when the code is resolved against the live chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub account_code: AccountCode,
    pub account_id: Option<AccountId>,
    pub debit: Money,
    pub credit: Money,
}

impl JournalLine {
    pub fn debit(account_code: AccountCode, amount: Money) -> Self {
        Self {
            account_code,
            account_id: None,
            debit: amount,
            credit: Money::zero(amount.currency()),
        }
    }

    pub fn credit(account_code: AccountCode, amount: Money) -> Self {
        Self {
            account_code,
            account_id: None,
            debit: Money::zero(amount.currency()),
            credit: amount,
        }
    }

    /// Signed effect of this line on its account balance
    pub fn balance_delta(&self) -> Result<Money, LedgerError> {
        Ok(self.debit.checked_sub(&self.credit)?)
    }

    /// The same line with debit and credit swapped
    pub fn inverted(&self) -> Self {
        Self {
            account_code: self.account_code,
            account_id: self.account_id,
            debit: self.credit,
            credit: self.debit,
        }
    }

    fn validate(&self, currency: Currency) -> Result<(), LedgerError> {
        if self.debit.currency() != currency || self.credit.currency() != currency {
            return Err(LedgerError::InvalidLine(format!(
                "line on {} is not in {}",
                self.account_code, currency
            )));
        }
        if self.debit.is_negative() || self.credit.is_negative() {
            return Err(LedgerError::InvalidLine(format!(
                "line on {} has a negative amount",
                self.account_code
            )));
        }
        if self.debit.is_zero() == self.credit.is_zero() {
            return Err(LedgerError::InvalidLine(format!(
                "line on {} must have exactly one of debit or credit",
                self.account_code
            )));
        }
        Ok(())
    }
}

/// Checks a line set and returns `(total_debit, total_credit)`
///
/// Rejects empty sets, malformed lines and sets whose totals differ by more
/// than [`BALANCE_TOLERANCE`].
pub fn validate_lines(lines: &[JournalLine], currency: Currency) -> Result<(Money, Money), LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::EmptyEntry);
    }
    for line in lines {
        line.validate(currency)?;
    }

    let total_debit = Money::sum(currency, lines.iter().map(|l| &l.debit))?;
    let total_credit = Money::sum(currency, lines.iter().map(|l| &l.credit))?;

    if !total_debit.approx_eq(&total_credit, BALANCE_TOLERANCE) {
        return Err(LedgerError::UnbalancedEntry {
            debits: total_debit.amount(),
            credits: total_credit.amount(),
        });
    }
    Ok((total_debit, total_credit))
}

/// A posted journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub reference: JournalReference,
    pub description: String,
    pub lines: Vec<JournalLine>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub is_balanced: bool,
    /// Business date of the event; determines the accounting period
    pub entry_date: NaiveDate,
    pub period_month: u32,
    pub period_year: i32,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Builds an entry from lines already checked by [`validate_lines`]
    pub(crate) fn new(
        reference: JournalReference,
        description: impl Into<String>,
        lines: Vec<JournalLine>,
        totals: (Money, Money),
        entry_date: NaiveDate,
        created_by: Actor,
    ) -> Self {
        let (total_debit, total_credit) = totals;
        Self {
            id: JournalEntryId::new_v7(),
            reference,
            description: description.into(),
            lines,
            total_debit,
            total_credit,
            is_balanced: total_debit.approx_eq(&total_credit, BALANCE_TOLERANCE),
            entry_date,
            period_month: entry_date.month(),
            period_year: entry_date.year(),
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// Direction of an invoice adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentKind {
    /// Reduces what is owed to the vendor
    Credit,
    /// Increases what is owed to the vendor
    Debit,
}

/// Canonical line sets for every settlement event
///
/// All templates produce balanced sets and leave out zero-amount lines.
pub struct JournalTemplates;

impl JournalTemplates {
    /// Invoice intake: expense and input tax against withholding and payable
    pub fn invoice(amount: Money, tax: Money, withholding: Money) -> Result<Vec<JournalLine>, LedgerError> {
        let payable = amount.checked_add(&tax)?.checked_sub(&withholding)?;
        Ok(non_zero(vec![
            JournalLine::debit(AccountCode::PurchasesExpense, amount),
            JournalLine::debit(AccountCode::InputTaxReceivable, tax),
            JournalLine::credit(AccountCode::WithholdingTaxPayable, withholding),
            JournalLine::credit(AccountCode::AccountsPayable, payable),
        ]))
    }

    /// Settlement: payable relieved by `settled + discount`, cash out by `settled`
    ///
    /// The discount line to purchase discounts only appears when a discount
    /// was taken.
    pub fn payment(settled: Money, discount: Money) -> Result<Vec<JournalLine>, LedgerError> {
        let gross = settled.checked_add(&discount)?;
        Ok(non_zero(vec![
            JournalLine::debit(AccountCode::AccountsPayable, gross),
            JournalLine::credit(AccountCode::Cash, settled),
            JournalLine::credit(AccountCode::PurchaseDiscounts, discount),
        ]))
    }

    /// Credit notes reduce the payable, debit notes raise it
    pub fn adjustment(kind: AdjustmentKind, amount: Money) -> Vec<JournalLine> {
        match kind {
            AdjustmentKind::Credit => vec![
                JournalLine::debit(AccountCode::AccountsPayable, amount),
                JournalLine::credit(AccountCode::PurchasesExpense, amount),
            ],
            AdjustmentKind::Debit => vec![
                JournalLine::debit(AccountCode::PurchasesExpense, amount),
                JournalLine::credit(AccountCode::AccountsPayable, amount),
            ],
        }
    }

    pub fn accrual(amount: Money) -> Vec<JournalLine> {
        vec![
            JournalLine::debit(AccountCode::PurchasesExpense, amount),
            JournalLine::credit(AccountCode::AccruedLiabilities, amount),
        ]
    }

    /// Exact inverse of [`JournalTemplates::accrual`]
    pub fn accrual_reversal(amount: Money) -> Vec<JournalLine> {
        Self::inverse(&Self::accrual(amount))
    }

    /// Swaps debit and credit on every line
    pub fn inverse(lines: &[JournalLine]) -> Vec<JournalLine> {
        lines.iter().map(JournalLine::inverted).collect()
    }
}

fn non_zero(lines: Vec<JournalLine>) -> Vec<JournalLine> {
    lines
        .into_iter()
        .filter(|l| !(l.debit.is_zero() && l.credit.is_zero()))
        .collect()
}
