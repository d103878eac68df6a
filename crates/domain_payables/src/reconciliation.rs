//! Bank statement reconciliation
//!
//! Matches bank records to settled payments in two passes:
//!
//! 1. **Exact**: the record's reference equals a payment's transaction id
//!    or payment id. One-to-one; the first record to claim a payment wins.
//! 2. **Amount**: a remaining record whose amount is within one unit of
//!    exactly one unclaimed payment is suggested at medium confidence.
//!    Several candidates means the record stays unmatched.
//!
//! Matching is stateless; nothing about a run is stored.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{Money, PaymentId};

use crate::context::SettlementContext;
use crate::error::SettlementError;
use crate::payment::{Payment, PaymentQuery, PaymentStatus};
use crate::statement::{parse_bank_statement, RejectedRow};

/// Amounts closer than this are treated as the same transfer
pub const AMOUNT_PROXIMITY: Decimal = dec!(1);

/// One line of an external bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRecord {
    pub reference: Option<String>,
    pub amount: Money,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    /// Position in the source statement
    pub row: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchConfidence {
    Exact,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMatch {
    pub record: BankRecord,
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub payment_amount: Money,
    pub confidence: MatchConfidence,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub matched: Vec<RecordMatch>,
    pub suggested: Vec<RecordMatch>,
    pub unmatched: Vec<BankRecord>,
}

/// Reconciliation of a whole uploaded statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementReconciliation {
    #[serde(flatten)]
    pub report: ReconciliationReport,
    pub rejected_rows: Vec<RejectedRow>,
}

fn references_payment(reference: &str, payment: &Payment) -> bool {
    let reference = reference.trim();
    reference.eq_ignore_ascii_case(&payment.transaction_id)
        || reference.eq_ignore_ascii_case(&payment.id.to_string())
        || reference.eq_ignore_ascii_case(&payment.id.as_uuid().to_string())
}

fn record_match(record: BankRecord, payment: &Payment, confidence: MatchConfidence) -> RecordMatch {
    RecordMatch {
        record,
        payment_id: payment.id,
        transaction_id: payment.transaction_id.clone(),
        payment_amount: payment.amount,
        confidence,
    }
}

/// Matches bank records against settled payments
///
/// Payments that are not `Success` are ignored. The result depends only on
/// the order and contents of both inputs.
pub fn match_bank_records(records: &[BankRecord], payments: &[Payment]) -> ReconciliationReport {
    let pool: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.payment_status == PaymentStatus::Success)
        .collect();
    let mut claimed: HashSet<PaymentId> = HashSet::new();
    let mut report = ReconciliationReport::default();
    let mut remaining = Vec::new();

    for record in records {
        let hit = record.reference.as_deref().and_then(|reference| {
            pool.iter()
                .find(|p| !claimed.contains(&p.id) && references_payment(reference, p))
        });
        match hit {
            Some(payment) => {
                claimed.insert(payment.id);
                report.matched.push(record_match(record.clone(), payment, MatchConfidence::Exact));
            }
            None => remaining.push(record),
        }
    }

    for record in remaining {
        let candidates: Vec<&Payment> = pool
            .iter()
            .copied()
            .filter(|p| {
                !claimed.contains(&p.id)
                    && p.amount.currency() == record.amount.currency()
                    && (p.amount.amount() - record.amount.amount()).abs() < AMOUNT_PROXIMITY
            })
            .take(2)
            .collect();
        match candidates.as_slice() {
            [payment] => {
                claimed.insert(payment.id);
                report.suggested.push(record_match(record.clone(), payment, MatchConfidence::Medium));
            }
            _ => report.unmatched.push(record.clone()),
        }
    }

    report
}

#[derive(Clone)]
pub struct ReconciliationService {
    ctx: SettlementContext,
}

impl ReconciliationService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    pub async fn reconcile(&self, records: &[BankRecord]) -> Result<ReconciliationReport, SettlementError> {
        let settled = self
            .ctx
            .payables
            .list_payments(&PaymentQuery::with_status(PaymentStatus::Success))
            .await?;
        let report = match_bank_records(records, &settled);
        info!(
            records = records.len(),
            matched = report.matched.len(),
            suggested = report.suggested.len(),
            unmatched = report.unmatched.len(),
            "Bank records reconciled"
        );
        Ok(report)
    }

    /// Parses a CSV statement and reconciles every readable row
    #[instrument(skip_all, fields(bytes = csv.len()))]
    pub async fn reconcile_statement(&self, csv: &str) -> Result<StatementReconciliation, SettlementError> {
        let parsed = parse_bank_statement(csv, self.ctx.config.currency)?;
        let report = self.reconcile(&parsed.records).await?;
        Ok(StatementReconciliation {
            report,
            rejected_rows: parsed.rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Actor, Currency, InvoiceId, VendorId};
    use crate::payment::PaymentMethod;

    fn settled(amount: Decimal) -> Payment {
        let mut payment = Payment::new(
            InvoiceId::new(),
            VendorId::new(),
            Money::new(amount, Currency::USD),
            PaymentMethod::BankTransfer,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            Actor::system(),
        );
        payment.mark_success();
        payment
    }

    fn record(reference: Option<&str>, amount: Decimal, row: usize) -> BankRecord {
        BankRecord {
            reference: reference.map(str::to_string),
            amount: Money::new(amount, Currency::USD),
            date: None,
            description: None,
            row,
        }
    }

    #[test]
    fn test_exact_then_suggested() {
        let a = settled(dec!(98000));
        let b = settled(dec!(4200));
        let records = vec![
            record(Some(&a.id.to_string()), dec!(98000), 2),
            record(None, dec!(4200.40), 3),
        ];

        let report = match_bank_records(&records, &[a.clone(), b.clone()]);
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.matched[0].payment_id, a.id);
        assert_eq!(report.matched[0].confidence, MatchConfidence::Exact);
        assert_eq!(report.suggested.len(), 1);
        assert_eq!(report.suggested[0].payment_id, b.id);
        assert_eq!(report.suggested[0].confidence, MatchConfidence::Medium);
        assert!(report.unmatched.is_empty());
    }

    #[test]
    fn test_transaction_id_matches_exactly() {
        let a = settled(dec!(10));
        let records = vec![record(Some(&a.transaction_id), dec!(999), 2)];
        let report = match_bank_records(&records, &[a.clone()]);
        assert_eq!(report.matched[0].payment_id, a.id);
    }

    #[test]
    fn test_ambiguous_amount_is_unmatched() {
        let records = vec![record(None, dec!(500), 2)];
        let report = match_bank_records(&records, &[settled(dec!(500)), settled(dec!(500.50))]);
        assert!(report.suggested.is_empty());
        assert_eq!(report.unmatched.len(), 1);
    }

    #[test]
    fn test_payment_claimed_once() {
        let a = settled(dec!(75));
        let reference = a.id.to_string();
        let records = vec![record(Some(&reference), dec!(75), 2), record(Some(&reference), dec!(75), 3)];
        let report = match_bank_records(&records, &[a]);
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.unmatched.len(), 1);
        assert_eq!(report.unmatched[0].row, 3);
    }

    #[test]
    fn test_pending_payments_are_ignored() {
        let mut pending = settled(dec!(20));
        pending.payment_status = PaymentStatus::Pending;
        let records = vec![record(Some(&pending.transaction_id), dec!(20), 2)];
        let report = match_bank_records(&records, &[pending]);
        assert_eq!(report.unmatched.len(), 1);
    }
}
