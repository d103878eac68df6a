//! Bank statement ingestion
//!
//! Banks export statements with their own column names. Headers are matched
//! against known synonyms after normalising case, underscores and spacing,
//! so `Transaction_ID`, `transaction id` and `TRANSACTION  ID` all resolve
//! to the reference column.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use core_kernel::{Currency, Money};

use crate::error::SettlementError;
use crate::reconciliation::BankRecord;

const REFERENCE_HEADERS: &[&str] = &[
    "reference",
    "ref",
    "transaction id",
    "txn id",
    "txn ref",
    "payment reference",
    "utr",
];
const AMOUNT_HEADERS: &[&str] = &["amount", "value", "transaction amount", "debit", "withdrawal"];
const DATE_HEADERS: &[&str] = &["date", "transaction date", "value date", "posting date", "txn date"];
const DESCRIPTION_HEADERS: &[&str] = &["description", "narration", "details", "memo", "particulars"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d-%b-%Y"];

/// A statement line that could not be turned into a bank record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based line number in the file, header included
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub records: Vec<BankRecord>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    reference: Option<usize>,
    amount: usize,
    date: Option<usize>,
    description: Option<usize>,
}

/// Lowercases, trims, turns underscores into spaces and collapses whitespace
fn normalise_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    synonyms
        .iter()
        .find_map(|synonym| headers.iter().position(|h| h == synonym))
}

fn resolve_columns(headers: &StringRecord) -> Result<Columns, SettlementError> {
    let normalised: Vec<String> = headers.iter().map(normalise_header).collect();
    let amount = find_column(&normalised, AMOUNT_HEADERS).ok_or_else(|| {
        SettlementError::validation(format!(
            "Statement has no amount column; expected one of: {}",
            AMOUNT_HEADERS.join(", ")
        ))
    })?;
    Ok(Columns {
        reference: find_column(&normalised, REFERENCE_HEADERS),
        amount,
        date: find_column(&normalised, DATE_HEADERS),
        description: find_column(&normalised, DESCRIPTION_HEADERS),
    })
}

/// Parses an amount such as `"$1,234.50"`, `"-98 000.00"` or `"₹ 500"`
///
/// The sign is dropped: statements list outgoing payments as debits with
/// either sign depending on the bank.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok().map(|d| d.abs())
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn non_empty(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads a CSV bank statement into bank records
///
/// Only the amount column is required. Rows whose amount cannot be read are
/// returned in `rejected` rather than failing the whole statement; an
/// unreadable date is dropped and the row kept.
///
/// # Errors
///
/// `Validation` when the input has no header row or no amount column.
pub fn parse_bank_statement(input: &str, currency: Currency) -> Result<ParsedStatement, SettlementError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SettlementError::validation(format!("Unreadable statement header: {}", e)))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SettlementError::validation("Statement is empty"));
    }
    let columns = resolve_columns(&headers)?;

    let mut parsed = ParsedStatement::default();
    for (index, result) in reader.records().enumerate() {
        let row = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                parsed.rejected.push(RejectedRow { row, reason: e.to_string() });
                continue;
            }
        };
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let raw_amount = record.get(columns.amount).unwrap_or("");
        let Some(amount) = parse_amount(raw_amount) else {
            parsed.rejected.push(RejectedRow {
                row,
                reason: format!("Unreadable amount '{}'", raw_amount),
            });
            continue;
        };

        parsed.records.push(BankRecord {
            reference: non_empty(&record, columns.reference),
            amount: Money::new(amount, currency),
            date: non_empty(&record, columns.date).and_then(|d| parse_date(&d)),
            description: non_empty(&record, columns.description),
            row,
        });
    }

    debug!(
        records = parsed.records.len(),
        rejected = parsed.rejected.len(),
        "Bank statement parsed"
    );
    Ok(parsed)
}
