//! Journal plus vendor-ledger echo of a settlement event
//!
//! Posting goes through the journal engine first. Vendor ledger entries are
//! appended only when the journal entry was actually posted, so a closed
//! period suppresses both halves of the echo together.

use chrono::NaiveDate;
use tracing::warn;

use core_kernel::{Actor, Money, VendorId};
use domain_ledger::{
    JournalEngine, JournalLine, JournalReference, LedgerError, PostOutcome, VendorLedgerBook,
    VendorLedgerEntryType,
};

/// A vendor ledger line to append alongside a journal entry
#[derive(Debug, Clone)]
pub struct VendorEntry {
    pub vendor_id: VendorId,
    pub entry_type: VendorLedgerEntryType,
    pub amount: Money,
    pub description: String,
}

/// Everything needed to echo one business event into the books
#[derive(Debug, Clone)]
pub struct Posting {
    pub reference: JournalReference,
    pub description: String,
    pub lines: Vec<JournalLine>,
    pub date: NaiveDate,
    pub vendor_entries: Vec<VendorEntry>,
}

impl Posting {
    pub fn new(reference: JournalReference, description: impl Into<String>, lines: Vec<JournalLine>, date: NaiveDate) -> Self {
        Self {
            reference,
            description: description.into(),
            lines,
            date,
            vendor_entries: Vec::new(),
        }
    }

    /// Adds a vendor ledger line; zero amounts are skipped
    pub fn with_vendor_entry(
        mut self,
        vendor_id: VendorId,
        entry_type: VendorLedgerEntryType,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        if !amount.is_zero() {
            self.vendor_entries.push(VendorEntry {
                vendor_id,
                entry_type,
                amount,
                description: description.into(),
            });
        }
        self
    }
}

#[derive(Clone)]
pub struct LedgerRecorder {
    engine: JournalEngine,
    book: VendorLedgerBook,
}

impl LedgerRecorder {
    pub fn new(engine: JournalEngine, book: VendorLedgerBook) -> Self {
        Self { engine, book }
    }

    pub fn engine(&self) -> &JournalEngine {
        &self.engine
    }

    pub fn book(&self) -> &VendorLedgerBook {
        &self.book
    }

    pub async fn record(&self, posting: Posting, actor: &Actor) -> Result<PostOutcome, LedgerError> {
        let outcome = self
            .engine
            .post(posting.reference, posting.description, posting.lines, actor, posting.date)
            .await?;

        match &outcome {
            PostOutcome::Posted(_) => {
                for entry in posting.vendor_entries {
                    self.book
                        .append(entry.vendor_id, entry.entry_type, posting.reference, entry.amount, entry.description)
                        .await?;
                }
            }
            PostOutcome::Suppressed { period } => {
                if !posting.vendor_entries.is_empty() {
                    warn!(
                        period = %period,
                        reference = %posting.reference,
                        skipped = posting.vendor_entries.len(),
                        "Vendor ledger entries skipped for closed period"
                    );
                }
            }
        }
        Ok(outcome)
    }
}
