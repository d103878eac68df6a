//! Journal engine
//!
//! Posts balanced entries, resolves account codes against the live chart
//! and applies each line's `debit - credit` to its account balance.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{Actor, Currency, Money};
use crate::account::{Account, AccountCode};
use crate::error::LedgerError;
use crate::journal::{validate_lines, JournalEntry, JournalLine, JournalReference, ReferenceKind, BALANCE_TOLERANCE};
use crate::period::{PeriodGuard, PeriodKey};
use crate::ports::LedgerPort;

/// Result of a posting attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    /// The entry was stored and balances updated
    Posted(JournalEntry),
    /// The entry's period is closed; nothing was written
    Suppressed { period: PeriodKey },
}

impl PostOutcome {
    pub fn is_posted(&self) -> bool {
        matches!(self, PostOutcome::Posted(_))
    }

    pub fn entry(&self) -> Option<&JournalEntry> {
        match self {
            PostOutcome::Posted(entry) => Some(entry),
            PostOutcome::Suppressed { .. } => None,
        }
    }
}

/// Filter for listing journal entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalQuery {
    pub kind: Option<ReferenceKind>,
    pub reference: Option<JournalReference>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl JournalQuery {
    pub fn for_reference(reference: JournalReference) -> Self {
        Self {
            reference: Some(reference),
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.kind.map_or(true, |k| entry.reference.kind() == k)
            && self.reference.map_or(true, |r| entry.reference == r)
            && self.month.map_or(true, |m| entry.period_month == m)
            && self.year.map_or(true, |y| entry.period_year == y)
    }
}

/// Trial balance report
#[derive(Debug, Clone, Serialize)]
pub struct TrialBalance {
    pub lines: Vec<TrialBalanceLine>,
    pub total_debit: Money,
    pub total_credit: Money,
    pub is_balanced: bool,
}

/// A single account in the trial balance
#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceLine {
    pub code: AccountCode,
    pub name: String,
    pub debit: Money,
    pub credit: Money,
}

/// Posts journal entries and maintains account balances
#[derive(Clone)]
pub struct JournalEngine {
    port: Arc<dyn LedgerPort>,
    guard: PeriodGuard,
    currency: Currency,
}

impl JournalEngine {
    pub fn new(port: Arc<dyn LedgerPort>, currency: Currency) -> Self {
        Self {
            guard: PeriodGuard::new(port.clone()),
            port,
            currency,
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn period_guard(&self) -> &PeriodGuard {
        &self.guard
    }

    /// Posts a journal entry dated `entry_date`
    ///
    /// # Errors
    ///
    /// - `EmptyEntry`, `InvalidLine` or `UnbalancedEntry` for a bad line set
    /// - `AccountNotInitialized` if a line's account has not been seeded
    ///
    /// A closed period is not an error: the entry is dropped, a warning is
    /// logged and `PostOutcome::Suppressed` is returned.
    #[instrument(skip_all, fields(reference = %reference, actor = %actor, date = %entry_date))]
    pub async fn post(
        &self,
        reference: JournalReference,
        description: impl Into<String>,
        mut lines: Vec<JournalLine>,
        actor: &Actor,
        entry_date: NaiveDate,
    ) -> Result<PostOutcome, LedgerError> {
        let totals = validate_lines(&lines, self.currency)?;

        for line in lines.iter_mut() {
            let account = self
                .port
                .get_account(line.account_code)
                .await?
                .ok_or_else(|| LedgerError::AccountNotInitialized(line.account_code.to_string()))?;
            line.account_id = Some(account.id);
        }

        if self.guard.is_closed(entry_date).await? {
            let period = PeriodKey::from_date(entry_date);
            warn!(
                period = %period,
                reference = %reference,
                "Accounting period is closed; journal posting suppressed"
            );
            return Ok(PostOutcome::Suppressed { period });
        }

        let entry = JournalEntry::new(reference, description, lines, totals, entry_date, actor.clone());
        self.port.insert_journal_entry(&entry).await?;

        for (code, delta) in Self::net_deltas(&entry.lines, self.currency)? {
            if !delta.is_zero() {
                self.port.apply_balance_delta(code, delta).await?;
            }
        }

        info!(
            entry_id = %entry.id,
            total = %entry.total_debit,
            lines = entry.lines.len(),
            "Journal entry posted"
        );
        Ok(PostOutcome::Posted(entry))
    }

    /// Per-account net effect of a line set
    fn net_deltas(lines: &[JournalLine], currency: Currency) -> Result<BTreeMap<AccountCode, Money>, LedgerError> {
        let mut deltas: BTreeMap<AccountCode, Money> = BTreeMap::new();
        for line in lines {
            let delta = line.balance_delta()?;
            let slot = deltas.entry(line.account_code).or_insert_with(|| Money::zero(currency));
            *slot = slot.checked_add(&delta)?;
        }
        Ok(deltas)
    }

    pub async fn list(&self, query: &JournalQuery) -> Result<Vec<JournalEntry>, LedgerError> {
        Ok(self.port.list_journal_entries(query).await?)
    }

    /// The chart of accounts with live balances
    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.port.list_accounts().await?)
    }

    /// Builds a trial balance from current account balances
    ///
    /// Net-debit balances land in the debit column, net-credit balances in
    /// the credit column. Zero-balance accounts are left out.
    pub async fn trial_balance(&self) -> Result<TrialBalance, LedgerError> {
        let accounts = self.accounts().await?;
        let zero = Money::zero(self.currency);

        let lines: Vec<TrialBalanceLine> = accounts
            .into_iter()
            .filter(|a| !a.balance.is_zero())
            .map(|a| {
                let (debit, credit) = if a.balance.is_negative() {
                    (zero, a.balance.abs())
                } else {
                    (a.balance, zero)
                };
                TrialBalanceLine {
                    code: a.code,
                    name: a.name,
                    debit,
                    credit,
                }
            })
            .collect();

        let total_debit = Money::sum(self.currency, lines.iter().map(|l| &l.debit))?;
        let total_credit = Money::sum(self.currency, lines.iter().map(|l| &l.credit))?;

        Ok(TrialBalance {
            is_balanced: total_debit.approx_eq(&total_credit, BALANCE_TOLERANCE),
            lines,
            total_debit,
            total_credit,
        })
    }
}
