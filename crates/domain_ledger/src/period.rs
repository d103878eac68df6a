//! Accounting period locking
//!
//! Periods are calendar months keyed by `(month, year)`. A closed period
//! suppresses new journal postings dated inside it; nothing else is blocked.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::Actor;
use crate::error::LedgerError;
use crate::ports::LedgerPort;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    /// Creates a key, rejecting months outside 1..=12
    pub fn new(month: u32, year: i32) -> Result<Self, LedgerError> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidPeriod(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Lock state of one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    pub month: u32,
    pub year: i32,
    pub is_closed: bool,
    pub closed_by: Option<Actor>,
    pub closed_at: Option<DateTime<Utc>>,
    pub reopened_by: Option<Actor>,
    pub reopened_at: Option<DateTime<Utc>>,
}

impl AccountingPeriod {
    pub fn open(key: PeriodKey) -> Self {
        Self {
            month: key.month,
            year: key.year,
            is_closed: false,
            closed_by: None,
            closed_at: None,
            reopened_by: None,
            reopened_at: None,
        }
    }

    pub fn key(&self) -> PeriodKey {
        PeriodKey {
            year: self.year,
            month: self.month,
        }
    }
}

/// Closes, reopens and answers "is this date locked?"
#[derive(Clone)]
pub struct PeriodGuard {
    port: Arc<dyn LedgerPort>,
}

impl PeriodGuard {
    pub fn new(port: Arc<dyn LedgerPort>) -> Self {
        Self { port }
    }

    /// True when the month containing `date` has been closed
    pub async fn is_closed(&self, date: NaiveDate) -> Result<bool, LedgerError> {
        let period = self.port.get_period(PeriodKey::from_date(date)).await?;
        Ok(period.map(|p| p.is_closed).unwrap_or(false))
    }

    /// Closes a period
    ///
    /// Closing an already-closed period returns it unchanged, keeping the
    /// original closer and timestamp.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn close(&self, month: u32, year: i32, actor: &Actor) -> Result<AccountingPeriod, LedgerError> {
        let key = PeriodKey::new(month, year)?;
        let mut period = self
            .port
            .get_period(key)
            .await?
            .unwrap_or_else(|| AccountingPeriod::open(key));

        if period.is_closed {
            return Ok(period);
        }

        period.is_closed = true;
        period.closed_by = Some(actor.clone());
        period.closed_at = Some(Utc::now());
        self.port.upsert_period(&period).await?;

        info!(period = %key, "Accounting period closed");
        Ok(period)
    }

    /// Reopens a period; reopening an open period is a no-op
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn reopen(&self, month: u32, year: i32, actor: &Actor) -> Result<AccountingPeriod, LedgerError> {
        let key = PeriodKey::new(month, year)?;
        let mut period = match self.port.get_period(key).await? {
            Some(period) => period,
            None => {
                let period = AccountingPeriod::open(key);
                self.port.upsert_period(&period).await?;
                return Ok(period);
            }
        };

        if !period.is_closed {
            return Ok(period);
        }

        period.is_closed = false;
        period.reopened_by = Some(actor.clone());
        period.reopened_at = Some(Utc::now());
        self.port.upsert_period(&period).await?;

        info!(period = %key, "Accounting period reopened");
        Ok(period)
    }

    /// All known periods, newest first
    pub async fn list(&self) -> Result<Vec<AccountingPeriod>, LedgerError> {
        let mut periods = self.port.list_periods().await?;
        periods.sort_by(|a, b| b.key().cmp(&a.key()));
        Ok(periods)
    }
}
