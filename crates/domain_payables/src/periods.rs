//! Period close and reopen with an audit trail

use serde_json::json;

use core_kernel::Actor;
use domain_ledger::{AccountingPeriod, PeriodKey};

use crate::audit::AuditEntity;
use crate::context::SettlementContext;
use crate::error::SettlementError;

#[derive(Clone)]
pub struct PeriodService {
    ctx: SettlementContext,
}

impl PeriodService {
    pub fn new(ctx: SettlementContext) -> Self {
        Self { ctx }
    }

    /// Closes a month; journal postings dated inside it are suppressed afterwards
    pub async fn close_period(&self, month: u32, year: i32, actor: &Actor) -> Result<AccountingPeriod, SettlementError> {
        let period = self.ctx.journal().period_guard().close(month, year, actor).await?;
        self.record(actor, "period.closed", &period).await;
        Ok(period)
    }

    pub async fn reopen_period(&self, month: u32, year: i32, actor: &Actor) -> Result<AccountingPeriod, SettlementError> {
        let period = self.ctx.journal().period_guard().reopen(month, year, actor).await?;
        self.record(actor, "period.reopened", &period).await;
        Ok(period)
    }

    pub async fn list_periods(&self) -> Result<Vec<AccountingPeriod>, SettlementError> {
        Ok(self.ctx.journal().period_guard().list().await?)
    }

    async fn record(&self, actor: &Actor, action: &str, period: &AccountingPeriod) {
        let key: PeriodKey = period.key();
        self.ctx
            .audit(
                actor,
                action,
                AuditEntity::Period(key),
                json!({ "month": period.month, "year": period.year, "is_closed": period.is_closed }),
            )
            .await;
    }
}
