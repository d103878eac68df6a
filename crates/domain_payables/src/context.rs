//! Shared wiring for the settlement services

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{error, warn};

use core_kernel::{Actor, Money};
use domain_ledger::{JournalEngine, LedgerPort, PostOutcome, VendorLedgerBook};

use crate::audit::{AuditEntity, AuditEvent, AuditSink};
use crate::config::SettlementConfig;
use crate::error::SettlementError;
use crate::ports::PayablesPort;
use crate::recorder::{LedgerRecorder, Posting};
use crate::webhook::WebhookDispatcher;

/// Ports and collaborators every settlement service works through
///
/// Cheap to clone; request handlers and the scheduler share one instance.
#[derive(Clone)]
pub struct SettlementContext {
    pub(crate) payables: Arc<dyn PayablesPort>,
    pub(crate) recorder: LedgerRecorder,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) webhook: Arc<dyn WebhookDispatcher>,
    pub(crate) config: SettlementConfig,
}

impl SettlementContext {
    pub fn new(
        payables: Arc<dyn PayablesPort>,
        ledger: Arc<dyn LedgerPort>,
        audit: Arc<dyn AuditSink>,
        webhook: Arc<dyn WebhookDispatcher>,
        config: SettlementConfig,
    ) -> Self {
        let engine = JournalEngine::new(ledger.clone(), config.currency);
        let book = VendorLedgerBook::new(ledger, config.currency);
        Self {
            payables,
            recorder: LedgerRecorder::new(engine, book),
            audit,
            webhook,
            config,
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn journal(&self) -> &JournalEngine {
        self.recorder.engine()
    }

    pub fn vendor_ledgers(&self) -> &VendorLedgerBook {
        self.recorder.book()
    }

    pub fn payables(&self) -> &Arc<dyn PayablesPort> {
        &self.payables
    }

    pub(crate) fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Rejects amounts that are not strictly positive or not in the book currency
    pub(crate) fn ensure_amount(&self, amount: &Money, what: &str) -> Result<(), SettlementError> {
        if amount.currency() != self.config.currency {
            return Err(SettlementError::validation(format!(
                "{} must be in {}, got {}",
                what,
                self.config.currency,
                amount.currency()
            )));
        }
        if !amount.is_positive() {
            return Err(SettlementError::validation(format!(
                "{} must be greater than zero, got {}",
                what, amount
            )));
        }
        Ok(())
    }

    /// Records an audit event; failures are logged and swallowed
    pub(crate) async fn audit(&self, actor: &Actor, action: &str, entity: AuditEntity, metadata: Value) {
        let event = AuditEvent::new(actor, action, entity, metadata);
        if let Err(e) = self.audit.record(event).await {
            warn!(error = %e, action, entity = %entity, "Audit record failed");
        }
    }

    /// Fires a webhook; failures are logged and swallowed
    pub(crate) async fn notify(&self, event: &str, payload: Value) {
        if let Err(e) = self.webhook.fire(event, payload).await {
            warn!(error = %e, event, "Webhook dispatch failed");
        }
    }

    /// Echoes a committed business event into the books
    ///
    /// The business record is already stored, so a ledger failure here is
    /// logged rather than returned. The vendor side can be recovered with a
    /// ledger rebuild.
    pub(crate) async fn echo(&self, posting: Posting, actor: &Actor) -> Option<PostOutcome> {
        let reference = posting.reference;
        match self.recorder.record(posting, actor).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, reference = %reference, "Ledger echo failed after commit");
                None
            }
        }
    }
}
