//! Audit trail
//!
//! Every settlement mutation records who did what to which record. The sink
//! is fire-and-forget: a failed write is logged and never fails the
//! mutation that produced it.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use core_kernel::{
    AccrualId, Actor, AdjustmentId, AuditEventId, BatchId, InvoiceId, PaymentId, PortError,
};
use domain_ledger::PeriodKey;

/// The record an audit event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum AuditEntity {
    Invoice(InvoiceId),
    Payment(PaymentId),
    Adjustment(AdjustmentId),
    Accrual(AccrualId),
    Batch(BatchId),
    Period(PeriodKey),
}

impl AuditEntity {
    pub fn entity_type(&self) -> &'static str {
        match self {
            AuditEntity::Invoice(_) => "Invoice",
            AuditEntity::Payment(_) => "Payment",
            AuditEntity::Adjustment(_) => "Adjustment",
            AuditEntity::Accrual(_) => "Accrual",
            AuditEntity::Batch(_) => "Batch",
            AuditEntity::Period(_) => "AccountingPeriod",
        }
    }

    pub fn entity_id(&self) -> String {
        match self {
            AuditEntity::Invoice(id) => id.to_string(),
            AuditEntity::Payment(id) => id.to_string(),
            AuditEntity::Adjustment(id) => id.to_string(),
            AuditEntity::Accrual(id) => id.to_string(),
            AuditEntity::Batch(id) => id.to_string(),
            AuditEntity::Period(key) => key.to_string(),
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type(), self.entity_id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub actor: Actor,
    /// Dotted action name, e.g. `payment.settled`
    pub action: String,
    pub entity: AuditEntity,
    pub metadata: Value,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(actor: &Actor, action: impl Into<String>, entity: AuditEntity, metadata: Value) -> Self {
        Self {
            id: AuditEventId::new_v7(),
            actor: actor.clone(),
            action: action.into(),
            entity,
            metadata,
            at: Utc::now(),
        }
    }
}

/// Destination for audit events
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn record(&self, event: AuditEvent) -> Result<(), PortError>;
}

/// Writes audit events to the `audit` tracing target
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), PortError> {
        info!(
            target: "audit",
            audit_id = %event.id,
            actor = %event.actor,
            action = %event.action,
            entity_type = event.entity.entity_type(),
            entity_id = %event.entity.entity_id(),
            metadata = %event.metadata,
            "audit event"
        );
        Ok(())
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// Keeps every audit event in memory
    #[derive(Debug, Default)]
    pub struct RecordingAuditSink {
        events: RwLock<Vec<AuditEvent>>,
        failing: AtomicBool,
    }

    impl RecordingAuditSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sink that rejects every event
        pub fn failing() -> Self {
            let sink = Self::default();
            sink.failing.store(true, Ordering::SeqCst);
            sink
        }

        pub async fn events(&self) -> Vec<AuditEvent> {
            self.events.read().await.clone()
        }

        pub async fn actions(&self) -> Vec<String> {
            self.events.read().await.iter().map(|e| e.action.clone()).collect()
        }
    }

    #[async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn record(&self, event: AuditEvent) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::connection("audit store unavailable"));
            }
            self.events.write().await.push(event);
            Ok(())
        }
    }
}
