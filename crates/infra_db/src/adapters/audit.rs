//! PostgreSQL audit sink
//!
//! Appends one row per audit event. Rows are never updated.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use core_kernel::PortError;
use domain_payables::{AuditEvent, AuditSink};

use crate::error::DatabaseError;

/// Audit sink backed by the `audit_events` table
#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Events recorded against one record, oldest first
    pub async fn events_for(&self, entity_type: &str, entity_id: &str) -> Result<Vec<AuditEvent>, PortError> {
        let rows = sqlx::query_scalar::<_, Json<AuditEvent>>(
            "SELECT doc FROM audit_events
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY at, id",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(rows.into_iter().map(|Json(event)| event).collect())
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO audit_events (id, actor, action, entity_type, entity_id, at, doc)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*event.id.as_uuid())
        .bind(event.actor.as_str())
        .bind(&event.action)
        .bind(event.entity.entity_type())
        .bind(event.entity.entity_id())
        .bind(event.at)
        .bind(Json(&event))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }
}
