//! Adjustment, accrual, batch, period and reconciliation handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;

use core_kernel::{AccrualId, Actor, BatchId};
use domain_ledger::AccountingPeriod;
use domain_payables::{Accrual, Adjustment, AdjustmentQuery, BatchPayment, StatementReconciliation};

use crate::dto::books::*;
use crate::dto::{parse_id, validated};
use crate::{error::ApiError, AppState};

pub async fn create_adjustment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateAdjustmentBody>,
) -> Result<(StatusCode, Json<Adjustment>), ApiError> {
    let request = validated(body)?.into_request(state.currency());
    let adjustment = state.adjustments.create_adjustment(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    Query(params): Query<AdjustmentListParams>,
) -> Result<Json<Vec<Adjustment>>, ApiError> {
    let query = AdjustmentQuery::from(params);
    Ok(Json(state.adjustments.list_adjustments(&query).await?))
}

pub async fn create_accrual(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateAccrualBody>,
) -> Result<(StatusCode, Json<Accrual>), ApiError> {
    let request = validated(body)?.into_request(state.currency(), Utc::now().date_naive())?;
    let accrual = state.accruals.create_accrual(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(accrual)))
}

pub async fn list_accruals(
    State(state): State<AppState>,
    Query(params): Query<AccrualListParams>,
) -> Result<Json<Vec<Accrual>>, ApiError> {
    Ok(Json(state.accruals.list_accruals(params.status).await?))
}

pub async fn reverse_accrual(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Accrual>, ApiError> {
    let id: AccrualId = parse_id(&id, "accrual")?;
    Ok(Json(state.accruals.reverse_accrual(id, &actor).await?))
}

/// Pays every eligible invoice in full; per-item failures are recorded on the batch
pub async fn run_batch(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<BatchBody>,
) -> Result<(StatusCode, Json<BatchPayment>), ApiError> {
    let body = validated(body)?;
    let batch = state.batches.run_batch(body.invoice_ids, body.method, &actor).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BatchPayment>, ApiError> {
    let id: BatchId = parse_id(&id, "batch")?;
    Ok(Json(state.batches.get_batch(id).await?))
}

pub async fn close_period(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<PeriodBody>,
) -> Result<Json<AccountingPeriod>, ApiError> {
    let body = validated(body)?;
    Ok(Json(state.periods.close_period(body.month, body.year, &actor).await?))
}

pub async fn reopen_period(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<PeriodBody>,
) -> Result<Json<AccountingPeriod>, ApiError> {
    let body = validated(body)?;
    Ok(Json(state.periods.reopen_period(body.month, body.year, &actor).await?))
}

pub async fn list_periods(State(state): State<AppState>) -> Result<Json<Vec<AccountingPeriod>>, ApiError> {
    Ok(Json(state.periods.list_periods().await?))
}

/// Matches an uploaded CSV bank statement against settled payments
pub async fn reconcile_statement(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<StatementReconciliation>, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("Statement body is empty".to_string()));
    }
    Ok(Json(state.reconciliation.reconcile_statement(&body).await?))
}
