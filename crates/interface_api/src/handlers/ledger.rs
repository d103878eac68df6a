//! Ledger read handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};

use core_kernel::VendorId;
use domain_ledger::{Account, JournalEntry, TrialBalance, VendorLedger};

use crate::dto::books::JournalListParams;
use crate::dto::parse_id;
use crate::{error::ApiError, AppState};

/// `GET /journal-entries?reference_type=&month=&year=`
pub async fn list_journal_entries(
    State(state): State<AppState>,
    Query(params): Query<JournalListParams>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let query = params.into_query()?;
    Ok(Json(state.ctx.journal().list(&query).await?))
}

pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.ctx.journal().accounts().await?))
}

pub async fn trial_balance(State(state): State<AppState>) -> Result<Json<TrialBalance>, ApiError> {
    Ok(Json(state.ctx.journal().trial_balance().await?))
}

pub async fn vendor_ledger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VendorLedger>, ApiError> {
    let id: VendorId = parse_id(&id, "vendor")?;
    Ok(Json(state.vendor_ledgers.ledger_for(id).await?))
}
