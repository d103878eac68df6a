//! Invoice intake and exception handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::{Actor, InvoiceId};
use domain_payables::{Invoice, InvoiceException};

use crate::dto::invoices::RegisterInvoiceBody;
use crate::dto::{parse_id, validated};
use crate::{error::ApiError, AppState};

/// Accepts an invoice from procurement and books it
pub async fn register_invoice(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<RegisterInvoiceBody>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let request = validated(body)?.into_request(state.currency());
    let invoice = state.invoices.register_invoice(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Invoice>, ApiError> {
    let id: InvoiceId = parse_id(&id, "invoice")?;
    Ok(Json(state.invoices.get_invoice(id).await?))
}

/// Unpaid invoices whose purchase-order checks fail
pub async fn list_exceptions(State(state): State<AppState>) -> Result<Json<Vec<InvoiceException>>, ApiError> {
    Ok(Json(state.exceptions.scan().await?))
}
