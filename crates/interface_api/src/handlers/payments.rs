//! Payment handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use core_kernel::{Actor, PaymentId};
use domain_payables::{Payment, PaymentQuery, UpdatePaymentRequest};

use crate::dto::payments::*;
use crate::dto::{parse_id, validated};
use crate::{error::ApiError, AppState};

/// Creates a payment; it may settle immediately, wait for approval or wait for its date
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreatePaymentBody>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let request = validated(body)?.into_request(state.currency());
    let payment = state.payments.create_payment(request, &actor).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let query = PaymentQuery::from(params);
    Ok(Json(state.payments.list_payments(&query).await?))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let id: PaymentId = parse_id(&id, "payment")?;
    Ok(Json(state.payments.get_payment(id).await?))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePaymentBody>,
) -> Result<Json<Payment>, ApiError> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let request: UpdatePaymentRequest = validated(body)?.into();
    Ok(Json(state.payments.update_payment(id, request, &actor).await?))
}

/// Moves a draft into the approval gate
pub async fn submit_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let id: PaymentId = parse_id(&id, "payment")?;
    Ok(Json(state.payments.submit_payment(id, &actor).await?))
}

pub async fn approve_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<ApprovalBody>,
) -> Result<Json<Payment>, ApiError> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let body = validated(body)?;
    let payment = state
        .payments
        .approve_payment(id, body.decision, &actor, body.comment)
        .await?;
    Ok(Json(payment))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    body: Option<Json<CancelBody>>,
) -> Result<Json<Payment>, ApiError> {
    let id: PaymentId = parse_id(&id, "payment")?;
    let body = validated(body.map(|Json(b)| b).unwrap_or_default())?;
    Ok(Json(state.payments.cancel_payment(id, &actor, body.reason).await?))
}
