use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use souk_payment::{CaptureCallback, FailureNotice, Payment, PaymentOrder, RefundOutcome};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CallerId;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/create-order", post(create_order))
        .route("/v1/payments/success", post(payment_success))
        .route("/v1/payments/failure", post(payment_failure))
        .route("/v1/payments/{id}", get(get_payment))
        .route("/v1/payments/{id}/refund", post(refund_payment))
}

#[derive(Debug, Deserialize)]
struct CreateOrderBody {
    booking_id: Uuid,
}

async fn create_order(
    State(state): State<AppState>,
    CallerId(customer_id): CallerId,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<PaymentOrder>), AppError> {
    let order = state
        .payments
        .create_order(body.booking_id, customer_id)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Capture callback posted by the checkout page. The HMAC signature inside
/// the body is the authentication; there is no session here.
async fn payment_success(
    State(state): State<AppState>,
    Json(callback): Json<CaptureCallback>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.confirm_capture(&callback).await?;
    Ok(Json(payment))
}

async fn payment_failure(
    State(state): State<AppState>,
    Json(notice): Json<FailureNotice>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.handle_failure(&notice).await?;
    Ok(Json(payment))
}

async fn get_payment(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.payments.get_payment(id, Some(caller)).await?;
    Ok(Json(payment))
}

#[derive(Debug, Deserialize)]
struct RefundBody {
    amount: Option<Decimal>,
    reason: Option<String>,
}

async fn refund_payment(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    body: Option<Json<RefundBody>>,
) -> Result<Json<RefundOutcome>, AppError> {
    // Only parties to the linked booking may move its money.
    state.payments.get_payment(id, Some(caller)).await?;

    let (amount, reason) = match body {
        Some(Json(b)) => (b.amount, b.reason),
        None => (None, None),
    };
    let reason = reason.unwrap_or_else(|| "requested_by_customer".to_string());
    let outcome = state.payments.initiate_refund(id, amount, &reason).await?;
    Ok(Json(outcome))
}
