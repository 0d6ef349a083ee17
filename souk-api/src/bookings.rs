use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use souk_booking::{Booking, BookingFilter, BookingRequest, BookingStatus};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CallerId;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/availability/check", get(check_availability))
        .route("/v1/bookings/customer/my-bookings", get(customer_bookings))
        .route("/v1/bookings/provider/my-bookings", get(provider_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/status", put(update_status))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    CallerId(customer_id): CallerId,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(customer_id, &req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<BookingStatus>,
    limit: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> BookingFilter {
        BookingFilter {
            status: self.status,
            limit: self.limit,
        }
    }
}

async fn customer_bookings(
    State(state): State<AppState>,
    CallerId(customer_id): CallerId,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state
        .bookings
        .for_customer(customer_id, &query.into_filter())
        .await?;
    Ok(Json(bookings))
}

async fn provider_bookings(
    State(state): State<AppState>,
    CallerId(provider_id): CallerId,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state
        .bookings
        .for_provider(provider_id, &query.into_filter())
        .await?;
    Ok(Json(bookings))
}

async fn get_booking(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.get_booking(id, Some(caller)).await?;
    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusBody {
    status: BookingStatus,
    notes: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .update_status(id, caller, body.status, body.notes)
        .await?;
    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
struct CancelBody {
    reason: Option<String>,
}

async fn cancel_booking(
    State(state): State<AppState>,
    CallerId(caller): CallerId,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelBody>>,
) -> Result<Json<Booking>, AppError> {
    let reason = body.and_then(|Json(b)| b.reason);
    let booking = state.bookings.cancel_booking(id, caller, reason).await?;
    Ok(Json(booking))
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    listing_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    available: bool,
}

async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let available = state
        .bookings
        .check_availability(query.listing_id, query.start_at, query.end_at)
        .await?;
    Ok(Json(AvailabilityResponse { available }))
}
