use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::ValidatedJson;
use crate::error::BookingError;
use crate::layout::{SeatCategory, SeatId};
use crate::middleware::AuthUser;
use crate::models::{Booking, Money, PaymentStatus};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(get_user_bookings))
        .route("/bookings/{booking_id}", get(get_booking))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub user_id: String,
    pub show_id: Uuid,
    pub category: SeatCategory,
    pub seats: Vec<SeatId>,
    pub amount: Money,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            show_id: booking.show_id,
            category: booking.category,
            seats: booking.seats,
            amount: booking.amount,
            payment_status: booking.payment_status,
            created_at: booking.created_at,
        }
    }
}

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub show_id: Uuid,
    pub category: SeatCategory,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seat_ids: Vec<SeatId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub amount: Money,
    pub seats: Vec<SeatId>,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), BookingError> {
    let booking = state
        .admission
        .admit_booking(&user.user_id, req.show_id, req.category, &req.seat_ids)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking_id: booking.id,
            amount: booking.amount,
            seats: booking.seats,
        }),
    ))
}

// GET /api/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<BookingResponse>>, BookingError> {
    let bookings = state.ledger.list_for_user(&user.user_id).await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, BookingError> {
    let booking = state.ledger.get(booking_id).await?;
    // Someone else's booking looks the same as a missing one.
    if booking.user_id != user.user_id && !user.is_admin {
        return Err(BookingError::BookingNotFound(booking_id));
    }
    Ok(Json(booking.into()))
}
