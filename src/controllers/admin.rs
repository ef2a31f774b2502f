use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::bookings::BookingResponse;
use super::shows::ShowResponse;
use super::ValidatedJson;
use crate::error::BookingError;
use crate::layout::HallCode;
use crate::middleware::AdminUser;
use crate::models::{CategoryPrices, Money, Presentation};
use crate::services::{BatchSchedule, Movie, NewShow, ReconcileReport, ScheduleEntry};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/shows", post(create_show).get(list_upcoming_shows))
        .route("/admin/shows/batch", post(create_show_batch))
        .route("/admin/shows/{show_id}/bookings", get(list_show_bookings))
        .route("/admin/bookings/{booking_id}/paid", post(mark_booking_paid))
        .route("/admin/movies/now-playing", get(now_playing))
        .route("/admin/reconcile", post(reconcile))
}

fn prices(regular: i64, vip: i64) -> CategoryPrices {
    CategoryPrices {
        regular: Money::from_minor(regular),
        vip: Money::from_minor(vip),
    }
}

// POST /api/admin/shows
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowRequest {
    #[validate(length(min = 1, message = "movieId is required"))]
    pub movie_id: String,
    #[validate(length(min = 1, message = "hallCode is required"))]
    pub hall_code: String,
    pub date_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub presentation: Presentation,
    #[validate(range(min = 1, message = "regularPrice must be positive"))]
    pub regular_price: i64,
    #[validate(range(min = 1, message = "vipPrice must be positive"))]
    pub vip_price: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowResponse {
    pub show_id: Uuid,
}

async fn create_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(req): ValidatedJson<CreateShowRequest>,
) -> Result<(StatusCode, Json<CreateShowResponse>), BookingError> {
    let show = state
        .registry
        .create_show(NewShow {
            movie_id: req.movie_id,
            hall: HallCode::new(req.hall_code),
            starts_at: req.date_time,
            presentation: req.presentation,
            prices: prices(req.regular_price, req.vip_price),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CreateShowResponse { show_id: show.id })))
}

// POST /api/admin/shows/batch
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntryRequest {
    #[validate(length(min = 1, message = "hall is required"))]
    pub hall: String,
    pub date: NaiveDate,
    #[validate(length(min = 1, message = "at least one time is required"))]
    pub times: Vec<NaiveTime>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowBatchRequest {
    #[validate(length(min = 1, message = "movieId is required"))]
    pub movie_id: String,
    #[serde(rename = "type")]
    pub presentation: Presentation,
    #[validate(range(min = 1, message = "regularPrice must be positive"))]
    pub regular_price: i64,
    #[validate(range(min = 1, message = "vipPrice must be positive"))]
    pub vip_price: i64,
    #[validate(length(min = 1, message = "schedule must not be empty"), nested)]
    pub schedule: Vec<ScheduleEntryRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowBatchResponse {
    pub show_ids: Vec<Uuid>,
}

async fn create_show_batch(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(req): ValidatedJson<CreateShowBatchRequest>,
) -> Result<(StatusCode, Json<CreateShowBatchResponse>), BookingError> {
    let batch = BatchSchedule {
        movie_id: req.movie_id,
        presentation: req.presentation,
        prices: prices(req.regular_price, req.vip_price),
        entries: req
            .schedule
            .into_iter()
            .map(|entry| ScheduleEntry {
                hall: HallCode::new(entry.hall),
                date: entry.date,
                times: entry.times,
            })
            .collect(),
    };
    let shows = state.registry.create_batch(batch).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateShowBatchResponse {
            show_ids: shows.iter().map(|show| show.id).collect(),
        }),
    ))
}

// GET /api/admin/shows
async fn list_upcoming_shows(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<ShowResponse>>, BookingError> {
    let shows = state.registry.list_upcoming().await?;
    Ok(Json(shows.into_iter().map(ShowResponse::from).collect()))
}

// GET /api/admin/shows/{id}/bookings
async fn list_show_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(show_id): Path<Uuid>,
) -> Result<Json<Vec<BookingResponse>>, BookingError> {
    state.registry.get_show(show_id).await?;
    let bookings = state.ledger.list_for_show(show_id).await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

// POST /api/admin/bookings/{id}/paid
async fn mark_booking_paid(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, BookingError> {
    let booking = state.ledger.mark_paid(booking_id).await?;
    Ok(Json(booking.into()))
}

// GET /api/admin/movies/now-playing
async fn now_playing(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<Movie>>, BookingError> {
    Ok(Json(state.catalog.fetch_now_playing().await?))
}

// POST /api/admin/reconcile
async fn reconcile(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<ReconcileReport>, BookingError> {
    Ok(Json(state.reconciler.run_once().await?))
}
