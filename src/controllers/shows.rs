use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::BookingError;
use crate::layout::SeatCategory;
use crate::models::{Money, Presentation, Show};
use crate::services::Availability;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shows", get(list_shows))
        .route("/shows/{show_id}", get(get_show))
        .route("/shows/{show_id}/seats", get(get_seats))
}

/// Public view of a show; occupancy is served by the seats endpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowResponse {
    pub id: Uuid,
    pub movie_id: String,
    pub hall: String,
    pub date_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub presentation: Presentation,
    pub regular_price: Money,
    pub vip_price: Money,
    pub created_at: DateTime<Utc>,
}

impl From<Show> for ShowResponse {
    fn from(show: Show) -> Self {
        Self {
            id: show.id,
            movie_id: show.movie_id,
            hall: show.hall.to_string(),
            date_time: show.starts_at,
            presentation: show.presentation,
            regular_price: show.prices.regular,
            vip_price: show.prices.vip,
            created_at: show.created_at,
        }
    }
}

// GET /api/shows?movieId=&date=
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShowsQuery {
    movie_id: String,
    date: NaiveDate,
}

async fn list_shows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShowsQuery>,
) -> Result<Json<Vec<ShowResponse>>, BookingError> {
    let shows = state
        .registry
        .list_shows_for_movie_and_date(&query.movie_id, query.date)
        .await?;
    Ok(Json(shows.into_iter().map(ShowResponse::from).collect()))
}

// GET /api/shows/{id}
async fn get_show(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<ShowResponse>, BookingError> {
    let show = state.registry.get_show(show_id).await?;
    Ok(Json(show.into()))
}

// GET /api/shows/{id}/seats?category=regular|vip
#[derive(Debug, Deserialize)]
struct SeatsQuery {
    category: Option<String>,
}

async fn get_seats(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<Uuid>,
    Query(query): Query<SeatsQuery>,
) -> Result<Json<Availability>, BookingError> {
    let category = match query.category {
        None => SeatCategory::Regular,
        Some(raw) => raw
            .parse::<SeatCategory>()
            .map_err(|_| BookingError::UnknownCategory(raw))?,
    };

    let cache = state
        .cache
        .as_ref()
        .filter(|_| state.config.features.enable_availability_cache);

    if let Some(cache) = cache {
        if let Some(availability) = cache.get_cached_availability(show_id, category).await {
            return Ok(Json(availability));
        }
    }

    let (availability, version) = state
        .inventory
        .snapshot_availability(show_id, category)
        .await?;

    if let Some(cache) = cache {
        cache
            .cache_availability(show_id, category, version, &availability)
            .await;
    }
    Ok(Json(availability))
}
