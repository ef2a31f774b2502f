use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{BookingStore, ShowStore, StoreError};
use crate::layout::{HallCode, SeatCategory, SeatId};
use crate::models::{Booking, CategoryPrices, Money, Occupancy, PaymentStatus, Presentation, Show};

pub async fn connect(database_url: &str, pool_size: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Applies the embedded `shows`/`bookings` schema.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations...");
    sqlx::migrate!("./src/migrations").run(pool).await?;
    info!("Migrations completed");
    Ok(())
}

const SHOW_COLUMNS: &str = "id, movie_id, hall, starts_at, presentation, regular_price, vip_price, \
                            occupied_seats, version, created_at";

const BOOKING_COLUMNS: &str = "id, user_id, show_id, category, seats, amount, payment_status, created_at";

#[derive(FromRow)]
struct ShowRow {
    id: Uuid,
    movie_id: String,
    hall: String,
    starts_at: DateTime<Utc>,
    presentation: String,
    regular_price: i64,
    vip_price: i64,
    occupied_seats: Json<Occupancy>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShowRow> for Show {
    type Error = StoreError;

    fn try_from(row: ShowRow) -> Result<Self, Self::Error> {
        let presentation: Presentation =
            row.presentation.parse().map_err(|reason| StoreError::Corrupt {
                entity: "show",
                id: row.id,
                reason,
            })?;

        Ok(Show {
            id: row.id,
            movie_id: row.movie_id,
            hall: HallCode::new(row.hall),
            starts_at: row.starts_at,
            presentation,
            prices: CategoryPrices {
                regular: Money::from_minor(row.regular_price),
                vip: Money::from_minor(row.vip_price),
            },
            occupancy: row.occupied_seats.0,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

fn into_shows(rows: Vec<ShowRow>) -> Result<Vec<Show>, StoreError> {
    rows.into_iter().map(Show::try_from).collect()
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: String,
    show_id: Uuid,
    category: String,
    seats: Vec<String>,
    amount: i64,
    payment_status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            entity: "booking",
            id: row.id,
            reason,
        };
        let category: SeatCategory = row.category.parse().map_err(corrupt)?;
        let payment_status: PaymentStatus = row.payment_status.parse().map_err(corrupt)?;

        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            show_id: row.show_id,
            category,
            seats: row.seats.into_iter().map(SeatId::from).collect(),
            amount: Money::from_minor(row.amount),
            payment_status,
            created_at: row.created_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, StoreError> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[derive(Clone)]
pub struct PgShowStore {
    pool: PgPool,
}

impl PgShowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_show<'e, E>(executor: E, show: &Show) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        "INSERT INTO shows (id, movie_id, hall, starts_at, presentation, regular_price, vip_price,
                            occupied_seats, version, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(show.id)
    .bind(&show.movie_id)
    .bind(show.hall.as_str())
    .bind(show.starts_at)
    .bind(show.presentation.as_str())
    .bind(show.prices.regular.minor_units())
    .bind(show.prices.vip.minor_units())
    .bind(Json(&show.occupancy))
    .bind(show.version)
    .bind(show.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl ShowStore for PgShowStore {
    async fn insert(&self, show: &Show) -> Result<(), StoreError> {
        insert_show(&self.pool, show).await?;
        Ok(())
    }

    async fn insert_many(&self, shows: &[Show]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for show in shows {
            insert_show(&mut *tx, show).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Show>, StoreError> {
        let row: Option<ShowRow> =
            sqlx::query_as(&format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Show::try_from).transpose()
    }

    async fn list_for_movie_between(
        &self,
        movie_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Show>, StoreError> {
        let rows: Vec<ShowRow> = sqlx::query_as(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows
             WHERE movie_id = $1 AND starts_at >= $2 AND starts_at < $3
             ORDER BY starts_at, id"
        ))
        .bind(movie_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        into_shows(rows)
    }

    async fn list_upcoming(&self, from: DateTime<Utc>) -> Result<Vec<Show>, StoreError> {
        let rows: Vec<ShowRow> = sqlx::query_as(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows WHERE starts_at >= $1 ORDER BY starts_at, id"
        ))
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        into_shows(rows)
    }

    async fn list_with_occupancy(&self, from: DateTime<Utc>) -> Result<Vec<Show>, StoreError> {
        let rows: Vec<ShowRow> = sqlx::query_as(&format!(
            "SELECT {SHOW_COLUMNS} FROM shows
             WHERE starts_at >= $1 AND occupied_seats <> '{{}}'::jsonb
             ORDER BY starts_at, id"
        ))
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        into_shows(rows)
    }

    async fn update_occupancy(
        &self,
        id: Uuid,
        expected_version: i64,
        occupancy: &Occupancy,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE shows
             SET occupied_seats = $3, version = version + 1
             WHERE id = $1 AND version = $2",
        )
        .bind(id)
        .bind(expected_version)
        .bind(Json(occupancy))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert_if_absent(&self, booking: &Booking) -> Result<bool, StoreError> {
        let seats: Vec<&str> = booking.seats.iter().map(SeatId::as_str).collect();
        let result = sqlx::query(
            "INSERT INTO bookings (id, user_id, show_id, category, seats, amount, payment_status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(booking.id)
        .bind(&booking.user_id)
        .bind(booking.show_id)
        .bind(booking.category.as_str())
        .bind(&seats)
        .bind(booking.amount.minor_units())
        .bind(booking.payment_status.as_str())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn missing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let missing: Vec<Uuid> = sqlx::query_scalar(
            "SELECT t.id FROM UNNEST($1::uuid[]) WITH ORDINALITY AS t(id, pos)
             WHERE NOT EXISTS (SELECT 1 FROM bookings b WHERE b.id = t.id)
             ORDER BY t.pos",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(missing)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        into_bookings(rows)
    }

    async fn list_for_show(&self, show_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE show_id = $1 ORDER BY created_at, id"
        ))
        .bind(show_id)
        .fetch_all(&self.pool)
        .await?;
        into_bookings(rows)
    }

    async fn mark_paid(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "UPDATE bookings SET payment_status = 'paid' WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }
}
