//! Persistence contract for shows and bookings.
//!
//! Two adapters implement the same traits: [`postgres`] for the server and
//! [`memory`] for tests and database-less runs. The only write that needs
//! care is [`ShowStore::update_occupancy`], a compare-and-swap on the
//! show's version.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Booking, Occupancy, Show};

pub use memory::{MemoryBookingStore, MemoryShowStore};
pub use postgres::{PgBookingStore, PgShowStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt {entity} record {id}: {reason}")]
    Corrupt {
        entity: &'static str,
        id: Uuid,
        reason: String,
    },
}

#[async_trait]
pub trait ShowStore: Send + Sync {
    async fn insert(&self, show: &Show) -> Result<(), StoreError>;

    /// Inserts all shows or none.
    async fn insert_many(&self, shows: &[Show]) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Show>, StoreError>;

    /// Shows of a movie starting in `[from, to)`, earliest first.
    async fn list_for_movie_between(
        &self,
        movie_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Show>, StoreError>;

    /// Shows starting at or after `from`, earliest first.
    async fn list_upcoming(&self, from: DateTime<Utc>) -> Result<Vec<Show>, StoreError>;

    /// Shows starting at or after `from` with at least one taken seat.
    async fn list_with_occupancy(&self, from: DateTime<Utc>) -> Result<Vec<Show>, StoreError>;

    /// Replaces the occupancy if the stored version still equals
    /// `expected_version`, bumping the version. Returns `false` when the
    /// show moved on (or vanished) since it was read.
    async fn update_occupancy(
        &self,
        id: Uuid,
        expected_version: i64,
        occupancy: &Occupancy,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts unless a booking with the same id exists. Returns whether a
    /// row was written, so retries of the same booking are harmless.
    async fn insert_if_absent(&self, booking: &Booking) -> Result<bool, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// The subset of `ids` with no stored booking, in input order.
    async fn missing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, StoreError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError>;

    /// Oldest first.
    async fn list_for_show(&self, show_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    /// Flips the payment status to paid. `None` if the booking is unknown.
    async fn mark_paid(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;
}
