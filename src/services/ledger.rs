use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::Booking;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::store::BookingStore;

#[derive(Clone)]
pub struct BookingLedger {
    bookings: Arc<dyn BookingStore>,
    retry: RetryConfig,
}

impl BookingLedger {
    pub fn new(bookings: Arc<dyn BookingStore>, retry: RetryConfig) -> Self {
        Self { bookings, retry }
    }

    /// Stores the booking, retrying transient failures. Writing the same
    /// booking twice is a no-op, so a retry after an ambiguous failure is safe.
    /// Returns whether this call created the record.
    pub async fn record(&self, booking: &Booking) -> Result<bool, BookingError> {
        let created = retry_with_backoff(&self.retry, "record booking", || {
            self.bookings.insert_if_absent(booking)
        })
        .await?;

        if created {
            info!(
                booking_id = %booking.id,
                show_id = %booking.show_id,
                "booking recorded for {}",
                booking.amount
            );
        }
        Ok(created)
    }

    pub async fn get(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// The ids among `booking_ids` that have no booking yet.
    pub async fn missing(&self, booking_ids: &[Uuid]) -> Result<Vec<Uuid>, BookingError> {
        Ok(self.bookings.missing_ids(booking_ids).await?)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.list_for_user(user_id).await?)
    }

    pub async fn list_for_show(&self, show_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        Ok(self.bookings.list_for_show(show_id).await?)
    }

    /// `unpaid -> paid`; marking an already paid booking changes nothing.
    pub async fn mark_paid(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let current = self.get(booking_id).await?;
        if current.is_paid() {
            return Ok(current);
        }

        let booking = self
            .bookings
            .mark_paid(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        info!(booking_id = %booking_id, "booking paid");
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{SeatCategory, SeatId};
    use crate::models::{Money, PaymentStatus};
    use crate::store::{MemoryBookingStore, StoreError};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn booking(user: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: user.into(),
            show_id: Uuid::new_v4(),
            category: SeatCategory::Regular,
            seats: vec![SeatId::from("A1")],
            amount: Money::from_minor(1_000),
            payment_status: PaymentStatus::Unpaid,
            created_at: Utc::now(),
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig::with_delays(3, std::time::Duration::from_millis(1), std::time::Duration::from_millis(2))
    }

    fn ledger() -> (BookingLedger, MemoryBookingStore) {
        let store = MemoryBookingStore::new();
        (BookingLedger::new(Arc::new(store.clone()), fast_retry()), store)
    }

    #[tokio::test]
    async fn recording_twice_keeps_one_booking() {
        let (ledger, store) = ledger();
        let booking = booking("u1");

        assert!(ledger.record(&booking).await.unwrap());
        assert!(!ledger.record(&booking).await.unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(ledger.get(booking.id).await.unwrap(), booking);
    }

    #[tokio::test]
    async fn user_listing_is_newest_first() {
        let (ledger, _) = ledger();
        let mut older = booking("u1");
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = booking("u1");
        ledger.record(&older).await.unwrap();
        ledger.record(&newer).await.unwrap();
        ledger.record(&booking("u2")).await.unwrap();

        let ids: Vec<Uuid> = ledger
            .list_for_user("u1")
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let (ledger, _) = ledger();
        let booking = booking("u1");
        ledger.record(&booking).await.unwrap();

        let paid = ledger.mark_paid(booking.id).await.unwrap();
        let again = ledger.mark_paid(booking.id).await.unwrap();

        assert!(paid.is_paid());
        assert_eq!(paid, again);
        assert_eq!(paid.seats, booking.seats);
    }

    #[tokio::test]
    async fn unknown_booking_is_not_found() {
        let (ledger, _) = ledger();
        let err = ledger.mark_paid(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, BookingError::BookingNotFound(_)));
    }

    /// Fails the first `failures` inserts.
    struct FlakyStore {
        inner: MemoryBookingStore,
        failures: AtomicU32,
    }

    #[async_trait]
    impl BookingStore for FlakyStore {
        async fn insert_if_absent(&self, booking: &Booking) -> Result<bool, StoreError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.insert_if_absent(booking).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
            self.inner.get(id).await
        }

        async fn missing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, StoreError> {
            self.inner.missing_ids(ids).await
        }

        async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
            self.inner.list_for_user(user_id).await
        }

        async fn list_for_show(&self, show_id: Uuid) -> Result<Vec<Booking>, StoreError> {
            self.inner.list_for_show(show_id).await
        }

        async fn mark_paid(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
            self.inner.mark_paid(id).await
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let inner = MemoryBookingStore::new();
        let ledger = BookingLedger::new(
            Arc::new(FlakyStore {
                inner: inner.clone(),
                failures: AtomicU32::new(2),
            }),
            fast_retry(),
        );

        assert!(ledger.record(&booking("u1")).await.unwrap());
        assert_eq!(inner.len(), 1);
    }

    #[tokio::test]
    async fn persistent_failure_surfaces_as_storage_error() {
        let ledger = BookingLedger::new(
            Arc::new(FlakyStore {
                inner: MemoryBookingStore::new(),
                failures: AtomicU32::new(10),
            }),
            fast_retry(),
        );

        let err = ledger.record(&booking("u1")).await.unwrap_err();
        assert_eq!(err.reason(), "StorageError");
    }
}
