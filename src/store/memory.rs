use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{BookingStore, ShowStore, StoreError};
use crate::models::{Booking, Occupancy, PaymentStatus, Show};

/// Shows kept in a concurrent map. The compare-and-swap runs under the
/// map's shard lock for that show.
#[derive(Debug, Clone, Default)]
pub struct MemoryShowStore {
    shows: Arc<DashMap<Uuid, Show>>,
}

impl MemoryShowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_start(mut shows: Vec<Show>) -> Vec<Show> {
    shows.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
    shows
}

#[async_trait]
impl ShowStore for MemoryShowStore {
    async fn insert(&self, show: &Show) -> Result<(), StoreError> {
        self.shows.insert(show.id, show.clone());
        Ok(())
    }

    async fn insert_many(&self, shows: &[Show]) -> Result<(), StoreError> {
        for show in shows {
            self.shows.insert(show.id, show.clone());
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Show>, StoreError> {
        Ok(self.shows.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_for_movie_between(
        &self,
        movie_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Show>, StoreError> {
        let shows = self
            .shows
            .iter()
            .filter(|e| e.movie_id == movie_id && e.starts_at >= from && e.starts_at < to)
            .map(|e| e.value().clone())
            .collect();
        Ok(sorted_by_start(shows))
    }

    async fn list_upcoming(&self, from: DateTime<Utc>) -> Result<Vec<Show>, StoreError> {
        let shows = self
            .shows
            .iter()
            .filter(|e| e.starts_at >= from)
            .map(|e| e.value().clone())
            .collect();
        Ok(sorted_by_start(shows))
    }

    async fn list_with_occupancy(&self, from: DateTime<Utc>) -> Result<Vec<Show>, StoreError> {
        let shows = self
            .shows
            .iter()
            .filter(|e| e.starts_at >= from && !e.occupancy.is_empty())
            .map(|e| e.value().clone())
            .collect();
        Ok(sorted_by_start(shows))
    }

    async fn update_occupancy(
        &self,
        id: Uuid,
        expected_version: i64,
        occupancy: &Occupancy,
    ) -> Result<bool, StoreError> {
        let Some(mut show) = self.shows.get_mut(&id) else {
            return Ok(false);
        };
        if show.version != expected_version {
            return Ok(false);
        }
        show.occupancy = occupancy.clone();
        show.version += 1;
        Ok(true)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBookingStore {
    bookings: Arc<DashMap<Uuid, Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert_if_absent(&self, booking: &Booking) -> Result<bool, StoreError> {
        match self.bookings.entry(booking.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(booking.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&id).map(|e| e.value().clone()))
    }

    async fn missing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, StoreError> {
        Ok(ids
            .iter()
            .filter(|id| !self.bookings.contains_key(*id))
            .copied()
            .collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.value().clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_for_show(&self, show_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| e.show_id == show_id)
            .map(|e| e.value().clone())
            .collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bookings)
    }

    async fn mark_paid(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get_mut(&id).map(|mut booking| {
            booking.payment_status = PaymentStatus::Paid;
            booking.clone()
        }))
    }
}
