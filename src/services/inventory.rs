//! Occupancy of shows: availability reads and atomic reservation.
//!
//! A reservation is a read-check-write on the show's occupancy, committed
//! with a compare-and-swap on the show version. Losing the swap means
//! another writer got in between, so the whole cycle runs again against
//! fresh state, up to `max_attempts` times.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::BookingError;
use crate::layout::{HallLayouts, SeatCategory, SeatClass, SeatId, SeatMap};
use crate::models::{Occupant, Show};
use crate::store::ShowStore;

/// What a client needs to draw the seat picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub universe: Vec<SeatId>,
    pub occupied: Vec<SeatId>,
}

#[derive(Clone)]
pub struct SeatInventory {
    shows: Arc<dyn ShowStore>,
    layouts: Arc<HallLayouts>,
    max_seats_per_booking: usize,
    max_attempts: u32,
}

impl SeatInventory {
    pub fn new(
        shows: Arc<dyn ShowStore>,
        layouts: Arc<HallLayouts>,
        max_seats_per_booking: usize,
        max_attempts: u32,
    ) -> Self {
        Self {
            shows,
            layouts,
            max_seats_per_booking,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_seats_per_booking(&self) -> usize {
        self.max_seats_per_booking
    }

    fn seat_map(&self, show: &Show, category: SeatCategory) -> Result<&SeatMap, BookingError> {
        self.layouts
            .seat_map(&show.hall, category)
            .ok_or_else(|| BookingError::CategoryNotFound {
                hall: show.hall.clone(),
                category,
            })
    }

    async fn load(&self, show_id: Uuid) -> Result<Show, BookingError> {
        self.shows
            .get(show_id)
            .await?
            .ok_or(BookingError::ShowNotFound(show_id))
    }

    /// Reservable seats and the taken subset, both in layout order.
    pub async fn get_availability(
        &self,
        show_id: Uuid,
        category: SeatCategory,
    ) -> Result<Availability, BookingError> {
        Ok(self.snapshot_availability(show_id, category).await?.0)
    }

    /// Availability together with the show version it was computed from.
    pub async fn snapshot_availability(
        &self,
        show_id: Uuid,
        category: SeatCategory,
    ) -> Result<(Availability, i64), BookingError> {
        let show = self.load(show_id).await?;
        let seat_map = self.seat_map(&show, category)?;

        let universe = seat_map.universe();
        let taken = show.occupancy.seats(category);
        let occupied = universe
            .iter()
            .filter(|seat| taken.contains_key(*seat))
            .cloned()
            .collect();

        Ok((Availability { universe, occupied }, show.version))
    }

    /// Takes every requested seat for `occupant` or none of them.
    ///
    /// Returns the show as persisted after the write.
    pub async fn reserve_seats(
        &self,
        show_id: Uuid,
        category: SeatCategory,
        seat_ids: &[SeatId],
        occupant: Occupant,
    ) -> Result<Show, BookingError> {
        if seat_ids.is_empty() {
            return Err(BookingError::Validation("at least one seat is required".into()));
        }
        let mut seen = HashSet::with_capacity(seat_ids.len());
        if let Some(dup) = seat_ids.iter().find(|seat| !seen.insert(*seat)) {
            return Err(BookingError::Validation(format!("seat {dup} requested twice")));
        }
        if seat_ids.len() > self.max_seats_per_booking {
            return Err(BookingError::TooManySeats {
                requested: seat_ids.len(),
                max: self.max_seats_per_booking,
            });
        }

        let mut show = self.load(show_id).await?;
        check_geometry(self.seat_map(&show, category)?, seat_ids)?;

        for attempt in 1..=self.max_attempts {
            let taken: Vec<SeatId> = seat_ids
                .iter()
                .filter(|seat| show.occupancy.is_taken(category, seat))
                .cloned()
                .collect();
            if !taken.is_empty() {
                info!(
                    show_id = %show_id,
                    category = %category,
                    "reservation rejected, seats taken: {}",
                    taken.len()
                );
                return Err(BookingError::SeatConflict { seats: taken.into() });
            }

            let mut occupancy = show.occupancy.clone();
            let slot = occupancy.seats_mut(category);
            for seat in seat_ids {
                slot.insert(seat.clone(), occupant.clone());
            }

            if self
                .shows
                .update_occupancy(show_id, show.version, &occupancy)
                .await?
            {
                show.occupancy = occupancy;
                show.version += 1;
                info!(
                    show_id = %show_id,
                    category = %category,
                    booking_id = %occupant.booking_id,
                    "reserved {} seats",
                    seat_ids.len()
                );
                return Ok(show);
            }

            debug!(show_id = %show_id, attempt, "occupancy changed underneath, re-reading");
            show = self.load(show_id).await?;
        }

        warn!(
            show_id = %show_id,
            attempts = self.max_attempts,
            "giving up on reservation after repeated concurrent updates"
        );
        Err(BookingError::ConcurrentUpdate {
            show_id,
            attempts: self.max_attempts,
        })
    }
}

/// Unknown seats win over disabled ones when both are present.
fn check_geometry(seat_map: &SeatMap, seat_ids: &[SeatId]) -> Result<(), BookingError> {
    let mut unknown = Vec::new();
    let mut disabled = Vec::new();
    for seat in seat_ids {
        match seat_map.classify(seat) {
            SeatClass::Unknown => unknown.push(seat.clone()),
            SeatClass::Disabled => disabled.push(seat.clone()),
            SeatClass::Reservable => {}
        }
    }

    if !unknown.is_empty() {
        return Err(BookingError::SeatNotFound { seats: unknown.into() });
    }
    if !disabled.is_empty() {
        return Err(BookingError::SeatDisabled { seats: disabled.into() });
    }
    Ok(())
}
